use anyhow::{Context, Result};
use clap::Subcommand;

use super::{App, login_hint, pick_location};
use crate::models::{LocationKind, LocationUpdate, NewLocation, SavedLocation};
use crate::render;

#[derive(Debug, Clone, Subcommand)]
pub enum LocationsCommand {
    /// List saved locations; `*` marks the default
    List,
    /// Save a ZIP code or city; the server geocodes it
    Add {
        /// Display name, e.g. "Home"
        name: String,
        /// zip or city
        #[arg(value_parser = parse_kind)]
        kind: LocationKind,
        /// The ZIP code or "City, ST"
        value: String,
        /// Make this the default search location
        #[arg(long)]
        default: bool,
    },
    /// Rename a saved location
    Rename { location: String, new_name: String },
    /// Make a saved location the default
    Default { location: String },
    /// Delete a saved location
    Remove { location: String },
}

fn parse_kind(s: &str) -> Result<LocationKind> {
    s.parse()
}

/// Find by numeric id or by name.
fn find<'a>(locations: &'a [SavedLocation], key: &str) -> Result<&'a SavedLocation> {
    if let Ok(id) = key.trim().parse::<i64>() {
        if let Some(loc) = locations.iter().find(|l| l.id == id) {
            return Ok(loc);
        }
    }
    pick_location(locations, Some(key))
}

async fn saved_locations(app: &App) -> Result<Vec<SavedLocation>> {
    Ok(app.client.locations().await.map_err(login_hint)?)
}

pub async fn run(app: &App, command: &LocationsCommand) -> Result<()> {
    let client = &app.client;
    match command {
        LocationsCommand::List => {
            print!("{}", render::locations_list(&saved_locations(app).await?));
        }
        LocationsCommand::Add {
            name,
            kind,
            value,
            default,
        } => {
            let saved = client
                .add_location(&NewLocation {
                    name: name.clone(),
                    location_type: *kind,
                    location_value: value.clone(),
                    is_default: *default,
                })
                .await
                .map_err(login_hint)
                .context("could not save location")?;
            println!("✓ Saved {} at {}", saved.name, saved.coordinates());
        }
        LocationsCommand::Rename { location, new_name } => {
            let locations = saved_locations(app).await?;
            let loc = find(&locations, location)?;
            let update = LocationUpdate {
                name: Some(new_name.clone()),
                is_default: None,
            };
            let renamed = client
                .update_location(loc.id, &update)
                .await
                .map_err(login_hint)?;
            println!("✓ Renamed {} to {}", loc.name, renamed.name);
        }
        LocationsCommand::Default { location } => {
            let locations = saved_locations(app).await?;
            let loc = find(&locations, location)?;
            client
                .set_default_location(loc.id)
                .await
                .map_err(login_hint)?;
            println!("✓ {} is now the default location", loc.name);
        }
        LocationsCommand::Remove { location } => {
            let locations = saved_locations(app).await?;
            let loc = find(&locations, location)?;
            client
                .remove_location(loc.id)
                .await
                .map_err(login_hint)?;
            println!("✓ Removed {}", loc.name);
        }
    }
    Ok(())
}
