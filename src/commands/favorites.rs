use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use super::{App, login_hint};
use crate::api::FavoriteToggle;
use crate::models::NewFavorite;
use crate::render;

#[derive(Debug, Clone, Subcommand)]
pub enum FavoritesCommand {
    /// List favorites, newest first
    List,
    /// Save a species
    Add(FavoriteArgs),
    /// Remove a favorite by its id
    Remove { id: i64 },
    /// Is this species a favorite?
    Check { code: String },
    /// Add the species if missing, remove it otherwise
    Toggle(FavoriteArgs),
}

#[derive(Debug, Clone, Args)]
pub struct FavoriteArgs {
    /// eBird species code
    pub code: String,

    /// Common name
    #[arg(short, long)]
    pub name: String,

    #[arg(long)]
    pub scientific: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl From<&FavoriteArgs> for NewFavorite {
    fn from(args: &FavoriteArgs) -> Self {
        NewFavorite {
            species_name: args.name.trim().to_string(),
            species_code: args.code.trim().to_string(),
            scientific_name: args.scientific.clone(),
            notes: args.notes.clone(),
        }
    }
}

pub async fn run(app: &App, command: &FavoritesCommand) -> Result<()> {
    let client = &app.client;
    match command {
        FavoritesCommand::List => {
            let favorites = client.favorites().await.map_err(login_hint)?;
            print!("{}", render::favorites_list(&favorites));
        }
        FavoritesCommand::Add(args) => {
            let fav = client
                .add_favorite(&NewFavorite::from(args))
                .await
                .map_err(login_hint)
                .context("could not add favorite")?;
            println!("✓ Added {} [{}]", fav.species_name, fav.id);
        }
        FavoritesCommand::Remove { id } => {
            client
                .remove_favorite(*id)
                .await
                .map_err(login_hint)
                .context("could not remove favorite")?;
            println!("✓ Removed favorite {id}");
        }
        FavoritesCommand::Check { code } => {
            let status = client.check_favorite(code).await.map_err(login_hint)?;
            match status.favorite_id.filter(|_| status.is_favorited) {
                Some(id) => println!("  ★ {code} is a favorite [{id}]"),
                None => println!("  ☆ {code} is not a favorite"),
            }
        }
        FavoritesCommand::Toggle(args) => {
            let toggled = client
                .toggle_favorite(&NewFavorite::from(args))
                .await
                .map_err(login_hint)?;
            match toggled {
                FavoriteToggle::Added(fav) => {
                    println!("✓ Added {} [{}]", fav.species_name, fav.id)
                }
                FavoriteToggle::Removed { favorite_id } => {
                    println!("✓ Removed {} [{favorite_id}]", args.name.trim())
                }
            }
        }
    }
    Ok(())
}
