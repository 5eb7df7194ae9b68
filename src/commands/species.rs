use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Subcommand;
use tracing::debug;

use super::{App, LocationArgs, login_hint};
use crate::api::SpeciesQuery;
use crate::consts::{DEFAULT_RADIUS_KM, MAX_SPECIES_RADIUS_KM, MAX_SUGGESTIONS, ebird_species_url};
use crate::models::SpeciesSuggestion;
use crate::render;
use crate::sightings::{self, parse_cutoff};
use crate::spinner::Spinner;

const DEFAULT_SUGGESTIONS: u32 = 10;
const SHOW_PHOTOS: usize = 3;

#[derive(Debug, Clone, Subcommand)]
pub enum SpeciesCommand {
    /// Autocomplete a species by common or scientific name
    Suggest {
        query: String,
        #[arg(short, long, default_value_t = DEFAULT_SUGGESTIONS,
              value_parser = clap::value_parser!(u32).range(1..=MAX_SUGGESTIONS as i64))]
        limit: u32,
    },
    /// Recent sightings of one species nearby
    Sightings {
        /// eBird species code, e.g. snoowl1
        code: String,
        #[command(flatten)]
        place: LocationArgs,
        /// Search radius in km (1-100)
        #[arg(short, long, default_value_t = DEFAULT_RADIUS_KM,
              value_parser = clap::value_parser!(u32).range(1..=MAX_SPECIES_RADIUS_KM as i64))]
        radius: u32,
        /// Only sightings on or after this day (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Show one map marker per location
        #[arg(long)]
        map: bool,
    },
    /// Photos, links and favorite status for a species
    Show {
        /// Common name, e.g. "Snowy Owl"
        name: String,
        /// eBird species code; looked up by name when omitted
        #[arg(long)]
        code: Option<String>,
        /// Open the first photo in the browser
        #[arg(long)]
        open: bool,
    },
}

pub async fn run(app: &App, command: &SpeciesCommand) -> Result<()> {
    match command {
        SpeciesCommand::Suggest { query, limit } => suggest(app, query, *limit).await,
        SpeciesCommand::Sightings {
            code,
            place,
            radius,
            since,
            map,
        } => {
            let cutoff = since
                .as_deref()
                .map(|s| parse_cutoff(s, Local::now().date_naive()))
                .transpose()?;
            let (origin, label) = app.origin(place).await?;
            let query = SpeciesQuery {
                species_code: code.clone(),
                origin,
                radius_km: *radius,
                cutoff,
            };

            let spinner = Spinner::start(&format!("looking for {code} near {label}"));
            let found = app.client.species_observations(&query).await;
            spinner.stop().await;
            let mut found = found
                .map_err(login_hint)
                .context("species search failed")?;
            sightings::sort_newest_first(&mut found);

            println!("Sightings of {code} within {radius} km of {label}\n");
            print!("{}", render::observations_table(&found));
            if *map {
                println!();
                print!(
                    "{}",
                    render::location_markers(&sightings::group_by_location(&found))
                );
            }
            Ok(())
        }
        SpeciesCommand::Show { name, code, open } => show(app, name, code.as_deref(), *open).await,
    }
}

async fn suggest(app: &App, query: &str, limit: u32) -> Result<()> {
    let found = app
        .client
        .suggest_species(query, limit)
        .await
        .map_err(login_hint)?;
    if found.is_empty() {
        println!("  no species match {query:?}");
    }
    for s in &found {
        println!("  {}", suggestion_line(s));
    }
    Ok(())
}

fn suggestion_line(s: &SpeciesSuggestion) -> String {
    match &s.scientific_name {
        Some(sci) => format!("{:<10} {} ({sci})", s.species_code, s.species_name),
        None => format!("{:<10} {}", s.species_code, s.species_name),
    }
}

/// The suggestion whose common name matches exactly, else the first one.
pub fn best_match<'a>(name: &str, found: &'a [SpeciesSuggestion]) -> Option<&'a SpeciesSuggestion> {
    found
        .iter()
        .find(|s| s.species_name.eq_ignore_ascii_case(name.trim()))
        .or_else(|| found.first())
}

async fn show(app: &App, name: &str, code: Option<&str>, open: bool) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("species name is empty");
    }
    let code = match code {
        Some(code) => Some(code.to_string()),
        None => {
            let found = app
                .client
                .suggest_species(name, 5)
                .await
                .map_err(login_hint)?;
            best_match(name, &found).map(|s| s.species_code.clone())
        }
    };

    println!("{name}");
    let photos = app.photos.photos_for(name, SHOW_PHOTOS).await;
    for photo in &photos {
        println!("  📷 {} ({})", photo.url, photo.attribution);
    }

    if let Some(code) = &code {
        println!("  eBird  {}", ebird_species_url(code));
        if app.client.tokens().get()?.is_some() {
            match app.client.check_favorite(code).await {
                Ok(status) if status.is_favorited => println!("  ★ in your favorites"),
                Ok(_) => println!("  ☆ not in your favorites"),
                Err(e) => debug!(error = %e, "favorite check skipped"),
            }
        }
    }

    if open {
        if let Some(photo) = photos.first() {
            let _ = open::that(&photo.url);
        }
    }
    Ok(())
}
