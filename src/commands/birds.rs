use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use tracing::info;

use super::{App, LocationArgs, login_hint};
use crate::consts::{MAX_RARE_RADIUS_KM, map_search_url};
use crate::photos::PRELOAD_STAGGER;
use crate::render;
use crate::sightings::{self, SightingFilter, parse_cutoff};
use crate::spinner::Spinner;

/// `birdspot rare`
#[derive(Debug, Clone, Args)]
pub struct RareArgs {
    #[command(flatten)]
    pub place: LocationArgs,

    /// Search radius in km (1-50). Defaults to the `radius_km` setting.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_RARE_RADIUS_KM as i64))]
    pub radius: Option<u32>,

    /// Only species whose name contains this, or with this species code
    #[arg(long)]
    pub species: Option<String>,

    /// Only locations whose name contains this
    #[arg(long)]
    pub location: Option<String>,

    /// Only sightings on or after this day (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Show top-species and top-location charts
    #[arg(long)]
    pub chart: bool,

    /// Show one map marker per location
    #[arg(long)]
    pub map: bool,

    /// Fetch a photo for each species shown
    #[arg(long)]
    pub photos: bool,

    /// Open the map centered on the results in the browser
    #[arg(long)]
    pub open: bool,
}

impl RareArgs {
    fn filter(&self) -> Result<SightingFilter> {
        let since = self
            .since
            .as_deref()
            .map(|s| parse_cutoff(s, Local::now().date_naive()))
            .transpose()?;
        Ok(SightingFilter {
            species: self.species.clone(),
            location: self.location.clone(),
            since,
        })
    }
}

pub async fn run(app: &App, args: &RareArgs) -> Result<()> {
    let filter = args.filter()?;
    let (at, label) = app.coordinates(&args.place).await?;
    let radius = args.radius.unwrap_or(app.settings.radius_km);

    let spinner = Spinner::start(&format!("searching {radius} km around {label}"));
    let fetched = app.client.rare_birds(at, radius).await;
    spinner.stop().await;
    let fetched = fetched.map_err(login_hint).context("rare bird search failed")?;
    info!(count = fetched.len(), %at, radius, "rare birds fetched");

    let total = fetched.len();
    let mut shown = filter.apply(fetched);
    sightings::sort_newest_first(&mut shown);

    println!("Rare birds within {radius} km of {label}\n");
    print!("{}", render::observations_table(&shown));
    if !filter.is_empty() {
        println!("  ({} of {total} after filters)", shown.len());
    }

    if let Some(latest) = sightings::latest_sighting(&shown) {
        println!(
            "  latest: {} at {} on {}",
            latest.species, latest.loc, latest.date
        );
    }

    if args.chart {
        println!();
        print!("{}", render::charts(&shown));
    }
    if args.map {
        println!();
        print!(
            "{}",
            render::location_markers(&sightings::group_by_location(&shown))
        );
    }
    if args.photos {
        print_photos(app, &shown).await;
    }
    if args.open {
        if let Some(center) = sightings::map_center(&shown) {
            let _ = open::that(map_search_url(center.lat, center.lng));
        }
    }
    Ok(())
}

async fn print_photos(app: &App, shown: &[crate::models::Observation]) {
    let species: Vec<String> = sightings::species_counts(shown)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    let photos = app.photos.preload(&species, PRELOAD_STAGGER).await;

    println!("\nPhotos");
    for (name, photo) in species.iter().zip(&photos) {
        println!("  {name}: {} ({})", photo.url, photo.attribution);
    }
}
