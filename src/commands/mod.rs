//! CLI command handlers.
//!
//! Each submodule owns the clap arguments for one command group and a `run`
//! function that does the work against an [`App`]. `main` only parses and
//! dispatches.

pub mod account;
pub mod birds;
pub mod favorites;
pub mod locations;
pub mod photo;
pub mod settings;
pub mod species;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::debug;

use crate::api::{ApiClient, ApiError, SearchOrigin};
use crate::auth::TokenStorage;
use crate::config::{Config, Settings};
use crate::geocode::{Geocoder, OpenGeocoder};
use crate::models::{Coordinates, LocationKind, SavedLocation};
use crate::photos::PhotoFinder;

/// Everything a command needs, opened once per run.
pub struct App {
    pub settings: Settings,
    pub client: ApiClient,
    pub geocoder: Box<dyn Geocoder>,
    pub photos: PhotoFinder,
}

impl App {
    /// Open the shared database (creating its directory) and wire up clients
    /// from the resolved settings.
    pub fn open(db_path: &Path) -> Result<Self> {
        let db = db_path_str(db_path)?;
        let config = Config::open(db)?;
        let settings = Settings::load(&config)?;
        let tokens = Arc::new(TokenStorage::open(db)?);
        Self::with_parts(settings, tokens, Box::new(OpenGeocoder::new()?))
    }

    pub fn with_parts(
        settings: Settings,
        tokens: Arc<TokenStorage>,
        geocoder: Box<dyn Geocoder>,
    ) -> Result<Self> {
        let client = ApiClient::new(&settings.backend_url, tokens)?;
        let photos = PhotoFinder::from_settings(&settings)?;
        debug!(backend = %settings.backend_url, sources = ?photos.source_names(), "app ready");
        Ok(Self {
            settings,
            client,
            geocoder,
            photos,
        })
    }

    /// Coordinates for a search, geocoding on this side when needed.
    pub async fn coordinates(&self, place: &LocationArgs) -> Result<(Coordinates, String)> {
        match place.target()? {
            Target::Point(at) => Ok((at, at.to_string())),
            Target::Place { kind, value } => {
                let at = self
                    .geocoder
                    .locate(kind, &value)
                    .await
                    .with_context(|| format!("could not locate {kind} {value:?}"))?;
                Ok((at, value))
            }
            Target::Saved(name) => {
                let loc = self.saved_location(Some(&name)).await?;
                Ok((loc.coordinates(), loc.name))
            }
            Target::Default => {
                let loc = self.saved_location(None).await?;
                Ok((loc.coordinates(), loc.name))
            }
        }
    }

    /// Origin for a species search. ZIP codes and cities are left for the
    /// server to geocode.
    pub async fn origin(&self, place: &LocationArgs) -> Result<(SearchOrigin, String)> {
        match place.target()? {
            Target::Place { kind, value } => {
                let label = value.clone();
                Ok((SearchOrigin::Place { kind, value }, label))
            }
            _ => {
                let (at, label) = self.coordinates(place).await?;
                Ok((SearchOrigin::Coordinates(at), label))
            }
        }
    }

    /// A saved location by name (case-insensitive), or the default one.
    pub async fn saved_location(&self, name: Option<&str>) -> Result<SavedLocation> {
        let locations = self.client.locations().await.map_err(login_hint)?;
        pick_location(&locations, name).cloned()
    }
}

fn db_path_str(path: &Path) -> Result<&str> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    path.to_str()
        .with_context(|| format!("database path is not valid UTF-8: {}", path.display()))
}

/// Resolve a saved location by id-less name, or the default when `name` is
/// `None`.
pub fn pick_location<'a>(
    locations: &'a [SavedLocation],
    name: Option<&str>,
) -> Result<&'a SavedLocation> {
    match name {
        Some(name) => locations
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
            .with_context(|| format!("no saved location named {name:?}")),
        None => locations.iter().find(|l| l.is_default).context(
            "no location given and no default saved location; \
             pass --lat/--lng, --zip, --city or --saved",
        ),
    }
}

/// Turn a 401 into a pointer at `birdspot login`.
pub fn login_hint(err: ApiError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow::Error::new(err).context("not logged in or session expired; run `birdspot login`")
    } else {
        err.into()
    }
}

/// Where to search. At most one of the forms may be given.
#[derive(Debug, Clone, Default, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lng: Option<f64>,

    /// US ZIP code
    #[arg(long, conflicts_with_all = ["lat", "city", "saved"])]
    pub zip: Option<String>,

    /// US city, optionally with state ("Denver, CO")
    #[arg(long, conflicts_with_all = ["lat", "zip", "saved"])]
    pub city: Option<String>,

    /// Name of a saved location
    #[arg(long, conflicts_with_all = ["lat", "zip", "city"])]
    pub saved: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Point(Coordinates),
    Place { kind: LocationKind, value: String },
    Saved(String),
    Default,
}

impl LocationArgs {
    pub fn target(&self) -> Result<Target> {
        let given = [
            self.lat.is_some() || self.lng.is_some(),
            self.zip.is_some(),
            self.city.is_some(),
            self.saved.is_some(),
        ];
        if given.iter().filter(|g| **g).count() > 1 {
            bail!("give only one of --lat/--lng, --zip, --city, --saved");
        }
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => return Ok(Target::Point(Coordinates::new(lat, lng)?)),
            (Some(_), None) | (None, Some(_)) => bail!("--lat and --lng go together"),
            (None, None) => {}
        }
        if let Some(zip) = &self.zip {
            return Ok(Target::Place {
                kind: LocationKind::Zip,
                value: zip.trim().to_string(),
            });
        }
        if let Some(city) = &self.city {
            if city.trim().is_empty() {
                bail!("--city is empty");
            }
            return Ok(Target::Place {
                kind: LocationKind::City,
                value: city.trim().to_string(),
            });
        }
        if let Some(saved) = &self.saved {
            return Ok(Target::Saved(saved.trim().to_string()));
        }
        Ok(Target::Default)
    }
}
