//! Project-wide constants.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sent to every third-party service. Nominatim rejects requests without one.
pub const USER_AGENT: &str = "BirdSpot/1.0";

/// Backend used when neither the config table nor the environment names one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default search radius for the rare-birds view, in kilometers.
pub const DEFAULT_RADIUS_KM: u32 = 25;

/// eBird's notable-observations endpoint caps `dist` at 50 km.
pub const MAX_RARE_RADIUS_KM: u32 = 50;

/// Species observation lookups accept up to 100 km.
pub const MAX_SPECIES_RADIUS_KM: u32 = 100;

/// Upper bound the backend enforces on species suggestions.
pub const MAX_SUGGESTIONS: u32 = 25;

/// Default number of search-history rows requested.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Request timeout for every outbound HTTP call, in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// Lifetimes the backend issues tokens with. Used for display only, the
/// authoritative expiry is the `exp` claim.
pub const ACCESS_TOKEN_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_DAYS: i64 = 7;

/// Default database path: `~/.birdspot/birdspot.db`.
/// Single DB for credentials and config.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".birdspot").join("birdspot.db"))
}

/// eBird species page for a species code.
pub fn ebird_species_url(species_code: &str) -> String {
    format!("https://ebird.org/species/{species_code}")
}

/// Google Maps search link centered on a coordinate pair.
pub fn map_search_url(lat: f64, lng: f64) -> String {
    format!("https://www.google.com/maps/search/?api=1&query={lat},{lng}")
}
