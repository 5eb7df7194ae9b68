//! Turning ZIP codes and US city names into coordinates.
//!
//! ZIP codes go to Zippopotam, cities to Nominatim. Both are public and
//! keyless; Nominatim requires a `User-Agent`, which the shared HTTP client
//! always sends.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::models::{Coordinates, LocationKind, is_zip_code};
use crate::photos::http_client;

const ZIPPOPOTAM_URL: &str = "https://api.zippopotam.us";
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const COUNTRY: &str = "USA";

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn zip(&self, zip: &str) -> Result<Coordinates>;
    async fn city(&self, city: &str) -> Result<Coordinates>;

    async fn locate(&self, kind: LocationKind, value: &str) -> Result<Coordinates> {
        match kind {
            LocationKind::Zip => self.zip(value).await,
            LocationKind::City => self.city(value).await,
        }
    }
}

#[derive(Deserialize)]
struct ZipResponse {
    #[serde(default)]
    places: Vec<ZipPlace>,
}

/// Zippopotam sends coordinates as strings.
#[derive(Deserialize)]
struct ZipPlace {
    latitude: String,
    longitude: String,
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

fn parse_coordinates(lat: &str, lng: &str) -> Result<Coordinates> {
    let lat: f64 = lat.trim().parse().context("bad latitude from geocoder")?;
    let lng: f64 = lng.trim().parse().context("bad longitude from geocoder")?;
    Coordinates::new(lat, lng)
}

/// `"Denver, CO"` becomes `("Denver", Some("CO"))`.
pub fn split_city(input: &str) -> (String, Option<String>) {
    let mut parts = input.split(',');
    let city = parts.next().unwrap_or_default().trim().to_string();
    let state = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    (city, state)
}

/// The free-text query Nominatim gets: `city[, state], USA`.
pub fn city_query(input: &str) -> String {
    let (city, state) = split_city(input);
    match state {
        Some(state) => format!("{city}, {state}, {COUNTRY}"),
        None => format!("{city}, {COUNTRY}"),
    }
}

pub struct OpenGeocoder {
    http: reqwest::Client,
    zip_url: String,
    city_url: String,
}

impl OpenGeocoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            zip_url: ZIPPOPOTAM_URL.to_string(),
            city_url: NOMINATIM_URL.to_string(),
        })
    }

    pub fn with_endpoints(mut self, zip_url: &str, city_url: &str) -> Self {
        self.zip_url = zip_url.trim_end_matches('/').to_string();
        self.city_url = city_url.to_string();
        self
    }
}

#[async_trait]
impl Geocoder for OpenGeocoder {
    async fn zip(&self, zip: &str) -> Result<Coordinates> {
        let zip = zip.trim();
        if !is_zip_code(zip) {
            bail!("invalid ZIP code: {zip}");
        }
        let base = zip.split('-').next().unwrap_or(zip);
        let resp = self
            .http
            .get(format!("{}/us/{base}", self.zip_url))
            .send()
            .await
            .context("geocoding service unavailable")?;
        if resp.status() != StatusCode::OK {
            bail!("invalid ZIP code: {zip}");
        }
        let body: ZipResponse = resp.json().await.context("unexpected geocoder response")?;
        let Some(place) = body.places.first() else {
            bail!("no location found for ZIP: {zip}");
        };
        let at = parse_coordinates(&place.latitude, &place.longitude)?;
        debug!(zip, %at, "geocoded ZIP");
        Ok(at)
    }

    async fn city(&self, city: &str) -> Result<Coordinates> {
        if city.trim().is_empty() {
            bail!("city name is empty");
        }
        let query = city_query(city);
        let resp = self
            .http
            .get(&self.city_url)
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", "us"),
            ])
            .send()
            .await
            .context("geocoding service unavailable")?;
        if resp.status() != StatusCode::OK {
            bail!("geocoding service error ({})", resp.status());
        }
        let places: Vec<NominatimPlace> =
            resp.json().await.context("unexpected geocoder response")?;
        let Some(place) = places.first() else {
            bail!("location not found: {query}");
        };
        let at = parse_coordinates(&place.lat, &place.lon)?;
        debug!(query = %query, %at, "geocoded city");
        Ok(at)
    }
}
