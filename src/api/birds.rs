use chrono::NaiveDate;

use super::{ApiClient, ApiError};
use crate::consts::{MAX_RARE_RADIUS_KM, MAX_SPECIES_RADIUS_KM, MAX_SUGGESTIONS};
use crate::models::{Coordinates, LocationKind, Observation, SpeciesSuggestion};

/// Where a species search is centered.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOrigin {
    Coordinates(Coordinates),
    /// A ZIP code or city the server geocodes.
    Place { kind: LocationKind, value: String },
}

/// Parameters for `GET /species/observations`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesQuery {
    pub species_code: String,
    pub origin: SearchOrigin,
    pub radius_km: u32,
    /// Only sightings on or after this day.
    pub cutoff: Option<NaiveDate>,
}

impl SpeciesQuery {
    pub fn params(&self) -> Result<Vec<(&'static str, String)>, ApiError> {
        let code = self.species_code.trim();
        if code.chars().count() < 2 {
            return Err(ApiError::invalid("species code must be at least 2 characters"));
        }
        check_radius(self.radius_km, MAX_SPECIES_RADIUS_KM)?;

        let mut params = vec![("species_code", code.to_string())];
        match &self.origin {
            SearchOrigin::Coordinates(at) => {
                params.push(("lat", at.lat.to_string()));
                params.push(("lng", at.lng.to_string()));
            }
            SearchOrigin::Place { kind, value } => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(ApiError::invalid("location value is empty"));
                }
                params.push(("location_type", kind.to_string()));
                params.push(("location_value", value.to_string()));
            }
        }
        params.push(("radius_km", self.radius_km.to_string()));
        if let Some(cutoff) = self.cutoff {
            params.push(("cutoff_date", cutoff.format("%Y-%m-%d").to_string()));
        }
        Ok(params)
    }
}

fn check_radius(radius_km: u32, max: u32) -> Result<(), ApiError> {
    if radius_km == 0 || radius_km > max {
        return Err(ApiError::Invalid(format!(
            "radius must be 1-{max} km (got {radius_km})"
        )));
    }
    Ok(())
}

impl ApiClient {
    /// Notable sightings around a point. When logged in, the server also
    /// records the search in the account's history.
    pub async fn rare_birds(
        &self,
        at: Coordinates,
        radius_km: u32,
    ) -> Result<Vec<Observation>, ApiError> {
        check_radius(radius_km, MAX_RARE_RADIUS_KM)?;
        let query = [
            ("lat", at.lat.to_string()),
            ("lng", at.lng.to_string()),
            ("radius", radius_km.to_string()),
        ];
        self.get_json("/birds/rare", &query).await
    }

    /// Autocomplete by common or scientific name. An empty query yields
    /// nothing without a round trip.
    pub async fn suggest_species(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SpeciesSuggestion>, ApiError> {
        let q = query.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let params = [
            ("q", q.to_string()),
            ("limit", limit.clamp(1, MAX_SUGGESTIONS).to_string()),
        ];
        self.get_json("/species/suggest", &params).await
    }

    /// Recent sightings of one species around a point or place.
    pub async fn species_observations(
        &self,
        query: &SpeciesQuery,
    ) -> Result<Vec<Observation>, ApiError> {
        let params = query.params()?;
        self.get_json("/species/observations", &params).await
    }
}
