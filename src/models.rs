//! Records exchanged with the birdspot backend.
//!
//! Timestamps the server generates (`created_at`, `added_date`, ...) are kept
//! as the strings the server sent; only observation dates are parsed, because
//! filtering and sorting depend on them.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            bail!("latitude out of range: {lat}");
        }
        if !(-180.0..=180.0).contains(&lng) {
            bail!("longitude out of range: {lng}");
        }
        Ok(Self { lat, lng })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// A single reported sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub species: String,
    pub species_code: String,
    pub loc: String,
    pub loc_id: String,
    /// `YYYY-MM-DD HH:MM` as reported, sometimes date only.
    pub date: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub how_many: Option<u32>,
    #[serde(default)]
    pub user_display_name: Option<String>,
}

impl Observation {
    /// Parse the reported date. Date-only values resolve to midnight.
    pub fn observed_at(&self) -> Option<NaiveDateTime> {
        let raw = self.date.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSuggestion {
    pub species_name: String,
    pub species_code: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub created_at: String,
}

/// `GET /auth/me`: the user plus recent searches and favorites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub recent_searches: Vec<SearchRecord>,
    #[serde(default)]
    pub favorites: Vec<Favorite>,
}

/// One authenticated rare-birds lookup, recorded by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: i64,
    pub user_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub radius: u32,
    pub bird_count: u32,
    pub search_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub species_name: String,
    pub species_code: String,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub added_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFavorite {
    pub species_name: String,
    pub species_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewFavorite {
    pub fn validate(&self) -> Result<()> {
        if self.species_name.trim().is_empty() {
            bail!("species name is required");
        }
        if self.species_code.trim().is_empty() {
            bail!("species code is required");
        }
        Ok(())
    }
}

impl From<SpeciesSuggestion> for NewFavorite {
    fn from(s: SpeciesSuggestion) -> Self {
        Self {
            species_name: s.species_name,
            species_code: s.species_code,
            scientific_name: s.scientific_name,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteStatus {
    pub is_favorited: bool,
    pub favorite_id: Option<i64>,
}

/// How a saved location was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Zip,
    City,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::City => "city",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "city" => Ok(Self::City),
            other => bail!("invalid location type: {other} (expected zip or city)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub location_type: LocationKind,
    pub location_value: String,
    pub lat: f64,
    pub lng: f64,
    pub is_default: bool,
    pub created_at: String,
}

impl SavedLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub location_type: LocationKind,
    pub location_value: String,
    pub is_default: bool,
}

impl NewLocation {
    pub fn validate(&self) -> Result<()> {
        check_length("location name", &self.name, 1, 100)?;
        check_length("location value", &self.location_value, 1, 100)?;
        if self.location_type == LocationKind::Zip && !is_zip_code(self.location_value.trim()) {
            bail!("invalid ZIP code: {}", self.location_value.trim());
        }
        Ok(())
    }
}

/// Partial update; absent fields are left unchanged by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl LocationUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_length("location name", name, 1, 100)?;
        }
        if self.name.is_none() && self.is_default.is_none() {
            bail!("nothing to update");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        if !is_email(&self.email) {
            bail!("invalid email address: {}", self.email);
        }
        check_length("username", &self.username, 3, 50)?;
        if self.password.chars().count() < 8 {
            bail!("password must be at least 8 characters");
        }
        Ok(())
    }
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        bail!("{field} must be {min}-{max} characters (got {len})");
    }
    Ok(())
}

/// Five digits, optionally followed by `-` and four more.
pub fn is_zip_code(value: &str) -> bool {
    let (base, plus4) = match value.split_once('-') {
        Some((base, ext)) => (base, Some(ext)),
        None => (value, None),
    };
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    digits(base, 5) && plus4.is_none_or(|ext| digits(ext, 4))
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(date: &str) -> Observation {
        Observation {
            species: "Snowy Owl".to_string(),
            species_code: "snoowl1".to_string(),
            loc: "Ocean Beach".to_string(),
            loc_id: "L123".to_string(),
            date: date.to_string(),
            lat: 37.76,
            lng: -122.51,
            how_many: Some(1),
            user_display_name: None,
        }
    }

    #[test]
    fn observed_at_with_time() {
        let at = observation("2025-01-14 08:30").observed_at().unwrap();
        assert_eq!(at.to_string(), "2025-01-14 08:30:00");
    }

    #[test]
    fn observed_at_date_only() {
        let at = observation("2025-01-14").observed_at().unwrap();
        assert_eq!(at.to_string(), "2025-01-14 00:00:00");
    }

    #[test]
    fn observed_at_garbage_is_none() {
        assert!(observation("yesterday").observed_at().is_none());
        assert!(observation("").observed_at().is_none());
    }

    #[test]
    fn observation_deserializes_without_optional_fields() {
        let json = r#"{"species":"Ruff","species_code":"ruff","loc":"Marsh","loc_id":"L1",
                       "date":"2025-02-01 10:00","lat":1.0,"lng":2.0}"#;
        let obs: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.how_many, None);
        assert_eq!(obs.user_display_name, None);
    }

    #[test]
    fn coordinates_range_checked() {
        assert!(Coordinates::new(37.0, -122.0).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -181.0).is_err());
    }

    #[test]
    fn location_kind_round_trip() {
        assert_eq!("zip".parse::<LocationKind>().unwrap(), LocationKind::Zip);
        assert_eq!("CITY".parse::<LocationKind>().unwrap(), LocationKind::City);
        assert!("street".parse::<LocationKind>().is_err());
        assert_eq!(LocationKind::City.to_string(), "city");
        assert_eq!(serde_json::to_string(&LocationKind::Zip).unwrap(), "\"zip\"");
    }

    #[test]
    fn zip_codes() {
        assert!(is_zip_code("94103"));
        assert!(is_zip_code("94103-1234"));
        assert!(!is_zip_code("9410"));
        assert!(!is_zip_code("94103-12"));
        assert!(!is_zip_code("abcde"));
    }

    #[test]
    fn new_user_validation() {
        let ok = NewUser {
            email: "birder@example.com".to_string(),
            username: "birder".to_string(),
            password: "longenough".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = NewUser {
            email: "birder@example".to_string(),
            ..ok.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_name = NewUser {
            username: "ab".to_string(),
            ..ok.clone()
        };
        assert!(short_name.validate().is_err());

        let short_password = NewUser {
            password: "short".to_string(),
            ..ok
        };
        let err = short_password.validate().unwrap_err();
        assert!(err.to_string().contains("at least 8"));
    }

    #[test]
    fn new_location_validation() {
        let home = NewLocation {
            name: "Home".to_string(),
            location_type: LocationKind::Zip,
            location_value: "94103".to_string(),
            is_default: true,
        };
        assert!(home.validate().is_ok());

        let bad_zip = NewLocation {
            location_value: "Denver".to_string(),
            ..home.clone()
        };
        assert!(bad_zip.validate().is_err());

        let city = NewLocation {
            location_type: LocationKind::City,
            location_value: "Denver, CO".to_string(),
            ..home.clone()
        };
        assert!(city.validate().is_ok());

        let unnamed = NewLocation {
            name: "   ".to_string(),
            ..home
        };
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn location_update_requires_a_field() {
        assert!(LocationUpdate::default().validate().is_err());
        let rename = LocationUpdate {
            name: Some("Work".to_string()),
            is_default: None,
        };
        assert!(rename.validate().is_ok());
        assert_eq!(
            serde_json::to_string(&rename).unwrap(),
            r#"{"name":"Work"}"#
        );
    }

    #[test]
    fn new_favorite_omits_empty_optionals() {
        let fav = NewFavorite {
            species_name: "Bald Eagle".to_string(),
            species_code: "baleag".to_string(),
            scientific_name: None,
            notes: None,
        };
        assert_eq!(
            serde_json::to_string(&fav).unwrap(),
            r#"{"species_name":"Bald Eagle","species_code":"baleag"}"#
        );
    }

    #[test]
    fn profile_flattens_user() {
        let json = r#"{"id":1,"email":"a@b.co","username":"abc","is_active":true,
                       "created_at":"2025-01-01T00:00:00","recent_searches":[],"favorites":[]}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.user.username, "abc");
        assert!(profile.favorites.is_empty());
    }
}
