//! Filtering and aggregation over fetched observations. Pure functions, no I/O.

use std::cmp::Reverse;
use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use crate::models::{Coordinates, Observation};

/// Narrow a result set. Empty or unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SightingFilter {
    /// Substring of the common name, or the exact species code.
    pub species: Option<String>,
    /// Substring of the location name.
    pub location: Option<String>,
    /// Keep observations on or after this day; undated ones are dropped.
    pub since: Option<NaiveDate>,
}

fn needle(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

impl SightingFilter {
    pub fn is_empty(&self) -> bool {
        needle(&self.species).is_none() && needle(&self.location).is_none() && self.since.is_none()
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        if let Some(species) = needle(&self.species) {
            let name_hit = obs.species.to_lowercase().contains(&species);
            if !name_hit && !obs.species_code.eq_ignore_ascii_case(&species) {
                return false;
            }
        }
        if let Some(location) = needle(&self.location) {
            if !obs.loc.to_lowercase().contains(&location) {
                return false;
            }
        }
        if let Some(since) = self.since {
            match obs.observed_at() {
                Some(at) if at.date() >= since => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply(&self, observations: Vec<Observation>) -> Vec<Observation> {
        observations.into_iter().filter(|o| self.matches(o)).collect()
    }
}

/// Newest first. Observations with unparseable dates go last, in input order.
pub fn sort_newest_first(observations: &mut [Observation]) {
    observations.sort_by_key(|o| match o.observed_at() {
        Some(at) => (false, Reverse(Some(at))),
        None => (true, Reverse(None)),
    });
}

pub fn latest_sighting(observations: &[Observation]) -> Option<&Observation> {
    observations
        .iter()
        .filter_map(|o| o.observed_at().map(|at| (at, o)))
        .max_by_key(|(at, _)| *at)
        .map(|(_, o)| o)
}

fn ranked(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Sightings per species, most reported first.
pub fn species_counts(observations: &[Observation]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for obs in observations {
        *counts.entry(obs.species.as_str()).or_default() += 1;
    }
    ranked(counts)
}

/// Sightings per location name, busiest first.
pub fn location_counts(observations: &[Observation]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for obs in observations {
        *counts.entry(obs.loc.as_str()).or_default() += 1;
    }
    ranked(counts)
}

/// Mean position of all observations.
pub fn map_center(observations: &[Observation]) -> Option<Coordinates> {
    if observations.is_empty() {
        return None;
    }
    let n = observations.len() as f64;
    let (lat, lng) = observations
        .iter()
        .fold((0.0, 0.0), |(lat, lng), o| (lat + o.lat, lng + o.lng));
    Some(Coordinates {
        lat: lat / n,
        lng: lng / n,
    })
}

/// One map marker: everything seen at a single location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationGroup {
    pub name: String,
    pub loc_id: String,
    pub coordinates: Coordinates,
    /// Species seen here with their sighting counts, most first.
    pub species: Vec<(String, usize)>,
    pub total: usize,
}

/// Group by location id, keeping the first coordinates seen for each.
/// Groups come out busiest first, ties by name.
pub fn group_by_location(observations: &[Observation]) -> Vec<LocationGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&Observation>> = HashMap::new();
    for obs in observations {
        let key = if obs.loc_id.is_empty() {
            obs.loc.as_str()
        } else {
            obs.loc_id.as_str()
        };
        members
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(obs);
    }

    let mut groups: Vec<LocationGroup> = order
        .into_iter()
        .filter_map(|key| {
            let seen = members.remove(key)?;
            let first = seen.first()?;
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for obs in &seen {
                *counts.entry(obs.species.as_str()).or_default() += 1;
            }
            Some(LocationGroup {
                name: first.loc.clone(),
                loc_id: first.loc_id.clone(),
                coordinates: first.coordinates(),
                species: ranked(counts),
                total: seen.len(),
            })
        })
        .collect();
    groups.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    groups
}

/// Parse a `YYYY-MM-DD` cutoff, refusing days after `today`.
pub fn parse_cutoff(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {input:?}, expected YYYY-MM-DD"))?;
    if date > today {
        bail!("date {date} is in the future");
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(species: &str, code: &str, loc: &str, loc_id: &str, date: &str) -> Observation {
        Observation {
            species: species.to_string(),
            species_code: code.to_string(),
            loc: loc.to_string(),
            loc_id: loc_id.to_string(),
            date: date.to_string(),
            lat: 40.0,
            lng: -105.0,
            how_many: Some(1),
            user_display_name: None,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Vec<Observation> {
        vec![
            obs("Snowy Owl", "snoowl1", "Barr Lake", "L1", "2025-01-10 08:15"),
            obs("Bald Eagle", "baleag", "Barr Lake", "L1", "2025-01-12 09:00"),
            obs("Snowy Owl", "snoowl1", "Cherry Creek", "L2", "2025-01-05 16:40"),
            obs("Harris's Sparrow", "harspa", "Bear Creek", "L3", "someday"),
        ]
    }

    #[test]
    fn filter_by_species_name_or_code() {
        let by_name = SightingFilter {
            species: Some("owl".to_string()),
            ..Default::default()
        };
        assert_eq!(by_name.apply(sample()).len(), 2);

        let by_code = SightingFilter {
            species: Some("BALEAG".to_string()),
            ..Default::default()
        };
        assert_eq!(by_code.apply(sample()).len(), 1);
    }

    #[test]
    fn filter_by_location() {
        let filter = SightingFilter {
            location: Some("creek".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(sample()).len(), 2);
    }

    #[test]
    fn filter_since_drops_old_and_undated() {
        let filter = SightingFilter {
            since: Some(day("2025-01-10")),
            ..Default::default()
        };
        let kept = filter.apply(sample());
        let species: Vec<&str> = kept.iter().map(|o| o.species.as_str()).collect();
        assert_eq!(species, vec!["Snowy Owl", "Bald Eagle"]);
    }

    #[test]
    fn blank_filter_matches_everything() {
        let filter = SightingFilter {
            species: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(filter.is_empty());
        assert_eq!(filter.apply(sample()).len(), 4);
    }

    #[test]
    fn sort_puts_undated_last() {
        let mut all = sample();
        sort_newest_first(&mut all);
        let dates: Vec<&str> = all.iter().map(|o| o.date.as_str()).collect();
        assert_eq!(
            dates,
            vec![
                "2025-01-12 09:00",
                "2025-01-10 08:15",
                "2025-01-05 16:40",
                "someday"
            ]
        );
    }

    #[test]
    fn latest_ignores_undated() {
        let all = sample();
        assert_eq!(latest_sighting(&all).unwrap().species, "Bald Eagle");
        assert!(latest_sighting(&all[3..]).is_none());
    }

    #[test]
    fn counts_sorted_with_name_tiebreak() {
        let all = sample();
        assert_eq!(
            species_counts(&all),
            vec![
                ("Snowy Owl".to_string(), 2),
                ("Bald Eagle".to_string(), 1),
                ("Harris's Sparrow".to_string(), 1),
            ]
        );
        assert_eq!(location_counts(&all)[0], ("Barr Lake".to_string(), 2));
    }

    #[test]
    fn center_is_mean() {
        let mut all = sample();
        all[0].lat = 42.0;
        all[0].lng = -103.0;
        let center = map_center(&all).unwrap();
        assert!((center.lat - 40.5).abs() < 1e-9);
        assert!((center.lng + 104.5).abs() < 1e-9);
        assert!(map_center(&[]).is_none());
    }

    #[test]
    fn groups_keep_first_coordinates() {
        let mut all = sample();
        all[1].lat = 41.0;
        let groups = group_by_location(&all);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].name, "Barr Lake");
        assert_eq!(groups[0].total, 2);
        assert_eq!(groups[0].coordinates.lat, 40.0);
        assert_eq!(groups[0].species.len(), 2);
    }

    #[test]
    fn cutoff_parsing() {
        let today = day("2025-06-01");
        assert_eq!(parse_cutoff("2025-05-01", today).unwrap(), day("2025-05-01"));
        assert_eq!(parse_cutoff("2025-06-01", today).unwrap(), today);
        assert!(parse_cutoff("2025-06-02", today).is_err());
        assert!(parse_cutoff("05/01/2025", today).is_err());
    }
}
