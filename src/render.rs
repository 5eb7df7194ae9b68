//! Plain-text rendering for the terminal. Every function returns a `String`
//! so output can be checked in tests; commands print it.

use std::fmt::Write;

use crate::consts::{ebird_species_url, map_search_url};
use crate::models::{Favorite, Observation, SavedLocation, SearchRecord};
use crate::sightings::{LocationGroup, location_counts, species_counts};

pub const TOP_SPECIES: usize = 10;
pub const TOP_LOCATIONS: usize = 8;
pub const SPECIES_LABEL_WIDTH: usize = 25;
pub const LOCATION_LABEL_WIDTH: usize = 30;
const BAR_WIDTH: usize = 30;

/// Cut to `max` characters, ending in `...` when shortened.
pub fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    let keep = max.saturating_sub(3);
    let cut: String = label.chars().take(keep).collect();
    format!("{cut}...")
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

pub fn observations_table(observations: &[Observation]) -> String {
    if observations.is_empty() {
        return "  no sightings found\n".to_string();
    }
    let rows: Vec<[String; 4]> = observations
        .iter()
        .map(|o| {
            [
                o.date.clone(),
                truncate_label(&o.species, 32),
                o.how_many.map_or_else(|| "-".to_string(), |n| n.to_string()),
                truncate_label(&o.loc, 40),
            ]
        })
        .collect();
    let header = ["DATE", "SPECIES", "COUNT", "LOCATION"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let line = |cells: [&str; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| pad(cell, w))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };
    out.push_str(&line(header));
    for row in &rows {
        out.push_str(&line([&row[0], &row[1], &row[2], &row[3]]));
    }
    let _ = writeln!(out, "\n  {} sighting(s)", observations.len());
    out
}

/// Horizontal bars scaled to the largest count.
pub fn bar_chart(title: &str, counts: &[(String, usize)], limit: usize, label_width: usize) -> String {
    let mut out = format!("  {title}\n");
    let shown = &counts[..counts.len().min(limit)];
    let Some(max) = shown.iter().map(|(_, n)| *n).max() else {
        out.push_str("    (no data)\n");
        return out;
    };
    let labels: Vec<String> = shown
        .iter()
        .map(|(label, _)| truncate_label(label, label_width))
        .collect();
    let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    for (label, (_, n)) in labels.iter().zip(shown) {
        let len = (n * BAR_WIDTH).div_ceil(max.max(1));
        let _ = writeln!(out, "    {} {} {n}", pad(label, width), "█".repeat(len));
    }
    out
}

/// Top species and top locations.
pub fn charts(observations: &[Observation]) -> String {
    let mut out = bar_chart(
        "Top species",
        &species_counts(observations),
        TOP_SPECIES,
        SPECIES_LABEL_WIDTH,
    );
    out.push('\n');
    out.push_str(&bar_chart(
        "Top locations",
        &location_counts(observations),
        TOP_LOCATIONS,
        LOCATION_LABEL_WIDTH,
    ));
    out
}

/// One block per location with what was seen there and a map link.
pub fn location_markers(groups: &[LocationGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(
            out,
            "  📍 {} ({}) - {} sighting(s)",
            group.name, group.coordinates, group.total
        );
        for (species, n) in &group.species {
            let _ = writeln!(out, "      {species} x{n}");
        }
        let _ = writeln!(
            out,
            "      {}",
            map_search_url(group.coordinates.lat, group.coordinates.lng)
        );
    }
    if out.is_empty() {
        out.push_str("  nothing to map\n");
    }
    out
}

pub fn favorites_list(favorites: &[Favorite]) -> String {
    if favorites.is_empty() {
        return "  no favorites yet\n".to_string();
    }
    let mut out = String::new();
    for fav in favorites {
        let _ = write!(out, "  [{}] {} ({})", fav.id, fav.species_name, fav.species_code);
        if let Some(sci) = &fav.scientific_name {
            let _ = write!(out, " - {sci}");
        }
        out.push('\n');
        if let Some(notes) = fav.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            let _ = writeln!(out, "      {notes}");
        }
        let _ = writeln!(out, "      {}", ebird_species_url(&fav.species_code));
    }
    out
}

pub fn locations_list(locations: &[SavedLocation]) -> String {
    if locations.is_empty() {
        return "  no saved locations\n".to_string();
    }
    let mut out = String::new();
    for loc in locations {
        let marker = if loc.is_default { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker} [{}] {} - {} {} ({})",
            loc.id,
            loc.name,
            loc.location_type,
            loc.location_value,
            loc.coordinates()
        );
    }
    out
}

pub fn history_list(searches: &[SearchRecord]) -> String {
    if searches.is_empty() {
        return "  no searches yet\n".to_string();
    }
    let mut out = String::new();
    for s in searches {
        let _ = writeln!(
            out,
            "  {}  {:.4}, {:.4}  {} km  {} bird(s)",
            s.search_date, s.lat, s.lng, s.radius, s.bird_count
        );
    }
    out
}
