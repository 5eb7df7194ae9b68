use std::collections::HashMap;

use super::Photo;

pub const MAX_PHOTOS_PER_SPECIES: usize = 5;

struct Entry {
    photos: Vec<Photo>,
    next: usize,
}

/// Photos per species, rotated on every lookup. Lives as long as the
/// process; nothing is ever evicted.
#[derive(Default)]
pub struct PhotoCache {
    entries: HashMap<String, Entry>,
}

fn key(species: &str) -> String {
    species.trim().to_lowercase()
}

impl PhotoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The photo after the one handed out last time, if the species is cached.
    pub fn next(&mut self, species: &str) -> Option<Photo> {
        let entry = self.entries.get_mut(&key(species))?;
        let photo = entry.photos[entry.next % entry.photos.len()].clone();
        entry.next = (entry.next + 1) % entry.photos.len();
        Some(photo)
    }

    /// Store up to [`MAX_PHOTOS_PER_SPECIES`] photos and return the first.
    /// The following [`next`](Self::next) returns the second one.
    /// Empty lists are not cached.
    pub fn insert(&mut self, species: &str, mut photos: Vec<Photo>) -> Option<Photo> {
        photos.truncate(MAX_PHOTOS_PER_SPECIES);
        let first = photos.first()?.clone();
        let next = 1 % photos.len();
        self.entries.insert(key(species), Entry { photos, next });
        Some(first)
    }

    pub fn contains(&self, species: &str) -> bool {
        self.entries.contains_key(&key(species))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached species keys, sorted.
    pub fn species(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}
