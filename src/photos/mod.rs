//! Bird photos from public media APIs.
//!
//! [`PhotoFinder`] asks each configured [`PhotoSource`] in turn, caches what
//! it finds per species and falls back to a fixed set of stock photos, so a
//! lookup always produces something to show.

pub mod cache;
pub mod flickr;
pub mod mock;
pub mod pexels;
pub mod wikimedia;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::consts::{HTTP_TIMEOUT_SECS, USER_AGENT};

pub use cache::PhotoCache;
pub use flickr::FlickrSource;
pub use pexels::PexelsSource;
pub use wikimedia::WikimediaSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    pub url: String,
    pub attribution: String,
}

impl Photo {
    pub fn new(url: impl Into<String>, attribution: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attribution: attribution.into(),
        }
    }
}

/// Somewhere to look for photos of a species.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    fn name(&self) -> &str;

    /// Best matches first. An empty list means nothing suitable was found.
    async fn search(&self, species: &str) -> Result<Vec<Photo>>;
}

#[async_trait]
impl<T: PhotoSource + ?Sized> PhotoSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn search(&self, species: &str) -> Result<Vec<Photo>> {
        (**self).search(species).await
    }
}

const UNSPLASH_ATTRIBUTION: &str = "Unsplash";

/// Gap between lookups started by [`PhotoFinder::preload`].
pub const PRELOAD_STAGGER: Duration = Duration::from_millis(100);

pub const FALLBACK_PHOTOS: [&str; 10] = [
    "https://images.unsplash.com/photo-1444464666168-49d633b86797?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1552728089-57bdde30beb3?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1606567595334-d39972c85dbe?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1535083783855-76ae62b2914e?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1522926193341-e9ffd686c60f?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1480044965905-02098d419e96?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1549608276-5786777e6587?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1555169062-013468b47731?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1591608971362-f08b2a75731a?w=600&h=400&fit=crop",
    "https://images.unsplash.com/photo-1551085254-e96b210db58a?w=600&h=400&fit=crop",
];

/// 31-multiplier string hash over UTF-16 code units with 32-bit wrapping,
/// made non-negative. Stable across runs so a species keeps its fallback.
pub fn species_hash(species: &str) -> u64 {
    let h = species.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    i64::from(h).unsigned_abs()
}

pub fn fallback_photo(species: &str) -> Photo {
    let index = (species_hash(species) % FALLBACK_PHOTOS.len() as u64) as usize;
    Photo::new(FALLBACK_PHOTOS[index], UNSPLASH_ATTRIBUTION)
}

/// Shared HTTP client for the photo and geocoding services.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

pub struct PhotoFinder {
    sources: Vec<Box<dyn PhotoSource>>,
    cache: Mutex<PhotoCache>,
}

impl PhotoFinder {
    pub fn new(sources: Vec<Box<dyn PhotoSource>>) -> Self {
        Self {
            sources,
            cache: Mutex::new(PhotoCache::new()),
        }
    }

    /// Flickr and Pexels need API keys and are skipped without one.
    /// Wikimedia is always available.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut sources: Vec<Box<dyn PhotoSource>> = Vec::new();
        if let Some(key) = &settings.flickr_api_key {
            sources.push(Box::new(FlickrSource::new(key)?));
        }
        sources.push(Box::new(WikimediaSource::new()?));
        if let Some(key) = &settings.pexels_api_key {
            sources.push(Box::new(PexelsSource::new(key)?));
        }
        Ok(Self::new(sources))
    }

    /// Keep only the named source.
    pub fn only(self, name: &str) -> Result<Self> {
        let available = self.source_names().join(", ");
        let sources: Vec<_> = self
            .sources
            .into_iter()
            .filter(|s| s.name().eq_ignore_ascii_case(name))
            .collect();
        if sources.is_empty() {
            bail!("photo source {name:?} is not available (configured: {available})");
        }
        Ok(Self::new(sources))
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    fn cache(&self) -> MutexGuard<'_, PhotoCache> {
        // The cache holds no invariants a panicking holder could break.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A photo for the species. Never fails: source errors are logged and
    /// the stock fallback is used when nothing turns up.
    pub async fn photo_for(&self, species: &str) -> Photo {
        if let Some(photo) = self.cache().next(species) {
            return photo;
        }

        for source in &self.sources {
            match source.search(species).await {
                Ok(photos) if !photos.is_empty() => {
                    debug!(source = source.name(), species, found = photos.len(), "photos found");
                    if let Some(first) = self.cache().insert(species, photos) {
                        return first;
                    }
                }
                Ok(_) => debug!(source = source.name(), species, "no photos"),
                Err(e) => warn!(source = source.name(), species, error = %e, "photo lookup failed"),
            }
        }

        let fallback = fallback_photo(species);
        self.cache().insert(species, vec![fallback.clone()]);
        fallback
    }

    /// Up to `count` distinct photos, taken from the rotation.
    pub async fn photos_for(&self, species: &str, count: usize) -> Vec<Photo> {
        let mut photos: Vec<Photo> = Vec::new();
        for _ in 0..count {
            let photo = self.photo_for(species).await;
            if photos.contains(&photo) {
                break;
            }
            photos.push(photo);
        }
        photos
    }

    /// Warm the cache, starting one lookup every `stagger`. Returns the
    /// photo found for each species, in input order.
    pub async fn preload(&self, species: &[String], stagger: Duration) -> Vec<Photo> {
        let lookups = species.iter().enumerate().map(|(i, name)| async move {
            tokio::time::sleep(stagger * i as u32).await;
            self.photo_for(name).await
        });
        futures::future::join_all(lookups).await
    }

    pub fn cached_species(&self) -> Vec<String> {
        self.cache().species()
    }
}
