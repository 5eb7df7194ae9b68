use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use super::{Photo, PhotoSource, http_client};

const API_URL: &str = "https://api.pexels.com/v1";
const KEEP: usize = 3;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Deserialize)]
struct PexelsPhoto {
    src: PhotoSizes,
    photographer: String,
}

#[derive(Deserialize)]
struct PhotoSizes {
    medium: String,
}

pub struct PexelsSource {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PexelsSource {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.to_string(),
            base_url: API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PhotoSource for PexelsSource {
    fn name(&self) -> &str {
        "pexels"
    }

    /// The top few landscape results, shuffled.
    async fn search(&self, species: &str) -> Result<Vec<Photo>> {
        let query = format!("{} bird wildlife", species.trim());
        let resp: SearchResponse = self
            .http
            .get(format!("{}/search", self.base_url))
            .header(AUTHORIZATION, &self.api_key)
            .query(&[
                ("query", query.as_str()),
                ("per_page", "5"),
                ("orientation", "landscape"),
            ])
            .send()
            .await
            .context("pexels request failed")?
            .error_for_status()
            .context("pexels returned an error status")?
            .json()
            .await
            .context("unexpected pexels response")?;

        let mut photos: Vec<Photo> = resp
            .photos
            .into_iter()
            .take(KEEP)
            .map(|p| Photo::new(p.src.medium, p.photographer))
            .collect();
        photos.shuffle(&mut rand::rng());
        Ok(photos)
    }
}
