use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Photo, PhotoSource, http_client};

const API_URL: &str = "https://api.flickr.com/services/rest/";
/// Creative Commons licence ids.
const CC_LICENSES: &str = "1,2,3,4,5,6,7,8,9,10";
const EXACT_KEEP: usize = 5;
const BROAD_KEEP: usize = 3;

#[derive(Deserialize)]
struct SearchResponse {
    stat: String,
    photos: Option<PhotoPage>,
}

#[derive(Deserialize)]
struct PhotoPage {
    #[serde(default)]
    photo: Vec<FlickrPhoto>,
}

#[derive(Deserialize)]
struct FlickrPhoto {
    id: String,
    secret: String,
    server: String,
    ownername: Option<String>,
}

impl FlickrPhoto {
    /// 640px on the long side.
    fn url(&self) -> String {
        format!(
            "https://live.staticflickr.com/{}/{}_{}_z.jpg",
            self.server, self.id, self.secret
        )
    }

    fn into_photo(self) -> Photo {
        let url = self.url();
        let attribution = self
            .ownername
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Flickr".to_string());
        Photo { url, attribution }
    }
}

struct Search<'a> {
    text: String,
    tags: &'a str,
    sort: &'a str,
    per_page: u32,
}

pub struct FlickrSource {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FlickrSource {
    pub fn new(api_key: &str) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.to_string(),
            base_url: API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    async fn run(&self, search: Search<'_>) -> Result<Vec<FlickrPhoto>> {
        let per_page = search.per_page.to_string();
        let params = [
            ("method", "flickr.photos.search"),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
            ("nojsoncallback", "1"),
            ("text", search.text.as_str()),
            ("tags", search.tags),
            ("tag_mode", "any"),
            ("sort", search.sort),
            ("per_page", per_page.as_str()),
            ("license", CC_LICENSES),
            ("content_type", "1"),
            ("media", "photos"),
            ("extras", "owner_name"),
            ("safe_search", "1"),
        ];
        let resp: SearchResponse = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .context("flickr request failed")?
            .error_for_status()
            .context("flickr returned an error status")?
            .json()
            .await
            .context("unexpected flickr response")?;

        if resp.stat != "ok" {
            debug!(stat = %resp.stat, "flickr search not ok");
            return Ok(Vec::new());
        }
        Ok(resp.photos.map(|p| p.photo).unwrap_or_default())
    }
}

#[async_trait]
impl PhotoSource for FlickrSource {
    fn name(&self) -> &str {
        "flickr"
    }

    /// Exact-name search first, then a looser one on the first word.
    async fn search(&self, species: &str) -> Result<Vec<Photo>> {
        let species = species.trim();
        let exact = self
            .run(Search {
                text: format!("\"{species}\" bird"),
                tags: "bird,birds,wildlife,ornithology,birding,birdwatching",
                sort: "relevance",
                per_page: 15,
            })
            .await?;
        if !exact.is_empty() {
            return Ok(exact.into_iter().take(EXACT_KEEP).map(FlickrPhoto::into_photo).collect());
        }

        let Some(first_word) = species.split_whitespace().next() else {
            return Ok(Vec::new());
        };
        let broad = self
            .run(Search {
                text: format!("{first_word} bird"),
                tags: "bird,wildlife",
                sort: "interestingness-desc",
                per_page: 10,
            })
            .await?;
        Ok(broad.into_iter().take(BROAD_KEEP).map(FlickrPhoto::into_photo).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_url_uses_medium_640() {
        let photo = FlickrPhoto {
            id: "5210".to_string(),
            secret: "abc".to_string(),
            server: "65535".to_string(),
            ownername: None,
        };
        let photo = photo.into_photo();
        assert_eq!(photo.url, "https://live.staticflickr.com/65535/5210_abc_z.jpg");
        assert_eq!(photo.attribution, "Flickr");
    }

    #[test]
    fn failed_stat_has_no_photos() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"stat":"fail","code":100,"message":"Invalid API Key"}"#)
                .unwrap();
        assert_eq!(resp.stat, "fail");
        assert!(resp.photos.is_none());
    }
}
