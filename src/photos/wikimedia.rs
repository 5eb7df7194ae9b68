//! Keyless lookups against Wikipedia and Wikimedia Commons.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::{Photo, PhotoSource, http_client};

const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";
const MAX_ATTRIBUTION: usize = 50;
const DEFAULT_ATTRIBUTION: &str = "Wikimedia Commons";

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

#[derive(Deserialize)]
struct PageImages {
    query: Option<PageImagesQuery>,
}

#[derive(Deserialize)]
struct PageImagesQuery {
    #[serde(default)]
    pages: Vec<WikiPage>,
}

#[derive(Deserialize)]
struct WikiPage {
    original: Option<ImageSource>,
}

#[derive(Deserialize)]
struct ImageSource {
    source: String,
}

#[derive(Deserialize)]
struct CommonsSearch {
    query: Option<CommonsQuery>,
}

/// Keyed by page id; `index` carries the search rank.
#[derive(Deserialize)]
struct CommonsQuery {
    #[serde(default)]
    pages: std::collections::HashMap<String, CommonsPage>,
}

#[derive(Deserialize)]
struct CommonsPage {
    #[serde(default)]
    index: i64,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Deserialize)]
struct ImageInfo {
    url: String,
    thumburl: Option<String>,
    #[serde(default)]
    extmetadata: Value,
}

impl ImageInfo {
    fn attribution(&self) -> String {
        let field = |name: &str| {
            self.extmetadata
                .get(name)
                .and_then(|f| f.get("value"))
                .and_then(Value::as_str)
                .filter(|v| !v.trim().is_empty())
        };
        field("Artist")
            .or_else(|| field("Credit"))
            .map(clean_attribution)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_ATTRIBUTION.to_string())
    }
}

/// Strip markup and keep it short enough for a caption.
pub fn clean_attribution(raw: &str) -> String {
    let text = HTML_TAG.replace_all(raw, "");
    text.trim().chars().take(MAX_ATTRIBUTION).collect()
}

pub struct WikimediaSource {
    http: reqwest::Client,
    wikipedia_url: String,
    commons_url: String,
}

impl WikimediaSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            wikipedia_url: WIKIPEDIA_API.to_string(),
            commons_url: COMMONS_API.to_string(),
        })
    }

    pub fn with_endpoints(mut self, wikipedia_url: &str, commons_url: &str) -> Self {
        self.wikipedia_url = wikipedia_url.to_string();
        self.commons_url = commons_url.to_string();
        self
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<T> {
        self.http
            .get(url)
            .query(params)
            .send()
            .await
            .context("wikimedia request failed")?
            .error_for_status()
            .context("wikimedia returned an error status")?
            .json()
            .await
            .context("unexpected wikimedia response")
    }

    /// Lead image of the article with exactly this title.
    async fn page_image(&self, title: &str) -> Result<Option<Photo>> {
        let params = [
            ("action", "query"),
            ("prop", "pageimages"),
            ("piprop", "original"),
            ("titles", title),
            ("format", "json"),
            ("formatversion", "2"),
        ];
        let resp: PageImages = self.fetch(&self.wikipedia_url, &params).await?;
        let photo = resp
            .query
            .and_then(|q| q.pages.into_iter().next())
            .and_then(|page| page.original)
            .map(|img| Photo::new(img.source, "Wikipedia"));
        Ok(photo)
    }

    /// First file in a Commons search for `<term> bird` that has image info.
    async fn commons_search(&self, term: &str) -> Result<Option<Photo>> {
        let search = format!("{term} bird");
        let params = [
            ("action", "query"),
            ("generator", "search"),
            ("gsrsearch", search.as_str()),
            ("gsrnamespace", "6"),
            ("gsrlimit", "5"),
            ("prop", "imageinfo"),
            ("iiprop", "url|extmetadata"),
            ("iiurlwidth", "800"),
            ("iiextmetadatafilter", "Artist|Credit|LicenseShortName"),
            ("format", "json"),
        ];
        let resp: CommonsSearch = self.fetch(&self.commons_url, &params).await?;
        let Some(query) = resp.query else {
            return Ok(None);
        };

        let mut pages: Vec<CommonsPage> = query.pages.into_values().collect();
        pages.sort_by_key(|p| p.index);
        let photo = pages
            .into_iter()
            .find_map(|page| page.imageinfo.into_iter().next())
            .map(|info| {
                let attribution = info.attribution();
                let url = info.thumburl.clone().unwrap_or(info.url);
                Photo::new(url, attribution)
            });
        Ok(photo)
    }
}

fn logged(step: &str, result: Result<Option<Photo>>) -> Option<Photo> {
    result.unwrap_or_else(|e| {
        warn!(step, error = %e, "wikimedia lookup failed");
        None
    })
}

#[async_trait]
impl PhotoSource for WikimediaSource {
    fn name(&self) -> &str {
        "wikimedia"
    }

    /// Wikipedia article image, then a Commons search on the name, then on
    /// the genus alone.
    async fn search(&self, species: &str) -> Result<Vec<Photo>> {
        let species = species.trim();
        if let Some(photo) = logged("wikipedia", self.page_image(species).await) {
            return Ok(vec![photo]);
        }
        if let Some(photo) = logged("commons", self.commons_search(species).await) {
            return Ok(vec![photo]);
        }
        if let Some((genus, _)) = species.split_once(' ') {
            if let Some(photo) = logged("commons-genus", self.commons_search(genus).await) {
                return Ok(vec![photo]);
            }
        }
        Ok(Vec::new())
    }
}
