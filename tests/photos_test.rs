use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use birdspot::photos::mock::MockSource;
use birdspot::photos::{
    FALLBACK_PHOTOS, FlickrSource, PexelsSource, Photo, PhotoFinder, PhotoSource,
    WikimediaSource, fallback_photo,
};

fn photos(prefix: &str, n: usize) -> Vec<Photo> {
    (0..n)
        .map(|i| Photo::new(format!("https://img.test/{prefix}/{i}.jpg"), prefix))
        .collect()
}

// ── Finder chain and cache ────────────────────────────────────────

#[tokio::test]
async fn sources_are_tried_in_order_until_one_finds_photos() {
    let broken = Arc::new(MockSource::new("flickr", vec![Err("rate limited".to_string())]));
    let empty = Arc::new(MockSource::empty("wikimedia"));
    let pexels = Arc::new(MockSource::new("pexels", vec![Ok(photos("pexels", 2))]));
    let finder = PhotoFinder::new(vec![
        Box::new(broken.clone()),
        Box::new(empty.clone()),
        Box::new(pexels.clone()),
    ]);

    let photo = finder.photo_for("Snowy Owl").await;
    assert_eq!(photo.url, "https://img.test/pexels/0.jpg");
    assert_eq!((broken.calls(), empty.calls(), pexels.calls()), (1, 1, 1));

    // Served from the cache from now on.
    finder.photo_for("snowy owl").await;
    assert_eq!(pexels.calls(), 1);
}

#[tokio::test]
async fn repeated_lookups_rotate_through_cached_photos() {
    let source = MockSource::new("flickr", vec![Ok(photos("flickr", 3))]);
    let finder = PhotoFinder::new(vec![Box::new(source)]);

    let mut urls = Vec::new();
    for _ in 0..5 {
        urls.push(finder.photo_for("Bald Eagle").await.url);
    }
    assert_eq!(
        urls,
        vec![
            "https://img.test/flickr/0.jpg",
            "https://img.test/flickr/1.jpg",
            "https://img.test/flickr/2.jpg",
            "https://img.test/flickr/0.jpg",
            "https://img.test/flickr/1.jpg",
        ]
    );
}

#[tokio::test]
async fn at_most_five_photos_are_kept() {
    let source = MockSource::new("flickr", vec![Ok(photos("flickr", 9))]);
    let finder = PhotoFinder::new(vec![Box::new(source)]);
    let got = finder.photos_for("Bald Eagle", 9).await;
    assert_eq!(got.len(), 5);
}

#[tokio::test]
async fn fallback_is_deterministic_and_cached() {
    let source = Arc::new(MockSource::empty("wikimedia"));
    let finder = PhotoFinder::new(vec![Box::new(source.clone())]);

    let first = finder.photo_for("Kirtland's Warbler").await;
    let second = finder.photo_for("Kirtland's Warbler").await;
    assert_eq!(first, fallback_photo("Kirtland's Warbler"));
    assert_eq!(first, second);
    assert!(FALLBACK_PHOTOS.contains(&first.url.as_str()));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn preload_warms_every_species() {
    let source = Arc::new(MockSource::new(
        "flickr",
        vec![Ok(photos("a", 1)), Ok(photos("b", 1)), Ok(photos("c", 1))],
    ));
    let finder = PhotoFinder::new(vec![Box::new(source.clone())]);
    let species = vec![
        "Snowy Owl".to_string(),
        "Bald Eagle".to_string(),
        "Kea".to_string(),
    ];

    let found = finder.preload(&species, Duration::from_millis(5)).await;
    assert_eq!(found.len(), 3);
    assert_eq!(source.calls(), 3);
    assert_eq!(
        finder.cached_species(),
        vec!["bald eagle", "kea", "snowy owl"]
    );
}

#[tokio::test]
async fn preload_returns_best_match_without_advancing_rotation() {
    let source = Arc::new(MockSource::new(
        "flickr",
        vec![Ok(photos("owl", 3)), Ok(photos("eagle", 3))],
    ));
    let finder = PhotoFinder::new(vec![Box::new(source.clone())]);
    let species = vec!["Snowy Owl".to_string(), "Bald Eagle".to_string()];

    let found = finder.preload(&species, Duration::from_millis(20)).await;
    assert_eq!(found[0].url, "https://img.test/owl/0.jpg");
    assert_eq!(found[1].url, "https://img.test/eagle/0.jpg");

    // The next lookup moves on to the second cached photo.
    let next = finder.photo_for("Snowy Owl").await;
    assert_eq!(next.url, "https://img.test/owl/1.jpg");
}

// ── Flickr ────────────────────────────────────────────────────────

fn flickr_photo(i: usize) -> serde_json::Value {
    json!({
        "id": format!("{i}"),
        "owner": "o",
        "secret": "s",
        "server": "65535",
        "farm": 66,
        "title": "bird",
        "ispublic": 1,
        "isfriend": 0,
        "isfamily": 0,
        "ownername": format!("owner {i}")
    })
}

#[tokio::test]
async fn flickr_exact_search_keeps_five() {
    let server = MockServer::start_async().await;
    let exact = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "flickr.photos.search")
                .query_param("api_key", "fk")
                .query_param("text", "\"Snowy Owl\" bird")
                .query_param("sort", "relevance")
                .query_param("per_page", "15")
                .query_param("license", "1,2,3,4,5,6,7,8,9,10");
            let list: Vec<_> = (0..8).map(flickr_photo).collect();
            then.status(200)
                .json_body(json!({ "stat": "ok", "photos": { "page": 1, "photo": list } }));
        })
        .await;

    let flickr = FlickrSource::new("fk")
        .unwrap()
        .with_base_url(&server.url("/services/rest/"));
    let found = flickr.search("Snowy Owl").await.unwrap();
    exact.assert_async().await;
    assert_eq!(found.len(), 5);
    assert_eq!(found[0].url, "https://live.staticflickr.com/65535/0_s_z.jpg");
    assert_eq!(found[0].attribution, "owner 0");
}

#[tokio::test]
async fn flickr_falls_back_to_broader_search() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("text", "\"Snowy Owl\" bird");
            then.status(200)
                .json_body(json!({ "stat": "ok", "photos": { "photo": [] } }));
        })
        .await;
    let broad = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("text", "Snowy bird")
                .query_param("sort", "interestingness-desc")
                .query_param("tags", "bird,wildlife");
            let list: Vec<_> = (0..6).map(flickr_photo).collect();
            then.status(200)
                .json_body(json!({ "stat": "ok", "photos": { "photo": list } }));
        })
        .await;

    let flickr = FlickrSource::new("fk")
        .unwrap()
        .with_base_url(&server.url("/services/rest/"));
    let found = flickr.search("Snowy Owl").await.unwrap();
    broad.assert_async().await;
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn flickr_failure_stat_finds_nothing() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/services/rest/");
            then.status(200)
                .json_body(json!({ "stat": "fail", "code": 100, "message": "Invalid API Key" }));
        })
        .await;

    let flickr = FlickrSource::new("bad")
        .unwrap()
        .with_base_url(&server.url("/services/rest/"));
    assert!(flickr.search("Snowy Owl").await.unwrap().is_empty());
}

// ── Wikimedia ─────────────────────────────────────────────────────

fn wikimedia(server: &MockServer) -> WikimediaSource {
    WikimediaSource::new()
        .unwrap()
        .with_endpoints(&server.url("/wikipedia/api.php"), &server.url("/commons/api.php"))
}

#[tokio::test]
async fn wikipedia_page_image_wins() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/wikipedia/api.php")
                .query_param("titles", "Snowy Owl")
                .query_param("piprop", "original");
            then.status(200).json_body(json!({
                "query": { "pages": [{
                    "pageid": 1,
                    "title": "Snowy owl",
                    "original": { "source": "https://upload.test/snowy.jpg", "width": 1000, "height": 800 }
                }]}
            }));
        })
        .await;
    let commons = server
        .mock_async(|when, then| {
            when.method(GET).path("/commons/api.php");
            then.status(200).json_body(json!({}));
        })
        .await;

    let found = wikimedia(&server).search("Snowy Owl").await.unwrap();
    assert_eq!(found, vec![Photo::new("https://upload.test/snowy.jpg", "Wikipedia")]);
    assert_eq!(commons.hits_async().await, 0);
}

#[tokio::test]
async fn commons_search_cleans_attribution() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/wikipedia/api.php");
            then.status(200).json_body(json!({
                "query": { "pages": [{ "title": "Snowy Owl", "missing": true }] }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/commons/api.php")
                .query_param("gsrsearch", "Snowy Owl bird")
                .query_param("gsrnamespace", "6");
            then.status(200).json_body(json!({
                "query": { "pages": {
                    "200": {
                        "index": 2,
                        "imageinfo": [{ "url": "https://upload.test/second.jpg" }]
                    },
                    "100": {
                        "index": 1,
                        "imageinfo": [{
                            "url": "https://upload.test/full.jpg",
                            "thumburl": "https://upload.test/800px.jpg",
                            "extmetadata": {
                                "Artist": { "value": "<a href=\"//commons.wikimedia.org/wiki/User:Jane\">Jane Birder</a>" }
                            }
                        }]
                    }
                }}
            }));
        })
        .await;

    let found = wikimedia(&server).search("Snowy Owl").await.unwrap();
    assert_eq!(found, vec![Photo::new("https://upload.test/800px.jpg", "Jane Birder")]);
}

#[tokio::test]
async fn commons_retries_with_genus() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/wikipedia/api.php");
            then.status(500);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/commons/api.php")
                .query_param("gsrsearch", "Bubo scandiacus bird");
            then.status(200).json_body(json!({ "batchcomplete": "" }));
        })
        .await;
    let genus = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/commons/api.php")
                .query_param("gsrsearch", "Bubo bird");
            then.status(200).json_body(json!({
                "query": { "pages": { "7": {
                    "index": 1,
                    "imageinfo": [{ "url": "https://upload.test/bubo.jpg" }]
                }}}
            }));
        })
        .await;

    let found = wikimedia(&server).search("Bubo scandiacus").await.unwrap();
    genus.assert_async().await;
    assert_eq!(
        found,
        vec![Photo::new("https://upload.test/bubo.jpg", "Wikimedia Commons")]
    );
}

// ── Pexels ────────────────────────────────────────────────────────

#[tokio::test]
async fn pexels_sends_key_and_keeps_top_three() {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/search")
                .header("authorization", "px-key")
                .query_param("query", "Snowy Owl bird wildlife")
                .query_param("per_page", "5")
                .query_param("orientation", "landscape");
            let list: Vec<_> = (0..5)
                .map(|i| {
                    json!({
                        "src": { "medium": format!("https://px.test/{i}.jpg"), "large": "x" },
                        "alt": "owl",
                        "photographer": format!("Photographer {i}")
                    })
                })
                .collect();
            then.status(200)
                .json_body(json!({ "photos": list, "total_results": 5, "page": 1, "per_page": 5 }));
        })
        .await;

    let pexels = PexelsSource::new("px-key")
        .unwrap()
        .with_base_url(&server.url("/v1"));
    let found = pexels.search("Snowy Owl").await.unwrap();
    search.assert_async().await;

    let mut urls: Vec<String> = found.iter().map(|p| p.url.clone()).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://px.test/0.jpg",
            "https://px.test/1.jpg",
            "https://px.test/2.jpg"
        ]
    );
}

#[tokio::test]
async fn pexels_bad_key_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/search");
            then.status(401).body("Unauthorized");
        })
        .await;

    let pexels = PexelsSource::new("nope")
        .unwrap()
        .with_base_url(&server.url("/v1"));
    assert!(pexels.search("Snowy Owl").await.is_err());
}
