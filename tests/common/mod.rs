#![allow(dead_code)]

//! A tiny stand-in for the YouTube pages the scraper reads, served on an
//! ephemeral localhost port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use ytscrape::ScraperConfig;

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";

#[derive(Clone)]
pub struct Fixture {
    pub addr: SocketAddr,
    pub player_calls: Arc<AtomicU32>,
    /// Answer the first N player calls with a bot wall.
    pub bot_walls: Arc<AtomicU32>,
}

impl Fixture {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> ScraperConfig {
        ScraperConfig {
            base_url: self.base_url(),
            min_request_interval: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            bot_backoff_step: Duration::from_millis(10),
            ..ScraperConfig::default()
        }
    }

    pub fn player_calls(&self) -> u32 {
        self.player_calls.load(Ordering::SeqCst)
    }
}

fn html(body: String) -> Response {
    ([(axum::http::header::CONTENT_TYPE, "text/html")], body).into_response()
}

async fn watch(Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    if query.get("v").map(String::as_str) != Some(VIDEO_ID) {
        return (StatusCode::NOT_FOUND, "no such video").into_response();
    }
    let has_consent = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.contains("CONSENT="));
    if !has_consent {
        return html(r#"<form action="https://consent.youtube.com/s"></form>"#.to_string());
    }

    html(format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"videoDetails":{{"videoId":"{id}","title":"Fixture video","shortDescription":"about","author":"Fixture","channelId":"UCfixture","lengthSeconds":"95","viewCount":"1234","keywords":["a"]}}}};</script>
<script>ytcfg.set({{"INNERTUBE_API_KEY": "FIXTUREKEY"}});</script>
<script>var ytInitialData = {{"contents":{{"twoColumnWatchNextResultsRenderer":{{"results":{{"results":{{"contents":[{{"videoPrimaryInfoRenderer":{{"dateText":{{"simpleText":"Jan 1, 2024"}}}}}}]}}}}}}}}}};</script></html>"#,
        id = VIDEO_ID
    ))
}

async fn player(State(fixture): State<Fixture>, Json(body): Json<Value>) -> Response {
    fixture.player_calls.fetch_add(1, Ordering::SeqCst);
    if body["videoId"] != VIDEO_ID {
        return (StatusCode::BAD_REQUEST, "unknown video").into_response();
    }

    let walled = fixture
        .bot_walls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if walled {
        return Json(json!({
            "playabilityStatus": {
                "status": "LOGIN_REQUIRED",
                "reason": "Sign in to confirm you're not a bot"
            }
        }))
        .into_response();
    }

    let base = format!("http://{}", fixture.addr);
    Json(json!({
        "playabilityStatus": {"status": "OK"},
        "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
            {
                "baseUrl": format!("{}/api/timedtext?v={}&lang=en&fmt=srv3", base, VIDEO_ID),
                "name": {"simpleText": "English"},
                "languageCode": "en"
            },
            {
                "baseUrl": format!("{}/api/timedtext?v={}&lang=pt&kind=asr", base, VIDEO_ID),
                "name": {"simpleText": "Portuguese (auto-generated)"},
                "languageCode": "pt",
                "kind": "asr"
            }
        ]}}
    }))
    .into_response()
}

async fn timedtext() -> Response {
    (
        [(axum::http::header::CONTENT_TYPE, "text/xml")],
        r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.5">Ol&amp;#39;a</text><text start="3725.2" dur="2">mundo</text></transcript>"#,
    )
        .into_response()
}

async fn channel_videos(Path(handle): Path<String>) -> Response {
    if handle != "@fixture" {
        return (StatusCode::NOT_FOUND, "no such channel").into_response();
    }
    html(format!(
        r#"<script>var ytInitialData = {{"contents":{{"twoColumnBrowseResultsRenderer":{{"tabs":[{{"tabRenderer":{{"title":"Videos","content":{{"richGridRenderer":{{"contents":[{{"richItemRenderer":{{"content":{{"videoRenderer":{{"videoId":"{id}","title":{{"runs":[{{"text":"Fixture video"}}]}},"thumbnail":{{"thumbnails":[{{"url":"https://i.ytimg.com/fixture.jpg"}}]}},"publishedTimeText":{{"simpleText":"1 day ago"}},"viewCountText":{{"simpleText":"1,234 views"}},"lengthText":{{"simpleText":"1:35"}}}}}}}}}}]}}}}}}}}]}}}}}};</script>"#,
        id = VIDEO_ID
    ))
}

async fn results(Query(query): Query<HashMap<String, String>>) -> Response {
    if query.get("search_query").map(String::as_str) != Some("never gonna") {
        return html(r#"<script>var ytInitialData = {"contents":{}};</script>"#.to_string());
    }
    html(r#"<script>var ytInitialData = {"contents":{"twoColumnSearchResultsRenderer":{"primaryContents":{"sectionListRenderer":{"contents":[{"itemSectionRenderer":{"contents":[
{"videoRenderer":{"videoId":"AAAAAAAAAAA","title":{"runs":[{"text":"Older, popular"}]},"ownerText":{"runs":[{"text":"Rick","navigationEndpoint":{"browseEndpoint":{"canonicalBaseUrl":"/@rick"}}}]},"publishedTimeText":{"simpleText":"14 years ago"},"viewCountText":{"simpleText":"1,500,000,000 views"},"lengthText":{"simpleText":"3:33"}}},
{"videoRenderer":{"videoId":"BBBBBBBBBBB","title":{"runs":[{"text":"Newer, niche"}]},"ownerText":{"runs":[{"text":"Fan"}]},"publishedTimeText":{"simpleText":"2 days ago"},"viewCountText":{"simpleText":"12 views"}}}
]}}]}}}}};</script>"#.to_string())
}

/// Starts the fixture site on 127.0.0.1:0.
pub async fn start(bot_walls: u32) -> Fixture {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let fixture = Fixture {
        addr: listener.local_addr().unwrap(),
        player_calls: Arc::new(AtomicU32::new(0)),
        bot_walls: Arc::new(AtomicU32::new(bot_walls)),
    };

    let app = Router::new()
        .route("/watch", get(watch))
        .route("/youtubei/v1/player", post(player))
        .route("/api/timedtext", get(timedtext))
        .route("/results", get(results))
        .route("/{handle}/videos", get(channel_videos))
        .with_state(fixture.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    fixture
}

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
