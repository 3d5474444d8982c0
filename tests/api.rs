mod common;

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use ytscrape::server::{self, AppState};
use ytscrape::{CookieStore, FileCookieStore, MemoryCookieStore};

async fn api(fixture: &common::Fixture, cookies: Arc<dyn CookieStore>) -> String {
    let state = AppState::new(fixture.config(), cookies);
    common::spawn_router(server::router(state)).await
}

async fn post(url: String, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn transcript_endpoint() {
    let fixture = common::start(0).await;
    let base = api(&fixture, Arc::new(MemoryCookieStore::default())).await;

    let (status, body) = post(
        format!("{}/api/transcript", base),
        json!({"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "languages": ["en"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["error"], "");
    assert_eq!(body["language_used"], "en");
    assert_eq!(body["transcript"], "Ol'a mundo");
    assert_eq!(body["video_url"], format!("{}/watch?v=dQw4w9WgXcQ", fixture.base_url()));
}

#[tokio::test]
async fn transcript_failures_are_still_ok_responses() {
    let fixture = common::start(10).await;
    let base = api(&fixture, Arc::new(MemoryCookieStore::default())).await;

    let (status, body) = post(
        format!("{}/api/transcript", base),
        json!({"url": "https://youtu.be/dQw4w9WgXcQ", "include_timestamps": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["transcript"], json!([]));
    assert_eq!(body["available_languages"], json!([]));
}

#[tokio::test]
async fn transcript_rejects_bad_input() {
    let fixture = common::start(0).await;
    let base = api(&fixture, Arc::new(MemoryCookieStore::default())).await;

    let (status, body) = post(format!("{}/api/transcript", base), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = post(
        format!("{}/api/transcript", base),
        json!({"url": "https://vimeo.com/12345"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        format!("{}/api/transcript", base),
        json!({"url": "https://www.youtube.com/watch?v=short"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.player_calls(), 0);
}

#[tokio::test]
async fn video_endpoints() {
    let fixture = common::start(0).await;
    let base = api(&fixture, Arc::new(MemoryCookieStore::default())).await;

    let (status, body) = post(
        format!("{}/api/yt_video_info", base),
        json!({"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Fixture video");

    let (status, body) = post(
        format!("{}/api/yt_last_video", base),
        json!({"channel": "@fixture"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["video_id"], "dQw4w9WgXcQ");

    let (status, _) = post(format!("{}/api/yt_last_video", base), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn video_scrape_failures_are_still_ok_responses() {
    let fixture = common::start(0).await;
    let base = api(&fixture, Arc::new(MemoryCookieStore::default())).await;

    let (status, body) = post(
        format!("{}/api/yt_video_info", base),
        json!({"url": "https://www.youtube.com/watch?v=AAAAAAAAAAA"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("404"), "{}", body);

    let (status, body) = post(
        format!("{}/api/yt_last_video", base),
        json!({"channelHandle": "@nobody"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    let (status, body) = post(
        format!("{}/api/yt_video_info", base),
        json!({"videoUrl": "not a video"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn search_endpoint() {
    let fixture = common::start(0).await;
    let base = api(&fixture, Arc::new(MemoryCookieStore::default())).await;

    let (status, body) = post(
        format!("{}/api/yt_search", base),
        json!({"query": "never gonna", "limit": 5, "order": "views"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["video_id"], "AAAAAAAAAAA");
    assert_eq!(body["data"][1]["title"], "Newer, niche");
    assert_eq!(body["data"][0]["url"], "https://www.youtube.com/watch?v=AAAAAAAAAAA");

    for bad in [
        json!({}),
        json!({"query": "x", "limit": 0}),
        json!({"query": "x", "limit": 51}),
        json!({"query": "x", "order": "popular"}),
    ] {
        let (status, body) = post(format!("{}/api/yt_search", base), bad.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bad);
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn cookie_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");
    let fixture = common::start(0).await;
    let base = api(&fixture, Arc::new(FileCookieStore::new(&path))).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("{}/api/cookies", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 4);
    assert!(body.get("values").is_none());

    let (status, body) = post(
        format!("{}/api/cookies", base),
        json!({"cookies": "SID=abc; HSID=def"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["names"], json!(["SID", "HSID"]));
    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk[0]["value"], "abc");

    let (status, _) = post(format!("{}/api/cookies", base), json!({"cookies": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(format!("{}/api/cookies/restore", base), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);

    let response = client
        .delete(format!("{}/api/cookies", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!path.exists());
}

#[tokio::test]
async fn health() {
    let fixture = common::start(0).await;
    let base = api(&fixture, Arc::new(MemoryCookieStore::default())).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}
