//! JSON HTTP front end over the transcript pipeline, the video scraper and
//! the cookie store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::ScraperConfig;
use crate::cookies::{normalize_cookies, validate_cookies, CookieStore};
use crate::error::TranscriptError;
use crate::format::TranscriptResult;
use crate::http::{HttpClientFactory, HttpTransport, ReqwestTransport};
use crate::orchestrator::YouTubeTranscript;
use crate::rate_limit::RateLimiter;
use crate::search::{SearchOrder, SearchQuery, DEFAULT_SEARCH_LIMIT};
use crate::video::VideoScraper;
use crate::{extract_video_id, is_youtube_url};

#[derive(Clone)]
pub struct AppState {
    pub transcripts: Arc<YouTubeTranscript>,
    pub videos: Arc<VideoScraper>,
    pub cookies: Arc<dyn CookieStore>,
}

impl AppState {
    /// Wires both scrapers onto one reqwest transport and one rate limiter.
    pub fn new(config: ScraperConfig, cookies: Arc<dyn CookieStore>) -> Self {
        let factory = HttpClientFactory::new(config.request_timeout, Some(cookies.clone()));
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(factory));
        Self::with_transport(config, transport, cookies)
    }

    /// Outbound requests carry no Cookie header; `cookies` only backs the
    /// cookie routes.
    pub fn without_cookie_header(config: ScraperConfig, cookies: Arc<dyn CookieStore>) -> Self {
        let factory = HttpClientFactory::new(config.request_timeout, None);
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(factory));
        Self::with_transport(config, transport, cookies)
    }

    pub fn with_transport(
        config: ScraperConfig,
        transport: Arc<dyn HttpTransport>,
        cookies: Arc<dyn CookieStore>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.min_request_interval));
        Self {
            videos: Arc::new(VideoScraper::new(
                config.clone(),
                transport.clone(),
                limiter.clone(),
            )),
            transcripts: Arc::new(YouTubeTranscript::with_transport(config, transport, limiter)),
            cookies,
        }
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<TranscriptError> for ApiError {
    fn from(err: TranscriptError) -> Self {
        match err {
            TranscriptError::InvalidVideoId(_) | TranscriptError::InvalidSearch(_) => {
                ApiError::bad_request(err.to_string())
            }
            _ => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Scrape failures answer 200 with `success: false`; only bad input is a 400.
fn scrape_outcome<T: Serialize>(result: crate::Result<T>) -> ApiResult<Json<Value>> {
    match result {
        Ok(data) => Ok(Json(json!({ "success": true, "data": data }))),
        Err(err @ (TranscriptError::InvalidVideoId(_) | TranscriptError::InvalidSearch(_))) => {
            Err(err.into())
        }
        Err(err) => {
            tracing::warn!(error = %err, "scrape failed");
            Ok(Json(json!({ "success": false, "error": err.to_string() })))
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/transcript", post(transcript))
        .route("/api/yt_video_info", post(video_info))
        .route("/api/yt_last_video", post(last_video))
        .route("/api/yt_search", post(search))
        .route("/api/cookies", get(show_cookies).post(import_cookies).delete(delete_cookies))
        .route("/api/cookies/restore", post(restore_cookies))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {}", err);
    }
    tracing::info!("shutting down");
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub include_timestamps: bool,
}

async fn transcript(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> ApiResult<Json<TranscriptResult>> {
    let video_id = match (request.url.as_deref(), request.video_id.as_deref()) {
        (Some(url), _) if !url.trim().is_empty() => {
            if !is_youtube_url(url) {
                return Err(ApiError::bad_request("Invalid YouTube URL"));
            }
            extract_video_id(url)?
        }
        (_, Some(id)) if !id.trim().is_empty() => extract_video_id(id)?,
        _ => return Err(ApiError::bad_request("A YouTube url is required")),
    };

    // Cancelled if the client goes away and this future is dropped.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let max_attempts = state.transcripts.config().max_attempts;

    let result = state
        .transcripts
        .run_with_cancel(
            &video_id,
            &request.languages,
            request.include_timestamps,
            max_attempts,
            &cancel,
        )
        .await;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct VideoInfoRequest {
    #[serde(default, alias = "videoUrl")]
    url: String,
}

async fn video_info(
    State(state): State<AppState>,
    Json(request): Json<VideoInfoRequest>,
) -> ApiResult<Json<Value>> {
    if request.url.trim().is_empty() {
        return Err(ApiError::bad_request("A video url is required"));
    }
    scrape_outcome(state.videos.video_info(&request.url).await)
}

#[derive(Debug, Deserialize)]
struct LastVideoRequest {
    #[serde(default, alias = "channelHandle")]
    channel: String,
}

async fn last_video(
    State(state): State<AppState>,
    Json(request): Json<LastVideoRequest>,
) -> ApiResult<Json<Value>> {
    if request.channel.trim().is_empty() {
        return Err(ApiError::bad_request(
            "A channel handle is required (e.g. @channel)",
        ));
    }
    scrape_outcome(state.videos.latest_video(&request.channel).await)
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    order: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<Value>> {
    let order = match request.order.as_deref() {
        Some(order) => order.parse::<SearchOrder>().map_err(ApiError::bad_request)?,
        None => SearchOrder::default(),
    };
    let query = SearchQuery {
        query: request.query,
        limit: request
            .limit
            .map_or(DEFAULT_SEARCH_LIMIT, |l| usize::try_from(l).unwrap_or(0)),
        order,
    };
    query.validate()?;
    scrape_outcome(state.videos.search(&query).await)
}

#[derive(Debug, Serialize)]
struct CookieSummary {
    success: bool,
    count: usize,
    names: Vec<String>,
    valid: bool,
}

async fn cookie_summary(store: &dyn CookieStore) -> CookieSummary {
    let cookies = store.load_cookies().await;
    CookieSummary {
        success: true,
        count: cookies.len(),
        valid: validate_cookies(&cookies),
        names: cookies.into_iter().map(|c| c.name).collect(),
    }
}

async fn show_cookies(State(state): State<AppState>) -> Json<CookieSummary> {
    Json(cookie_summary(state.cookies.as_ref()).await)
}

#[derive(Debug, Deserialize)]
struct ImportCookiesRequest {
    cookies: Value,
}

async fn import_cookies(
    State(state): State<AppState>,
    Json(request): Json<ImportCookiesRequest>,
) -> ApiResult<Json<CookieSummary>> {
    let cookies = normalize_cookies(&request.cookies);
    if cookies.is_empty() || !validate_cookies(&cookies) {
        return Err(ApiError::bad_request("No valid cookies in request"));
    }
    state.cookies.save_cookies(&cookies).await?;
    tracing::info!(count = cookies.len(), "cookies imported");
    Ok(Json(cookie_summary(state.cookies.as_ref()).await))
}

async fn restore_cookies(State(state): State<AppState>) -> ApiResult<Json<CookieSummary>> {
    state.cookies.restore_defaults().await?;
    tracing::info!("default cookies restored");
    Ok(Json(cookie_summary(state.cookies.as_ref()).await))
}

async fn delete_cookies(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.cookies.delete_cookies().await?;
    tracing::info!("cookies deleted");
    Ok(Json(json!({ "success": true })))
}
