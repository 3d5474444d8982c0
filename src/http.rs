use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::cookies::CookieStore;
use crate::error::{Result, TranscriptError};
use crate::identity::RequestIdentity;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP as the pipeline sees it. Connection level failures surface
/// as [`TranscriptError::Network`]; status codes are left to the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, identity: &RequestIdentity) -> Result<HttpResponse>;

    async fn post_json(
        &self,
        url: &str,
        identity: &RequestIdentity,
        body: &Value,
    ) -> Result<HttpResponse>;
}

/// Builds one browser-looking client per request attempt.
#[derive(Clone)]
pub struct HttpClientFactory {
    timeout: Duration,
    cookies: Option<Arc<dyn CookieStore>>,
}

impl HttpClientFactory {
    pub fn new(timeout: Duration, cookies: Option<Arc<dyn CookieStore>>) -> Self {
        Self { timeout, cookies }
    }

    pub async fn default_headers(&self, identity: &RequestIdentity) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        if let Ok(lang) = HeaderValue::from_str(&identity.accept_language) {
            headers.insert(header::ACCEPT_LANGUAGE, lang);
        }
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
        headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        if let Some(store) = &self.cookies {
            let cookie = store.cookie_header().await;
            if !cookie.is_empty() {
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        headers.insert(header::COOKIE, value);
                    }
                    Err(_) => tracing::warn!("cookie header contains invalid characters, skipping"),
                }
            }
        }
        headers
    }

    pub async fn create_client(&self, identity: &RequestIdentity) -> Result<reqwest::Client> {
        let headers = self.default_headers(identity).await;
        reqwest::Client::builder()
            .user_agent(identity.user_agent.as_str())
            .default_headers(headers)
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| TranscriptError::Network(format!("failed to build HTTP client: {}", e)))
    }
}

/// Production transport: a fresh reqwest client per call.
#[derive(Clone)]
pub struct ReqwestTransport {
    factory: HttpClientFactory,
}

impl ReqwestTransport {
    pub fn new(factory: HttpClientFactory) -> Self {
        Self { factory }
    }
}

async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| TranscriptError::Network(format!("failed to read body: {}", e)))?;
    Ok(HttpResponse { status, body })
}

fn network_error(url: &str, e: reqwest::Error) -> TranscriptError {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    TranscriptError::Network(format!("{} for {}: {}", kind, url, e))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, identity: &RequestIdentity) -> Result<HttpResponse> {
        let client = self.factory.create_client(identity).await?;
        tracing::debug!(url, "GET");
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;
        into_response(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        identity: &RequestIdentity,
        body: &Value,
    ) -> Result<HttpResponse> {
        let client = self.factory.create_client(identity).await?;
        tracing::debug!(url, "POST");
        let response = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;
        into_response(response).await
    }
}
