use std::sync::Arc;

use crate::error::{Result, TranscriptError};
use crate::extract;
use crate::http::{HttpResponse, HttpTransport};
use crate::identity::RequestIdentity;
use crate::rate_limit::RateLimiter;

/// Rate-limited GETs of YouTube pages with status classification.
pub struct PageFetcher {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, limiter: Arc<RateLimiter>) -> Self {
        Self { transport, limiter }
    }

    /// Fetches a watch page and checks it really is one. Consent walls and
    /// error pages come back as [`TranscriptError::UnexpectedPage`] unless
    /// they are recognisably a CAPTCHA.
    pub async fn fetch_html(
        &self,
        watch_url: &str,
        video_id: &str,
        identity: &RequestIdentity,
    ) -> Result<String> {
        tracing::debug!(url = watch_url, "fetching watch page");
        let html = self.get_page(watch_url, identity).await?;

        if !extract::has_page_markers(&html) {
            if extract::has_captcha(&html) {
                return Err(TranscriptError::BotChallenge(video_id.to_string()));
            }
            return Err(TranscriptError::UnexpectedPage(video_id.to_string()));
        }
        Ok(html)
    }

    /// Any page, no marker validation.
    pub async fn get_page(&self, url: &str, identity: &RequestIdentity) -> Result<String> {
        self.limiter.wait_turn().await;
        let response = self.transport.get(url, identity).await?;
        check_status(&response, url)?;
        Ok(response.body)
    }
}

pub fn check_status(response: &HttpResponse, url: &str) -> Result<()> {
    match response.status {
        429 => Err(TranscriptError::RateLimited(url.to_string())),
        status if status >= 400 => Err(TranscriptError::HttpStatus {
            status,
            url: url.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;

    struct Fixed(HttpResponse);

    #[async_trait]
    impl HttpTransport for Fixed {
        async fn get(&self, _url: &str, _identity: &RequestIdentity) -> Result<HttpResponse> {
            Ok(self.0.clone())
        }

        async fn post_json(
            &self,
            _url: &str,
            _identity: &RequestIdentity,
            _body: &Value,
        ) -> Result<HttpResponse> {
            Ok(self.0.clone())
        }
    }

    fn fetcher(status: u16, body: &str) -> PageFetcher {
        PageFetcher::new(
            Arc::new(Fixed(HttpResponse::new(status, body))),
            Arc::new(RateLimiter::new(Duration::ZERO)),
        )
    }

    async fn fetch(status: u16, body: &str) -> Result<String> {
        fetcher(status, body)
            .fetch_html("https://yt/watch?v=x", "x", &RequestIdentity::for_attempt(1))
            .await
    }

    #[tokio::test]
    async fn accepts_watch_page() {
        let html = r#"<script>var ytInitialPlayerResponse = {};</script>"#;
        assert_eq!(fetch(200, html).await.unwrap(), html);
    }

    #[tokio::test]
    async fn classifies_statuses() {
        assert!(matches!(fetch(429, "").await, Err(TranscriptError::RateLimited(_))));
        assert!(matches!(
            fetch(503, "").await,
            Err(TranscriptError::HttpStatus { status: 503, .. })
        ));
        assert!(matches!(
            fetch(404, "").await,
            Err(TranscriptError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn consent_page_is_unexpected() {
        let html = r#"<form action="https://consent.youtube.com/s"></form>"#;
        assert!(matches!(
            fetch(200, html).await,
            Err(TranscriptError::UnexpectedPage(_))
        ));
    }

    #[tokio::test]
    async fn captcha_page_is_a_bot_challenge() {
        let html = r#"<div class="g-recaptcha"></div>"#;
        assert!(matches!(
            fetch(200, html).await,
            Err(TranscriptError::BotChallenge(_))
        ));
    }
}
