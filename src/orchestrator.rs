use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ScraperConfig;
use crate::error::{Result, TranscriptError};
use crate::extract;
use crate::format::TranscriptResult;
use crate::http::HttpTransport;
use crate::identity::RequestIdentity;
use crate::innertube::InnerTubeClient;
use crate::page::PageFetcher;
use crate::parser::CaptionFetcher;
use crate::playability::assert_playable;
use crate::rate_limit::RateLimiter;
use crate::tracks::TranscriptIndex;

/// Transcript extraction with retries, identity rotation and bot backoff.
pub struct YouTubeTranscript {
    config: ScraperConfig,
    pages: PageFetcher,
    innertube: InnerTubeClient,
    captions: CaptionFetcher,
}

impl YouTubeTranscript {
    pub fn with_transport(
        config: ScraperConfig,
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            pages: PageFetcher::new(transport.clone(), limiter.clone()),
            innertube: InnerTubeClient::new(transport.clone(), limiter.clone()),
            captions: CaptionFetcher::new(transport, limiter),
            config,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Watch page, API key, player call, playability check, caption index.
    pub async fn list_transcripts(
        &self,
        video_id: &str,
        identity: &RequestIdentity,
    ) -> Result<TranscriptIndex> {
        let watch_url = self.config.watch_url(video_id);
        let html = self.pages.fetch_html(&watch_url, video_id, identity).await?;
        let api_key = extract::extract_api_key(&html, video_id)?;

        let player_url = self.config.player_url(&api_key);
        let player = self
            .innertube
            .fetch_player_data(&player_url, video_id, identity)
            .await?;
        assert_playable(video_id, &player.playability)?;

        let tracks = player
            .caption_tracks
            .ok_or_else(|| TranscriptError::TranscriptsDisabled(video_id.to_string()))?;
        let index = TranscriptIndex::build(video_id, tracks);
        if index.is_empty() {
            return Err(TranscriptError::TranscriptsDisabled(video_id.to_string()));
        }
        Ok(index)
    }

    async fn attempt(
        &self,
        video_id: &str,
        languages: &[String],
        include_timestamps: bool,
        identity: &RequestIdentity,
    ) -> Result<TranscriptResult> {
        let index = self.list_transcripts(video_id, identity).await?;
        let available = index.available_languages();
        tracing::info!(video_id, languages = ?available, "available transcript languages");

        let track = index.select(languages)?;
        let segments = self.captions.fetch_and_parse(&track.url, identity).await?;

        Ok(TranscriptResult::success(
            video_id,
            self.config.watch_url(video_id),
            &track.language_code,
            available,
            &segments,
            include_timestamps,
        ))
    }

    /// [`Self::run_with_cancel`] with the configured attempt budget and no
    /// cancellation.
    pub async fn run(
        &self,
        video_id: &str,
        languages: &[String],
        include_timestamps: bool,
    ) -> TranscriptResult {
        self.run_with_cancel(
            video_id,
            languages,
            include_timestamps,
            self.config.max_attempts,
            &CancellationToken::new(),
        )
        .await
    }

    /// Runs the whole pipeline up to `max_attempts` times. Never fails: the
    /// last error is reported inside the result.
    ///
    /// Each attempt uses a fresh identity with the client context rotated by
    /// attempt number. Bot signals sleep `attempt * bot_backoff_step` before
    /// the next attempt; terminal failures stop early when
    /// `short_circuit_terminal` is set. Cancelling `cancel` abandons the
    /// current attempt or backoff.
    pub async fn run_with_cancel(
        &self,
        video_id: &str,
        languages: &[String],
        include_timestamps: bool,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> TranscriptResult {
        let languages: &[String] = if languages.is_empty() {
            &self.config.preferred_languages
        } else {
            languages
        };
        let max_attempts = max_attempts.max(1);
        let mut last_error: Option<TranscriptError> = None;

        for attempt in 1..=max_attempts {
            let identity = RequestIdentity::for_attempt(attempt);
            tracing::info!(
                video_id,
                attempt,
                max_attempts,
                client = identity.client_context.client_name(),
                "extracting transcript"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TranscriptError::Cancelled),
                result = self.attempt(video_id, languages, include_timestamps, &identity) => result,
            };

            let error = match outcome {
                Ok(result) => {
                    tracing::info!(
                        video_id,
                        attempt,
                        segments = result.segments_count.unwrap_or(0),
                        "transcript extracted"
                    );
                    return result;
                }
                Err(e) => e,
            };

            tracing::warn!(video_id, attempt, max_attempts, error = %error, "attempt failed");
            let stop = matches!(error, TranscriptError::Cancelled)
                || (self.config.short_circuit_terminal && error.is_terminal());
            let backoff = error.is_bot_signal();
            last_error = Some(error);

            if stop || attempt == max_attempts {
                break;
            }
            if backoff {
                let wait = self.config.bot_backoff_step * attempt;
                tracing::info!(wait_ms = wait.as_millis() as u64, "backing off after bot signal");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        last_error = Some(TranscriptError::Cancelled);
                        break;
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error while fetching transcript".to_string());
        tracing::error!(video_id, error = %message, "all transcript attempts failed");
        TranscriptResult::failure(
            video_id,
            self.config.watch_url(video_id),
            message,
            include_timestamps,
        )
    }
}
