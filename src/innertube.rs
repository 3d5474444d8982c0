use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::error::{Result, TranscriptError};
use crate::http::HttpTransport;
use crate::identity::{ClientContext, RequestIdentity};
use crate::playability::{PlayabilityStatus, RawPlayabilityStatus};
use crate::rate_limit::RateLimiter;
use crate::tracks::CaptionTrack;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayerResponse {
    #[serde(default)]
    playability_status: Option<RawPlayabilityStatus>,
    #[serde(default)]
    captions: Option<RawCaptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptions {
    #[serde(default)]
    player_captions_tracklist_renderer: Option<RawTracklist>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTracklist {
    #[serde(default)]
    caption_tracks: Option<Vec<RawCaptionTrack>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    name: Option<RawText>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawText {
    #[serde(default)]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<RawRun>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRun {
    #[serde(default)]
    text: String,
}

/// The parts of a `/player` response the transcript pipeline needs.
#[derive(Debug, Clone)]
pub struct PlayerData {
    pub playability: PlayabilityStatus,
    /// `None` when the video has no captions renderer at all.
    pub caption_tracks: Option<Vec<CaptionTrack>>,
}

impl PlayerData {
    pub fn from_json(video_id: &str, body: &str) -> Result<Self> {
        let raw: RawPlayerResponse =
            serde_json::from_str(body).map_err(|e| TranscriptError::MalformedJson {
                name: "player response".to_string(),
                reason: e.to_string(),
            })?;

        let playability = raw
            .playability_status
            .map(PlayabilityStatus::from)
            .unwrap_or_else(PlayabilityStatus::ok);

        let caption_tracks = raw
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .map(|tracks| {
                tracks
                    .into_iter()
                    .filter_map(|t| caption_track(video_id, t))
                    .collect()
            });

        Ok(Self {
            playability,
            caption_tracks,
        })
    }
}

fn caption_track(video_id: &str, raw: RawCaptionTrack) -> Option<CaptionTrack> {
    let language_code = raw.language_code?;
    // srv3 is the rich format; the plain timedtext XML is wanted here.
    let url = raw.base_url?.replace("&fmt=srv3", "");
    let language = raw
        .name
        .and_then(|n| n.simple_text.or_else(|| n.runs.into_iter().next().map(|r| r.text)))
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| language_code.clone());
    Some(CaptionTrack {
        video_id: video_id.to_string(),
        url,
        language,
        language_code,
        is_generated: raw.kind.as_deref() == Some("asr"),
    })
}

/// Calls the internal `/player` endpoint with a rotating client context.
pub struct InnerTubeClient {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
}

impl InnerTubeClient {
    pub fn new(transport: Arc<dyn HttpTransport>, limiter: Arc<RateLimiter>) -> Self {
        Self { transport, limiter }
    }

    pub fn request_body(video_id: &str, context: ClientContext) -> serde_json::Value {
        json!({
            "context": context.to_json(),
            "videoId": video_id,
        })
    }

    pub async fn fetch_player_data(
        &self,
        player_url: &str,
        video_id: &str,
        identity: &RequestIdentity,
    ) -> Result<PlayerData> {
        self.limiter.wait_turn().await;

        let context = identity.client_context;
        tracing::debug!(client = context.client_name(), "calling InnerTube player");
        let body = Self::request_body(video_id, context);
        let response = self.transport.post_json(player_url, identity, &body).await?;

        match response.status {
            403 => return Err(TranscriptError::Forbidden(video_id.to_string())),
            429 => {
                return Err(TranscriptError::RateLimited(format!(
                    "InnerTube player for {}",
                    video_id
                )))
            }
            status if !response.is_success() => {
                return Err(TranscriptError::HttpStatus {
                    status,
                    url: player_url.to_string(),
                })
            }
            _ => {}
        }

        PlayerData::from_json(video_id, &response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playability::PlayabilityState;

    #[test]
    fn parses_caption_tracks() {
        let body = r#"{
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://yt/api/timedtext?v=x&lang=en&fmt=srv3", "name": {"runs": [{"text": "English"}]}, "languageCode": "en"},
                {"baseUrl": "https://yt/api/timedtext?v=x&lang=pt&kind=asr", "name": {"simpleText": "Portuguese (auto-generated)"}, "languageCode": "pt", "kind": "asr"},
                {"name": {"simpleText": "broken"}, "languageCode": "de"}
            ]}}
        }"#;
        let data = PlayerData::from_json("x", body).unwrap();
        assert_eq!(data.playability.status, PlayabilityState::Ok);

        let tracks = data.caption_tracks.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].url, "https://yt/api/timedtext?v=x&lang=en");
        assert_eq!(tracks[0].language, "English");
        assert!(!tracks[0].is_generated);
        assert_eq!(tracks[1].language, "Portuguese (auto-generated)");
        assert!(tracks[1].is_generated);
    }

    #[test]
    fn missing_captions_and_status() {
        let data = PlayerData::from_json("x", "{}").unwrap();
        assert_eq!(data.playability, PlayabilityStatus::ok());
        assert!(data.caption_tracks.is_none());
    }

    #[test]
    fn reports_reason() {
        let body = r#"{"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm you're not a bot"}}"#;
        let data = PlayerData::from_json("x", body).unwrap();
        assert_eq!(data.playability.status, PlayabilityState::LoginRequired);
        assert_eq!(
            data.playability.reason.as_deref(),
            Some("Sign in to confirm you're not a bot")
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            PlayerData::from_json("x", "<html>"),
            Err(TranscriptError::MalformedJson { .. })
        ));
    }

    #[test]
    fn request_body_uses_context() {
        let body = InnerTubeClient::request_body("abc", ClientContext::Ios);
        assert_eq!(body["videoId"], "abc");
        assert_eq!(body["context"]["client"]["clientName"], "IOS");
    }
}
