use serde::Deserialize;

use crate::error::{Result, TranscriptError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayabilityState {
    Ok,
    LoginRequired,
    Error,
    Unplayable,
    Other(String),
}

impl From<&str> for PlayabilityState {
    fn from(status: &str) -> Self {
        match status {
            "OK" => PlayabilityState::Ok,
            "LOGIN_REQUIRED" => PlayabilityState::LoginRequired,
            "ERROR" => PlayabilityState::Error,
            "UNPLAYABLE" => PlayabilityState::Unplayable,
            other => PlayabilityState::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayabilityStatus {
    pub status: PlayabilityState,
    pub reason: Option<String>,
}

/// Wire shape of `playabilityStatus`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlayabilityStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<RawPlayabilityStatus> for PlayabilityStatus {
    fn from(raw: RawPlayabilityStatus) -> Self {
        Self {
            status: PlayabilityState::from(raw.status.as_deref().unwrap_or("UNKNOWN")),
            reason: raw.reason.filter(|r| !r.trim().is_empty()),
        }
    }
}

impl PlayabilityStatus {
    pub fn ok() -> Self {
        Self {
            status: PlayabilityState::Ok,
            reason: None,
        }
    }
}

/// Turns a non-OK playability status into the matching typed failure.
pub fn assert_playable(video_id: &str, status: &PlayabilityStatus) -> Result<()> {
    let reason = status.reason.as_deref().unwrap_or("");
    let lowered = reason.to_lowercase();
    let id = video_id.to_string();

    match &status.status {
        PlayabilityState::Ok => Ok(()),
        PlayabilityState::LoginRequired if lowered.contains("not a bot") => {
            Err(TranscriptError::BotDetected(id))
        }
        PlayabilityState::LoginRequired
            if lowered.contains("inappropriate") || lowered.contains("confirm your age") =>
        {
            Err(TranscriptError::AgeRestricted(id))
        }
        PlayabilityState::Unplayable => Err(TranscriptError::VideoUnplayable(
            id,
            reason_or_status(reason, "UNPLAYABLE"),
        )),
        PlayabilityState::Error if lowered.contains("unavailable") => {
            Err(TranscriptError::VideoUnavailable(id))
        }
        PlayabilityState::LoginRequired => Err(TranscriptError::GenericPlayability(
            id,
            reason_or_status(reason, "LOGIN_REQUIRED"),
        )),
        PlayabilityState::Error => Err(TranscriptError::GenericPlayability(
            id,
            reason_or_status(reason, "ERROR"),
        )),
        PlayabilityState::Other(code) => Err(TranscriptError::GenericPlayability(
            id,
            reason_or_status(reason, code),
        )),
    }
}

fn reason_or_status(reason: &str, status: &str) -> String {
    if reason.is_empty() {
        status.to_string()
    } else {
        reason.to_string()
    }
}
