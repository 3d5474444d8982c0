use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid video ID or URL: {0}")]
    InvalidVideoId(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by YouTube ({0})")]
    RateLimited(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unexpected page for video {0}: no player data markers found")]
    UnexpectedPage(String),

    #[error("Could not extract the InnerTube API key for video {0}")]
    ApiKeyNotFound(String),

    #[error("IP blocked by YouTube: CAPTCHA challenge served for video {0}")]
    BotChallenge(String),

    #[error("Could not find embedded variable {0} in page")]
    VariableNotFound(String),

    #[error("Malformed embedded JSON for {name}: {reason}")]
    MalformedJson { name: String, reason: String },

    #[error("Access denied by the InnerTube API for video {0}: possible IP block")]
    Forbidden(String),

    #[error("Request blocked: YouTube flagged video {0} request as a bot")]
    BotDetected(String),

    #[error("Video {0} is age restricted")]
    AgeRestricted(String),

    #[error("Video {0} is unavailable")]
    VideoUnavailable(String),

    #[error("Video {0} is unplayable: it may be private or removed ({1})")]
    VideoUnplayable(String, String),

    #[error("Video {0} is not playable: {1}")]
    GenericPlayability(String, String),

    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found for video {0} in languages: {langs}", langs = .1.join(", "))]
    NoTranscriptAvailable(String, Vec<String>),

    #[error("No videos found on channel {0}")]
    ChannelVideosNotFound(String),

    #[error("Invalid search: {0}")]
    InvalidSearch(String),

    #[error("Invalid transcript format: {0}")]
    InvalidTranscriptFormat(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Cookie store error: {0}")]
    CookieStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TranscriptError {
    /// Signals that YouTube is actively blocking this client. These get an
    /// escalated backoff and a fresh identity before the next attempt.
    pub fn is_bot_signal(&self) -> bool {
        matches!(
            self,
            TranscriptError::BotDetected(_)
                | TranscriptError::BotChallenge(_)
                | TranscriptError::Forbidden(_)
        )
    }

    /// Failures that another attempt cannot change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TranscriptError::InvalidVideoId(_)
                | TranscriptError::InvalidSearch(_)
                | TranscriptError::AgeRestricted(_)
                | TranscriptError::VideoUnavailable(_)
                | TranscriptError::VideoUnplayable(..)
                | TranscriptError::TranscriptsDisabled(_)
                | TranscriptError::NoTranscriptAvailable(..)
                | TranscriptError::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
