pub mod config;
pub mod cookies;
mod error;
pub mod extract;
pub mod format;
pub mod http;
pub mod identity;
pub mod innertube;
mod orchestrator;
pub mod page;
pub mod parser;
pub mod playability;
pub mod rate_limit;
pub mod search;
pub mod server;
pub mod tracks;
pub mod video;

use std::sync::LazyLock;

use regex::Regex;

pub use config::ScraperConfig;
pub use cookies::{Cookie, CookieStore, FileCookieStore, MemoryCookieStore};
pub use error::{Result, TranscriptError};
pub use format::{TranscriptPayload, TranscriptResult};
pub use orchestrator::YouTubeTranscript;
pub use parser::{TranscriptParser, TranscriptSegment};
pub use search::{SearchOrder, SearchQuery, SearchResult};
pub use tracks::{CaptionTrack, TranscriptIndex};
pub use video::{ChannelVideo, VideoDetails, VideoScraper};

/// Path prefixes whose next segment is the video id.
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

static YOUTUBE_URL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.|m\.)?(youtube\.com/watch\?v=|youtu\.be/)").ok()
});

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Whether the input looks like a YouTube watch or short-link URL.
pub fn is_youtube_url(input: &str) -> bool {
    YOUTUBE_URL
        .as_ref()
        .map(|re| re.is_match(input.trim()))
        .unwrap_or(false)
}

/// Extract video ID from a raw id or any common YouTube URL shape
pub fn extract_video_id(url_or_id: &str) -> Result<String> {
    let input = url_or_id.trim();

    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let invalid = || {
        TranscriptError::InvalidVideoId(format!(
            "{} (YouTube video IDs must be 11 characters, or a valid YouTube URL)",
            url_or_id
        ))
    };

    // Try parsing as URL (with or without protocol)
    let url_str = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else if input.contains("youtube.com") || input.contains("youtu.be") {
        format!("https://{}", input)
    } else {
        return Err(invalid());
    };

    let url = url::Url::parse(&url_str).map_err(|_| invalid())?;
    let host = url.host_str().unwrap_or_default();
    if !(host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be") {
        return Err(invalid());
    }

    // Standard watch URL: ?v=VIDEO_ID
    if let Some(video_id) = url
        .query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.to_string())
        .filter(|v| is_video_id(v))
    {
        return Ok(video_id);
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    // Short URL: youtu.be/VIDEO_ID
    if host == "youtu.be" {
        if let Some(video_id) = segments.first().filter(|id| is_video_id(id)) {
            return Ok(video_id.to_string());
        }
        return Err(invalid());
    }

    // youtube.com/{embed,shorts,live,v}/VIDEO_ID
    if let [prefix, video_id, ..] = segments.as_slice() {
        if ID_PATH_PREFIXES.contains(prefix) && is_video_id(video_id) {
            return Ok(video_id.to_string());
        }
    }

    Err(invalid())
}
