use serde::{Deserialize, Serialize};

use crate::parser::TranscriptSegment;

/// `HH:MM:SS`, truncating fractional seconds.
pub fn seconds_to_time_format(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

pub fn format_duration(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLine {
    pub start: String,
    pub dur: String,
    pub text: String,
}

impl From<&TranscriptSegment> for TimedLine {
    fn from(segment: &TranscriptSegment) -> Self {
        Self {
            start: seconds_to_time_format(segment.start_seconds),
            dur: format_duration(segment.duration_seconds),
            text: segment.text.clone(),
        }
    }
}

/// Either the joined text or the timed lines, as the caller asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptPayload {
    Text(String),
    Timed(Vec<TimedLine>),
}

impl TranscriptPayload {
    pub fn from_segments(segments: &[TranscriptSegment], include_timestamps: bool) -> Self {
        if include_timestamps {
            TranscriptPayload::Timed(segments.iter().map(TimedLine::from).collect())
        } else {
            TranscriptPayload::Text(
                segments
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }

    pub fn empty(include_timestamps: bool) -> Self {
        if include_timestamps {
            TranscriptPayload::Timed(Vec::new())
        } else {
            TranscriptPayload::Text(String::new())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TranscriptPayload::Text(text) => text.is_empty(),
            TranscriptPayload::Timed(lines) => lines.is_empty(),
        }
    }
}

/// What a transcript request resolves to. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub success: bool,
    pub error: String,
    pub video_id: String,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_used: Option<String>,
    pub available_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments_count: Option<usize>,
    pub include_timestamps: bool,
    pub transcript: TranscriptPayload,
}

impl TranscriptResult {
    pub fn success(
        video_id: &str,
        video_url: String,
        language_used: &str,
        available_languages: Vec<String>,
        segments: &[TranscriptSegment],
        include_timestamps: bool,
    ) -> Self {
        Self {
            success: true,
            error: String::new(),
            video_id: video_id.to_string(),
            video_url,
            language_used: Some(language_used.to_string()),
            available_languages,
            segments_count: Some(segments.len()),
            include_timestamps,
            transcript: TranscriptPayload::from_segments(segments, include_timestamps),
        }
    }

    pub fn failure(
        video_id: &str,
        video_url: String,
        error: impl Into<String>,
        include_timestamps: bool,
    ) -> Self {
        Self {
            success: false,
            error: error.into(),
            video_id: video_id.to_string(),
            video_url,
            language_used: None,
            available_languages: Vec::new(),
            segments_count: None,
            include_timestamps,
            transcript: TranscriptPayload::empty(include_timestamps),
        }
    }
}
