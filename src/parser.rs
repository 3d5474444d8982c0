use std::sync::{Arc, LazyLock};

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TranscriptError};
use crate::http::HttpTransport;
use crate::identity::RequestIdentity;
use crate::page::check_status;
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub text: String,
}

static HTML_ENTITIES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"&#39;|&quot;|&amp;|&lt;|&gt;").ok());

/// Decodes the handful of entities YouTube leaves in caption text. Single
/// pass, so `&amp;quot;` becomes `&quot;` and not `"`.
pub fn decode_html_entities(text: &str) -> String {
    let Some(re) = HTML_ENTITIES.as_ref() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &regex::Captures| {
        match &caps[0] {
            "&#39;" => "'",
            "&quot;" => "\"",
            "&amp;" => "&",
            "&lt;" => "<",
            "&gt;" => ">",
            _ => "",
        }
        .to_string()
    })
    .into_owned()
}

/// Entity decoding, literal escape sequences to spaces, whitespace collapsed.
pub fn clean_text(raw: &str) -> String {
    let decoded = decode_html_entities(raw)
        .replace("\\n", " ")
        .replace("\\r", " ")
        .replace("\\t", " ")
        .replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace("\\\\", "\\");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parser for timedtext XML:
/// `<transcript><text start="S" dur="D">content</text>...</transcript>`.
#[derive(Debug, Clone, Default)]
pub struct TranscriptParser;

impl TranscriptParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, xml: &str) -> Result<Vec<TranscriptSegment>> {
        let mut reader = Reader::from_str(xml);
        let mut segments = Vec::new();
        let mut saw_root = false;
        let mut saw_text = false;
        // Timing of the open <text> node and its raw (still escaped) content.
        let mut open: Option<(Option<f64>, f64)> = None;
        let mut raw = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"transcript" => saw_root = true,
                    b"text" if saw_root => {
                        saw_text = true;
                        open = Some(timing(&e));
                        raw.clear();
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"transcript" => saw_root = true,
                    b"text" if saw_root => saw_text = true,
                    _ => {}
                },
                Ok(Event::Text(t)) if open.is_some() => {
                    raw.push_str(&String::from_utf8_lossy(&t));
                }
                Ok(Event::GeneralRef(r)) if open.is_some() => {
                    raw.push('&');
                    raw.push_str(&String::from_utf8_lossy(&r));
                    raw.push(';');
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"text" => {
                    if let Some((Some(start), duration)) = open.take() {
                        let unescaped = quick_xml::escape::unescape(&raw)
                            .map(|s| s.into_owned())
                            .unwrap_or_else(|_| raw.clone());
                        let text = clean_text(&unescaped);
                        if !text.is_empty() {
                            segments.push(TranscriptSegment {
                                start_seconds: start,
                                duration_seconds: duration,
                                text,
                            });
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(TranscriptError::InvalidTranscriptFormat(format!(
                        "XML error at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err(TranscriptError::InvalidTranscriptFormat(
                "missing <transcript> root".to_string(),
            ));
        }
        if !saw_text {
            return Err(TranscriptError::InvalidTranscriptFormat(
                "no <text> nodes".to_string(),
            ));
        }
        Ok(segments)
    }
}

/// `(start, dur)`; nodes without a usable start are dropped later.
fn timing(e: &quick_xml::events::BytesStart<'_>) -> (Option<f64>, f64) {
    let mut start = None;
    let mut duration = 0.0;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value);
        match attr.key.as_ref() {
            b"start" => {
                start = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite())
                    .map(|s| s.max(0.0))
            }
            b"dur" => {
                duration = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|d| d.is_finite())
                    .map(|d| d.max(0.0))
                    .unwrap_or(0.0)
            }
            _ => {}
        }
    }
    (start, duration)
}

/// Downloads a caption track and parses it.
pub struct CaptionFetcher {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    parser: TranscriptParser,
}

impl CaptionFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            limiter,
            parser: TranscriptParser::new(),
        }
    }

    pub async fn fetch_and_parse(
        &self,
        url: &str,
        identity: &RequestIdentity,
    ) -> Result<Vec<TranscriptSegment>> {
        self.limiter.wait_turn().await;
        tracing::debug!("downloading caption track");
        let response = self.transport.get(url, identity).await?;
        check_status(&response, url)?;
        self.parser.parse(&response.body)
    }
}
