//! Everything that knows what a YouTube page looks like.
//!
//! The patterns below track an undocumented page layout and are expected to
//! drift; the rest of the crate only talks to the functions in this module.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, TranscriptError};

pub const INITIAL_DATA: &str = "ytInitialData";
pub const INITIAL_PLAYER_RESPONSE: &str = "ytInitialPlayerResponse";

/// Tokens a real watch page contains. Consent walls and error pages lack them.
const PAGE_MARKERS: &[&str] = &[INITIAL_PLAYER_RESPONSE, "INNERTUBE_API_KEY", "innertubeApiKey"];

const CAPTCHA_MARKERS: &[&str] = &["class=\"g-recaptcha\"", "recaptcha"];
const BOT_WALL_MARKER: &str = "Sign in to confirm you\u{2019}re not a bot";
const BOT_WALL_MARKER_ASCII: &str = "Sign in to confirm you're not a bot";

static API_KEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#,
        r#""innertubeApiKey":\s*"([a-zA-Z0-9_-]+)""#,
        r#"apikey:\s*"([a-zA-Z0-9_-]+)""#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

pub fn has_page_markers(html: &str) -> bool {
    PAGE_MARKERS.iter().any(|m| html.contains(m))
}

pub fn has_captcha(html: &str) -> bool {
    CAPTCHA_MARKERS.iter().any(|m| html.contains(m))
}

/// Pulls the InnerTube API key out of a watch page.
///
/// When no key is present the page is checked for a CAPTCHA or the "not a
/// bot" wall, which are reported as blocking signals instead of a parse miss.
pub fn extract_api_key(html: &str, video_id: &str) -> Result<String> {
    for re in API_KEY_PATTERNS.iter() {
        if let Some(key) = re.captures(html).and_then(|c| c.get(1)) {
            return Ok(key.as_str().to_string());
        }
    }

    if has_captcha(html) {
        return Err(TranscriptError::BotChallenge(video_id.to_string()));
    }
    if html.contains(BOT_WALL_MARKER) || html.contains(BOT_WALL_MARKER_ASCII) {
        return Err(TranscriptError::BotDetected(video_id.to_string()));
    }
    Err(TranscriptError::ApiKeyNotFound(video_id.to_string()))
}

/// Parses the object literal assigned to `name` in an inline script, as in
/// `var ytInitialData = {...};` or `window["ytInitialData"] = {...};`.
pub fn extract_json_variable(html: &str, name: &str) -> Result<Value> {
    let assignment = Regex::new(&format!(
        r#"(?:\b{0}|\["{0}"\])\s*=\s*\{{"#,
        regex::escape(name)
    ))
    .map_err(|e| TranscriptError::MalformedJson {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    let found = assignment
        .find(html)
        .ok_or_else(|| TranscriptError::VariableNotFound(name.to_string()))?;
    // The match ends right after the opening brace.
    let literal = &html[found.end() - 1..];

    // Stop at the end of the first complete value; the trailing `;` and the
    // rest of the script are ignored.
    let mut values = serde_json::Deserializer::from_str(literal).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(TranscriptError::MalformedJson {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Err(TranscriptError::VariableNotFound(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCH_PAGE: &str = r#"<html><script>var ytInitialPlayerResponse = {"videoDetails":{"videoId":"dQw4w9WgXcQ","title":"a };b"}};var meta = 1;</script>
<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyTestKey_-1","INNERTUBE_CONTEXT":{}});</script>
<script>window["ytInitialData"] = {"contents":{"x":[1,2,{"y":"}"}]}};</script></html>"#;

    #[test]
    fn extracts_api_key() {
        assert_eq!(
            extract_api_key(WATCH_PAGE, "dQw4w9WgXcQ").unwrap(),
            "AIzaSyTestKey_-1"
        );
        assert_eq!(
            extract_api_key(r#"{"innertubeApiKey":"abc"}"#, "x").unwrap(),
            "abc"
        );
    }

    #[test]
    fn captcha_page_is_a_bot_challenge() {
        let html = r#"<form><div class="g-recaptcha" data-sitekey="x"></div></form>"#;
        let err = extract_api_key(html, "vid").unwrap_err();
        assert!(matches!(err, TranscriptError::BotChallenge(ref v) if v == "vid"));
        assert!(err.is_bot_signal());
    }

    #[test]
    fn bot_wall_is_bot_detected() {
        let html = "<p>Sign in to confirm you're not a bot</p>";
        assert!(matches!(
            extract_api_key(html, "vid"),
            Err(TranscriptError::BotDetected(_))
        ));
    }

    #[test]
    fn plain_page_without_key_is_not_found() {
        let err = extract_api_key("<html></html>", "vid").unwrap_err();
        assert!(matches!(err, TranscriptError::ApiKeyNotFound(_)));
        assert!(!err.is_bot_signal());
    }

    #[test]
    fn extracts_variables_with_braces_inside_strings() {
        let player = extract_json_variable(WATCH_PAGE, INITIAL_PLAYER_RESPONSE).unwrap();
        assert_eq!(player["videoDetails"]["title"], "a };b");

        let data = extract_json_variable(WATCH_PAGE, INITIAL_DATA).unwrap();
        assert_eq!(data["contents"]["x"][2]["y"], "}");
    }

    #[test]
    fn missing_variable_is_reported() {
        assert!(matches!(
            extract_json_variable("<html></html>", INITIAL_DATA),
            Err(TranscriptError::VariableNotFound(_))
        ));
    }

    #[test]
    fn broken_literal_is_malformed() {
        let html = "<script>var ytInitialData = {\"a\": tru};</script>";
        assert!(matches!(
            extract_json_variable(html, INITIAL_DATA),
            Err(TranscriptError::MalformedJson { .. })
        ));
    }

    #[test]
    fn markers_detect_watch_pages() {
        assert!(has_page_markers(WATCH_PAGE));
        assert!(!has_page_markers("<form action=\"https://consent.youtube.com/s\">"));
    }
}
