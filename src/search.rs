//! Video search over the public results page.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TranscriptError};
use crate::extract::{self, INITIAL_DATA};
use crate::video::{parse_count, parse_duration};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

const CANONICAL_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrder {
    /// Keep YouTube's own ranking.
    #[default]
    Relevance,
    /// Newest first, judged by the "N days ago" label.
    Date,
    /// Most viewed first.
    Views,
}

impl FromStr for SearchOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(SearchOrder::Relevance),
            "date" => Ok(SearchOrder::Date),
            "views" => Ok(SearchOrder::Views),
            other => Err(format!(
                "order must be one of relevance, date, views (got {other})"
            )),
        }
    }
}

impl fmt::Display for SearchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchOrder::Relevance => "relevance",
            SearchOrder::Date => "date",
            SearchOrder::Views => "views",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub limit: usize,
    pub order: SearchOrder,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            order: SearchOrder::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(TranscriptError::InvalidSearch(
                "a search term is required".to_string(),
            ));
        }
        if !(1..=MAX_SEARCH_LIMIT).contains(&self.limit) {
            return Err(TranscriptError::InvalidSearch(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub channel_name: String,
    pub channel_handle: Option<String>,
    pub published_time: Option<String>,
    pub views: u64,
    pub duration_seconds: u64,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn runs_text(value: &Value) -> Option<String> {
    if let Some(runs) = value.get("runs").and_then(Value::as_array) {
        let text: String = runs
            .iter()
            .filter_map(|r| r.get("text").and_then(Value::as_str))
            .collect();
        return Some(text);
    }
    str_at(value, "/simpleText")
}

/// "/@someone", "/channel/UC..", "/c/name" or "/user/name" -> "@..."
fn channel_handle(base_url: &str) -> Option<String> {
    let path = base_url.trim_start_matches('/');
    let name = ["@", "channel/", "c/", "user/"]
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))?;
    (!name.is_empty()).then(|| format!("@{}", name))
}

fn to_result(renderer: &Value) -> Option<SearchResult> {
    let video_id = str_at(renderer, "/videoId")?;
    let title = renderer.get("title").and_then(runs_text)?;
    let owner = renderer.pointer("/ownerText/runs/0");

    Some(SearchResult {
        url: format!("{}{}", CANONICAL_WATCH_URL, video_id),
        video_id,
        title,
        channel_name: owner.and_then(|o| str_at(o, "/text")).unwrap_or_default(),
        channel_handle: owner
            .and_then(|o| str_at(o, "/navigationEndpoint/browseEndpoint/canonicalBaseUrl"))
            .and_then(|u| channel_handle(&u)),
        published_time: str_at(renderer, "/publishedTimeText/simpleText"),
        views: str_at(renderer, "/viewCountText/simpleText")
            .map(|v| parse_count(&v))
            .unwrap_or(0),
        duration_seconds: str_at(renderer, "/lengthText/simpleText")
            .map(|d| parse_duration(&d))
            .unwrap_or(0),
        thumbnail: renderer
            .pointer("/thumbnail/thumbnails")
            .and_then(Value::as_array)
            .and_then(|t| t.last())
            .and_then(|t| str_at(t, "/url")),
        description: renderer
            .pointer("/detailedMetadataSnippets/0/snippetText")
            .and_then(runs_text)
            .filter(|d| !d.is_empty()),
    })
}

/// Video entries of a results page in YouTube's order. Shelves, channels,
/// playlists and ads are skipped. An empty list is not an error.
pub fn search_results(html: &str) -> Result<Vec<SearchResult>> {
    let data = extract::extract_json_variable(html, INITIAL_DATA)?;
    let sections = data
        .pointer("/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents")
        .and_then(Value::as_array);

    let results = sections
        .into_iter()
        .flatten()
        .filter_map(|s| s.pointer("/itemSectionRenderer/contents").and_then(Value::as_array))
        .flatten()
        .filter_map(|item| item.get("videoRenderer"))
        .filter_map(to_result)
        .collect();
    Ok(results)
}

static AGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(second|minute|hour|day|week|month|year)").ok()
});

/// Approximate age in seconds of a "3 weeks ago" label. Unknown labels count
/// as brand new.
pub fn age_seconds(label: &str) -> u64 {
    let Some(caps) = AGE.as_ref().and_then(|re| re.captures(label)) else {
        return 0;
    };
    let amount: u64 = caps[1].parse().unwrap_or(0);
    let unit = match caps[2].to_ascii_lowercase().as_str() {
        "second" => 1,
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 7 * 86_400,
        "month" => 30 * 86_400,
        _ => 365 * 86_400,
    };
    amount.saturating_mul(unit)
}

/// Applies the requested ordering, then the limit.
pub fn arrange(
    mut results: Vec<SearchResult>,
    order: SearchOrder,
    limit: usize,
) -> Vec<SearchResult> {
    match order {
        SearchOrder::Relevance => {}
        SearchOrder::Date => results.sort_by_key(|r| {
            r.published_time.as_deref().map(age_seconds).unwrap_or(0)
        }),
        SearchOrder::Views => results.sort_by(|a, b| b.views.cmp(&a.views)),
    }
    results.truncate(limit);
    results
}
