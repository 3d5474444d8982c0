use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ScraperConfig;
use crate::error::{Result, TranscriptError};
use crate::extract::{self, INITIAL_DATA, INITIAL_PLAYER_RESPONSE};
use crate::http::HttpTransport;
use crate::identity::RequestIdentity;
use crate::page::PageFetcher;
use crate::rate_limit::RateLimiter;
use crate::search::{self, SearchQuery, SearchResult};

const CANONICAL_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub channel_id: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// One entry of a channel's "Videos" tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelVideo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub published_time: Option<String>,
    pub view_count: Option<String>,
    pub duration: Option<String>,
}

fn text_of(value: &Value) -> Option<String> {
    value
        .pointer("/runs/0/text")
        .or_else(|| value.get("simpleText"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

/// Details of a watch page. The player response is required; publish date
/// and likes from the initial data are best effort.
pub fn video_details(html: &str) -> Result<VideoDetails> {
    let player = extract::extract_json_variable(html, INITIAL_PLAYER_RESPONSE)?;
    let details = player
        .get("videoDetails")
        .ok_or_else(|| TranscriptError::VariableNotFound("videoDetails".to_string()))?;

    let mut video = VideoDetails {
        video_id: str_at(details, "/videoId").unwrap_or_default(),
        title: str_at(details, "/title").unwrap_or_default(),
        description: str_at(details, "/shortDescription").unwrap_or_default(),
        author: str_at(details, "/author").unwrap_or_default(),
        channel_id: str_at(details, "/channelId").unwrap_or_default(),
        duration_seconds: str_at(details, "/lengthSeconds")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        view_count: str_at(details, "/viewCount")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        tags: details
            .get("keywords")
            .and_then(Value::as_array)
            .map(|k| k.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        thumbnail: details
            .pointer("/thumbnail/thumbnails")
            .and_then(Value::as_array)
            .and_then(|t| t.last())
            .and_then(|t| str_at(t, "/url")),
        ..VideoDetails::default()
    };

    match extract::extract_json_variable(html, INITIAL_DATA) {
        Ok(data) => apply_primary_info(&mut video, &data),
        Err(e) => tracing::debug!(error = %e, "no initial data on watch page"),
    }
    Ok(video)
}

fn apply_primary_info(video: &mut VideoDetails, data: &Value) {
    let Some(contents) = data
        .pointer("/contents/twoColumnWatchNextResultsRenderer/results/results/contents")
        .and_then(Value::as_array)
    else {
        return;
    };

    for primary in contents.iter().filter_map(|c| c.get("videoPrimaryInfoRenderer")) {
        if let Some(date) = str_at(primary, "/dateText/simpleText") {
            video.published = Some(date);
        }
        let buttons = primary
            .pointer("/videoActions/menuRenderer/topLevelButtons")
            .and_then(Value::as_array);
        for button in buttons.into_iter().flatten() {
            let label = str_at(
                button,
                "/toggleButtonRenderer/defaultText/accessibility/accessibilityData/label",
            );
            if let Some(label) = label.filter(|l| l.to_lowercase().contains("like")) {
                video.likes = Some(parse_count(&label));
                break;
            }
        }
    }
}

/// Videos listed on a channel's "Videos" tab, newest first.
pub fn channel_videos(html: &str, channel: &str) -> Result<Vec<ChannelVideo>> {
    let data = extract::extract_json_variable(html, INITIAL_DATA)?;
    let not_found = || TranscriptError::ChannelVideosNotFound(channel.to_string());

    let tabs = data
        .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
        .and_then(Value::as_array)
        .ok_or_else(not_found)?;
    let content = tabs
        .iter()
        .filter_map(|t| t.get("tabRenderer"))
        .find(|t| matches!(t.get("title").and_then(Value::as_str), Some("Videos" | "Vídeos")))
        .and_then(|t| t.get("content"))
        .ok_or_else(not_found)?;

    let items = content
        .pointer("/richGridRenderer/contents")
        .or_else(|| {
            content.pointer(
                "/sectionListRenderer/contents/0/itemSectionRenderer/contents/0/gridRenderer/items",
            )
        })
        .and_then(Value::as_array)
        .ok_or_else(not_found)?;

    let videos = items
        .iter()
        .filter_map(|item| {
            item.pointer("/richItemRenderer/content/videoRenderer")
                .or_else(|| item.get("gridVideoRenderer"))
        })
        .filter_map(|renderer| {
            let video_id = str_at(renderer, "/videoId")?;
            let title = renderer.get("title").and_then(text_of)?;
            Some(ChannelVideo {
                url: format!("{}{}", CANONICAL_WATCH_URL, video_id),
                video_id,
                title,
                thumbnail: str_at(renderer, "/thumbnail/thumbnails/0/url"),
                published_time: str_at(renderer, "/publishedTimeText/simpleText"),
                view_count: str_at(renderer, "/viewCountText/simpleText"),
                duration: str_at(renderer, "/lengthText/simpleText"),
            })
        })
        .collect();
    Ok(videos)
}

static COUNT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*([kmb])?\b").ok());

/// "1,234 views" -> 1234, "1.2K" -> 1200, "3M" -> 3000000. Zero when no
/// number is present.
pub fn parse_count(text: &str) -> u64 {
    let compact = text.replace(',', "");
    let Some(caps) = COUNT.as_ref().and_then(|re| re.captures(&compact)) else {
        return 0;
    };
    let number: f64 = caps[1].parse().unwrap_or(0.0);
    let suffix = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
    let multiplier = match suffix.as_deref() {
        Some("k") => 1e3,
        Some("m") => 1e6,
        Some("b") => 1e9,
        _ => 1.0,
    };
    (number * multiplier).round() as u64
}

/// "3:45" -> 225, "1:23:45" -> 5025. Zero for anything unparsable.
pub fn parse_duration(text: &str) -> u64 {
    let mut total = 0u64;
    for (i, part) in text.trim().split(':').rev().enumerate() {
        let Ok(n) = part.trim().parse::<u64>() else {
            return 0;
        };
        let seconds = u32::try_from(i)
            .ok()
            .and_then(|i| 60u64.checked_pow(i))
            .and_then(|unit| n.checked_mul(unit));
        match seconds.and_then(|s| total.checked_add(s)) {
            Some(sum) => total = sum,
            None => return 0,
        }
    }
    total
}

/// Accepts "@handle", "handle", "channel/UC..." or a full channel URL.
fn channel_path(channel: &str) -> String {
    let trimmed = channel.trim().trim_end_matches('/');
    let path = match trimmed.find("youtube.com/") {
        Some(i) => &trimmed[i + "youtube.com/".len()..],
        None => trimmed,
    };
    let path = path.trim_end_matches("/videos");
    if path.starts_with('@') || path.starts_with("channel/") || path.starts_with("c/") {
        path.to_string()
    } else {
        format!("@{}", path)
    }
}

/// Video and channel metadata scraped from public pages.
pub struct VideoScraper {
    config: ScraperConfig,
    pages: PageFetcher,
}

impl VideoScraper {
    pub fn new(
        config: ScraperConfig,
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            config,
            pages: PageFetcher::new(transport, limiter),
        }
    }

    pub async fn video_info(&self, url_or_id: &str) -> Result<VideoDetails> {
        let video_id = crate::extract_video_id(url_or_id)?;
        let identity = RequestIdentity::for_attempt(1);
        let html = self
            .pages
            .fetch_html(&self.config.watch_url(&video_id), &video_id, &identity)
            .await?;

        let mut details = video_details(&html)?;
        details.url = Some(format!("{}{}", CANONICAL_WATCH_URL, video_id));
        Ok(details)
    }

    pub async fn channel_videos(&self, channel: &str) -> Result<Vec<ChannelVideo>> {
        let path = channel_path(channel);
        let identity = RequestIdentity::for_attempt(1);
        tracing::info!(channel = %path, "listing channel videos");
        let html = self
            .pages
            .get_page(&self.config.channel_videos_url(&path), &identity)
            .await?;
        channel_videos(&html, &path)
    }

    /// Searches videos, then applies the query's ordering and limit.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        query.validate()?;
        let identity = RequestIdentity::for_attempt(1);
        tracing::info!(
            query = %query.query,
            limit = query.limit,
            order = %query.order,
            "searching videos"
        );
        let html = self
            .pages
            .get_page(&self.config.search_url(query.query.trim()), &identity)
            .await?;
        let results = search::search_results(&html)?;
        Ok(search::arrange(results, query.order, query.limit))
    }

    /// Newest upload of a channel with full details. Fields missing from the
    /// watch page fall back to what the listing shows.
    pub async fn latest_video(&self, channel: &str) -> Result<VideoDetails> {
        let listing = self.channel_videos(channel).await?;
        let latest = listing
            .into_iter()
            .next()
            .ok_or_else(|| TranscriptError::ChannelVideosNotFound(channel_path(channel)))?;

        let mut details = self.video_info(&latest.video_id).await?;
        if details.view_count == 0 {
            details.view_count = latest.view_count.as_deref().map(parse_count).unwrap_or(0);
        }
        if details.published.is_none() {
            details.published = latest.published_time.clone();
        }
        if details.duration_seconds == 0 {
            details.duration_seconds = latest.duration.as_deref().map(parse_duration).unwrap_or(0);
        }
        if latest.thumbnail.is_some() {
            details.thumbnail = latest.thumbnail;
        }
        details.url = Some(latest.url);
        Ok(details)
    }
}
