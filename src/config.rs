use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
pub const DEFAULT_COOKIE_FILE: &str = "data/cookies/youtube_cookies.json";
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BOT_BACKOFF_STEP_MS: u64 = 2000;

pub fn default_languages() -> Vec<String> {
    vec!["pt".to_string(), "pt-BR".to_string(), "en".to_string()]
}

/// Runtime knobs for the scraping pipeline.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Scheme and host of the target site; overridden in tests.
    pub base_url: String,
    pub cookie_file: PathBuf,
    /// Minimum spacing between two outbound requests, process wide.
    pub min_request_interval: Duration,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    /// Bot-signal failures sleep `attempt * bot_backoff_step`.
    pub bot_backoff_step: Duration,
    pub preferred_languages: Vec<String>,
    /// Stop retrying as soon as a failure is known to be permanent.
    pub short_circuit_terminal: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_file: PathBuf::from(DEFAULT_COOKIE_FILE),
            min_request_interval: Duration::from_millis(DEFAULT_MIN_REQUEST_INTERVAL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            bot_backoff_step: Duration::from_millis(DEFAULT_BOT_BACKOFF_STEP_MS),
            preferred_languages: default_languages(),
            short_circuit_terminal: true,
        }
    }
}

impl ScraperConfig {
    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}/watch?v={}", self.base_url.trim_end_matches('/'), video_id)
    }

    pub fn player_url(&self, api_key: &str) -> String {
        format!(
            "{}/youtubei/v1/player?key={}&prettyPrint=false",
            self.base_url.trim_end_matches('/'),
            api_key
        )
    }

    pub fn channel_videos_url(&self, handle: &str) -> String {
        format!(
            "{}/{}/videos",
            self.base_url.trim_end_matches('/'),
            handle.trim_start_matches('/')
        )
    }

    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        format!(
            "{}/results?search_query={}",
            self.base_url.trim_end_matches('/'),
            encoded
        )
    }

    /// Upper bound on how long one orchestrated transcript request can take.
    ///
    /// Each attempt performs three rate-limited HTTP calls; every attempt but
    /// the last may add a bot backoff sleep.
    pub fn worst_case_duration(&self) -> Duration {
        let per_call = self.request_timeout + self.min_request_interval;
        let mut total = per_call * 3 * self.max_attempts;
        for attempt in 1..self.max_attempts {
            total += self.bot_backoff_step * attempt;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ScraperConfig::default();
        assert_eq!(config.min_request_interval, Duration::from_millis(1000));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.preferred_languages, vec!["pt", "pt-BR", "en"]);
        assert!(config.short_circuit_terminal);
    }

    #[test]
    fn urls_are_built_from_base() {
        let config = ScraperConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            ..ScraperConfig::default()
        };
        assert_eq!(
            config.watch_url("dQw4w9WgXcQ"),
            "http://127.0.0.1:9000/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            config.player_url("KEY"),
            "http://127.0.0.1:9000/youtubei/v1/player?key=KEY&prettyPrint=false"
        );
        assert_eq!(
            config.channel_videos_url("@someone"),
            "http://127.0.0.1:9000/@someone/videos"
        );
        assert_eq!(
            config.search_url("rust & tokio"),
            "http://127.0.0.1:9000/results?search_query=rust+%26+tokio"
        );
    }

    #[test]
    fn worst_case_includes_backoff() {
        let config = ScraperConfig {
            min_request_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            bot_backoff_step: Duration::from_secs(2),
            ..ScraperConfig::default()
        };
        // 3 attempts * 3 calls * 31s + (2s + 4s)
        assert_eq!(config.worst_case_duration(), Duration::from_secs(285));
    }
}
