//! Operator-supplied YouTube cookies.
//!
//! Cookies are opaque credentials: they are loaded fresh for every batch of
//! outbound requests, joined into a single `Cookie` header and never mutated.
//! Writes replace the whole set atomically.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TranscriptError};

const DEFAULT_DOMAIN: &str = ".youtube.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub secure: bool,
    #[serde(default = "default_true")]
    pub http_only: bool,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: default_domain(),
            path: default_path(),
            secure: true,
            http_only: true,
        }
    }
}

/// Built-in cookie set that lets anonymous transcript requests through the
/// consent wall with Brazilian Portuguese preferences.
pub fn default_cookies() -> Vec<Cookie> {
    vec![
        Cookie::new("VISITOR_INFO1_LIVE", "fOKvisitODg"),
        Cookie {
            http_only: false,
            ..Cookie::new("YSC", "dQw4w9WgXcQ")
        },
        Cookie {
            http_only: false,
            ..Cookie::new("CONSENT", "YES+cb.20210328-17-p0.en+FX+569")
        },
        Cookie {
            http_only: false,
            ..Cookie::new("PREF", "f6=40000000&hl=pt&gl=BR")
        },
    ]
}

/// Joins cookies into a `Cookie` header value.
pub fn cookie_header_string(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn validate_cookies(cookies: &[Cookie]) -> bool {
    cookies.iter().all(|c| !c.name.trim().is_empty())
}

/// Accepts the shapes operators paste in: a list of cookie objects, a list of
/// `name=value` strings, a `{name: value}` map or a raw header string.
/// Later duplicates of a name replace earlier ones.
pub fn normalize_cookies(input: &Value) -> Vec<Cookie> {
    let parsed: Vec<Cookie> = match input {
        Value::Array(items) => items.iter().filter_map(cookie_from_value).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Cookie::new(name.trim(), value)
            })
            .collect(),
        Value::String(raw) => raw.split(';').filter_map(cookie_from_pair).collect(),
        _ => Vec::new(),
    };

    let mut unique: Vec<Cookie> = Vec::with_capacity(parsed.len());
    for cookie in parsed {
        if let Some(existing) = unique.iter_mut().find(|c| c.name == cookie.name) {
            *existing = cookie;
        } else {
            unique.push(cookie);
        }
    }
    unique
}

fn cookie_from_value(value: &Value) -> Option<Cookie> {
    match value {
        Value::String(pair) => cookie_from_pair(pair),
        Value::Object(obj) => {
            let name = obj.get("name")?.as_str()?.trim();
            let value = obj.get("value")?.as_str()?;
            if name.is_empty() || value.is_empty() {
                return None;
            }
            let text = |key: &str, fallback: String| {
                obj.get(key)
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or(fallback)
            };
            let flag = |key: &str| obj.get(key).and_then(|v| v.as_bool()) != Some(false);
            Some(Cookie {
                name: name.to_string(),
                value: value.to_string(),
                domain: text("domain", default_domain()),
                path: text("path", default_path()),
                secure: flag("secure"),
                http_only: flag("httpOnly"),
            })
        }
        _ => None,
    }
}

fn cookie_from_pair(pair: &str) -> Option<Cookie> {
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Cookie::new(name, value.trim()))
}

#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Current cookie set. Never fails: falls back to [`default_cookies`].
    async fn load_cookies(&self) -> Vec<Cookie>;

    async fn save_cookies(&self, cookies: &[Cookie]) -> Result<()>;

    async fn restore_defaults(&self) -> Result<()> {
        self.save_cookies(&default_cookies()).await
    }

    async fn delete_cookies(&self) -> Result<()>;

    async fn cookie_header(&self) -> String {
        cookie_header_string(&self.load_cookies().await)
    }
}

/// JSON file store, seeded with the defaults on first use.
#[derive(Debug, Clone)]
pub struct FileCookieStore {
    path: PathBuf,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn seed_defaults(&self) -> Vec<Cookie> {
        let defaults = default_cookies();
        match self.save_cookies(&defaults).await {
            Ok(()) => tracing::info!(
                path = %self.path.display(),
                count = defaults.len(),
                "seeded default cookies"
            ),
            Err(e) => tracing::warn!("could not persist default cookies: {}", e),
        }
        defaults
    }
}

#[async_trait]
impl CookieStore for FileCookieStore {
    async fn load_cookies(&self) -> Vec<Cookie> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no cookie file found, using defaults");
                return self.seed_defaults().await;
            }
            Err(e) => {
                tracing::warn!("failed to read cookie file: {}", e);
                return self.seed_defaults().await;
            }
        };

        match serde_json::from_str::<Vec<Cookie>>(&raw) {
            Ok(cookies) if !cookies.is_empty() && validate_cookies(&cookies) => {
                tracing::debug!(count = cookies.len(), "loaded cookies");
                cookies
            }
            Ok(_) => {
                tracing::warn!("cookie file is empty or invalid, restoring defaults");
                self.seed_defaults().await
            }
            Err(e) => {
                tracing::warn!("cookie file is not valid JSON ({}), restoring defaults", e);
                self.seed_defaults().await
            }
        }
    }

    async fn save_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        if !validate_cookies(cookies) {
            return Err(TranscriptError::CookieStore(
                "every cookie needs a non-empty name".to_string(),
            ));
        }
        let body = serde_json::to_string_pretty(cookies)?;
        let path = self.path.clone();

        // Write to a sibling temp file and rename over the target.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(body.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| TranscriptError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| TranscriptError::CookieStore(format!("writer task failed: {}", e)))??;

        tracing::info!(count = cookies.len(), "cookies saved");
        Ok(())
    }

    async fn delete_cookies(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store; starts with the defaults.
#[derive(Debug)]
pub struct MemoryCookieStore {
    cookies: Mutex<Vec<Cookie>>,
}

impl Default for MemoryCookieStore {
    fn default() -> Self {
        Self::with_cookies(default_cookies())
    }
}

impl MemoryCookieStore {
    pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies: Mutex::new(cookies),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Cookie>> {
        self.cookies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn load_cookies(&self) -> Vec<Cookie> {
        let cookies = self.lock().clone();
        if cookies.is_empty() {
            default_cookies()
        } else {
            cookies
        }
    }

    async fn save_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        if !validate_cookies(cookies) {
            return Err(TranscriptError::CookieStore(
                "every cookie needs a non-empty name".to_string(),
            ));
        }
        *self.lock() = cookies.to_vec();
        Ok(())
    }

    async fn delete_cookies(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}
