use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ytscrape::config::{
    DEFAULT_BOT_BACKOFF_STEP_MS, DEFAULT_COOKIE_FILE, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MIN_REQUEST_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use ytscrape::cookies::{normalize_cookies, validate_cookies};
use ytscrape::search::DEFAULT_SEARCH_LIMIT;
use ytscrape::server::{self, AppState};
use ytscrape::{
    extract_video_id, CookieStore, FileCookieStore, ScraperConfig, SearchOrder, SearchQuery,
};

#[derive(Parser)]
#[command(name = "ytscrape")]
#[command(about = "Fetch YouTube transcripts and video metadata without an API key")]
struct Cli {
    #[command(flatten)]
    scraper: ScraperArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ScraperArgs {
    /// Cookie jar used for every outbound request
    #[arg(long, global = true, env = "YTSCRAPE_COOKIE_FILE", default_value = DEFAULT_COOKIE_FILE)]
    cookie_file: PathBuf,

    /// Minimum milliseconds between two requests to YouTube
    #[arg(long, global = true, env = "YTSCRAPE_MIN_INTERVAL_MS", default_value_t = DEFAULT_MIN_REQUEST_INTERVAL_MS)]
    min_interval_ms: u64,

    /// Per request timeout in seconds
    #[arg(long, global = true, env = "YTSCRAPE_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, global = true, env = "YTSCRAPE_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Backoff step in milliseconds after a bot detection (multiplied by attempt)
    #[arg(long, global = true, env = "YTSCRAPE_BOT_BACKOFF_MS", default_value_t = DEFAULT_BOT_BACKOFF_STEP_MS)]
    bot_backoff_ms: u64,

    /// Keep retrying failures that cannot change between attempts
    #[arg(long, global = true, env = "YTSCRAPE_RETRY_TERMINAL")]
    retry_terminal: bool,
}

impl ScraperArgs {
    fn config(&self) -> ScraperConfig {
        ScraperConfig {
            cookie_file: self.cookie_file.clone(),
            min_request_interval: Duration::from_millis(self.min_interval_ms),
            request_timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            bot_backoff_step: Duration::from_millis(self.bot_backoff_ms),
            short_circuit_terminal: !self.retry_terminal,
            ..ScraperConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the transcript of a video
    Transcript {
        /// Video URL or 11 character id
        video: String,

        /// Preferred language codes, in order (e.g. -l pt -l en)
        #[arg(short, long = "lang")]
        languages: Vec<String>,

        /// Emit timed lines instead of joined text
        #[arg(short = 't', long)]
        timestamps: bool,
    },
    /// Show details of a video
    Video {
        /// Video URL or 11 character id
        video: String,
    },
    /// List the videos of a channel, or only the newest one
    Channel {
        /// Channel handle (e.g. @channel)
        handle: String,

        #[arg(long)]
        latest: bool,
    },
    /// Search videos
    Search {
        query: String,

        /// Number of results, 1 to 50
        #[arg(short = 'n', long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// relevance, date or views
        #[arg(long, default_value_t = SearchOrder::Relevance)]
        order: SearchOrder,
    },
    /// Inspect or change the cookie jar
    #[command(subcommand)]
    Cookies(CookieCommand),
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Subcommand)]
enum CookieCommand {
    /// Print cookie names (values are never printed)
    Show,
    /// Import cookies from a JSON file (array, object or header string)
    Import { file: PathBuf },
    /// Replace the jar with the built-in defaults
    Restore,
    /// Delete the jar
    Delete,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ytscrape=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.scraper.config();
    let store = Arc::new(FileCookieStore::new(config.cookie_file.clone()));
    let cookies: Arc<dyn CookieStore> = store.clone();

    match cli.command {
        Command::Transcript {
            video,
            languages,
            timestamps,
        } => {
            let video_id = extract_video_id(&video)?;
            let state = AppState::new(config, cookies);
            let result = state.transcripts.run(&video_id, &languages, timestamps).await;
            print_json(&result)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Video { video } => {
            let state = AppState::new(config, cookies);
            let details = state.videos.video_info(&video).await?;
            print_json(&details)?;
        }
        Command::Channel { handle, latest } => {
            let state = AppState::new(config, cookies);
            if latest {
                print_json(&state.videos.latest_video(&handle).await?)?;
            } else {
                print_json(&state.videos.channel_videos(&handle).await?)?;
            }
        }
        Command::Search {
            query,
            limit,
            order,
        } => {
            let state = AppState::new(config, cookies);
            let query = SearchQuery {
                query,
                limit,
                order,
            };
            print_json(&state.videos.search(&query).await?)?;
        }
        Command::Cookies(command) => run_cookie_command(command, store.as_ref()).await?,
        Command::Serve { host, port } => {
            tracing::info!(
                cookie_file = %store.path().display(),
                worst_case_secs = config.worst_case_duration().as_secs(),
                "starting server"
            );
            let state = AppState::new(config, cookies);
            server::serve(SocketAddr::new(host, port), state).await?;
        }
    }

    Ok(())
}

async fn run_cookie_command(command: CookieCommand, store: &FileCookieStore) -> Result<()> {
    match command {
        CookieCommand::Show => {
            let cookies = store.load_cookies().await;
            let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
            print_json(&serde_json::json!({
                "file": store.path(),
                "count": cookies.len(),
                "names": names,
                "valid": validate_cookies(&cookies),
            }))?;
        }
        CookieCommand::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let value = serde_json::from_str(&raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.trim().to_string()));
            let cookies = normalize_cookies(&value);
            if cookies.is_empty() || !validate_cookies(&cookies) {
                bail!("no valid cookies found in {}", file.display());
            }
            store.save_cookies(&cookies).await?;
            println!("imported {} cookies into {}", cookies.len(), store.path().display());
        }
        CookieCommand::Restore => {
            store.restore_defaults().await?;
            println!("restored default cookies in {}", store.path().display());
        }
        CookieCommand::Delete => {
            store.delete_cookies().await?;
            println!("deleted {}", store.path().display());
        }
    }
    Ok(())
}
