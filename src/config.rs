use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::state::DEFAULT_LOGO;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_POLL_MS: u64 = 2000;
const MIN_POLL_MS: u64 = 250;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Follow a league simulation job until its standings are ready.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job to follow (overrides the id inside --context)
    pub job_id: Option<String>,
    /// JSON file with {"job_id", "status", "result"} as served with the page
    #[arg(long)]
    pub context: Option<PathBuf>,
    /// Backend base URL
    #[arg(long)]
    pub base_url: Option<String>,
    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,
    /// Print the finished table to stdout instead of opening the terminal UI
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub http_timeout_secs: u64,
    pub default_logo: String,
    pub log_file: Option<PathBuf>,
    pub export_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };
        let poll_ms = get("PLAYODDS_POLL_MS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_MS)
            .max(MIN_POLL_MS);
        let http_timeout_secs = get("PLAYODDS_HTTP_TIMEOUT_SECS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .max(1);

        Self {
            base_url: get("PLAYODDS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            poll_interval: Duration::from_millis(poll_ms),
            http_timeout_secs,
            default_logo: get("PLAYODDS_DEFAULT_LOGO").unwrap_or_else(|| DEFAULT_LOGO.to_string()),
            log_file: get("PLAYODDS_LOG_FILE").map(PathBuf::from),
            export_dir: get("PLAYODDS_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(base_url) = cli.base_url.as_deref().map(str::trim)
            && !base_url.is_empty()
        {
            self.base_url = base_url.to_string();
        }
        if let Some(poll_ms) = cli.poll_ms {
            self.poll_interval = Duration::from_millis(poll_ms.max(MIN_POLL_MS));
        }
    }
}
