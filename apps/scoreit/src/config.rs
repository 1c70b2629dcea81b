use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MODEL: &str = "1";

/// Client configuration loaded from environment variables.
/// Every value has a default; only malformed values fail at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub default_model: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let backend_url = std::env::var("SCOREIT_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let data_dir = match std::env::var("SCOREIT_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_data_dir()?,
        };

        let http_timeout = match std::env::var("SCOREIT_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("SCOREIT_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Config {
            backend_url: normalize_base_url(&backend_url),
            data_dir,
            http_timeout: Duration::from_secs(http_timeout),
            default_model: std::env::var("SCOREIT_DEFAULT_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Where the durable ("remember me") session record lives.
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("scoreit"))
        .context("Could not determine a config directory; set SCOREIT_DATA_DIR")
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
