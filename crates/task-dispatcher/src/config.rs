//! Configuration management for the task dispatcher
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::dispatcher::RetryPolicy;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the evaluation API
    pub evaluation_api_url: String,

    /// Bearer token sent when recording tasks
    pub evaluation_api_token: Option<String>,

    /// Attempts per submission
    pub max_retries: u32,

    /// Seconds to wait after each failed attempt
    pub retry_delays_secs: Vec<u64>,

    /// Pause between submissions in milliseconds
    pub rate_limit_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// JSON file with task templates; builtin templates when unset
    pub templates_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            evaluation_api_url: env::var("EVALUATION_API_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),

            evaluation_api_token: env::var("EVALUATION_API_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),

            max_retries: env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid MAX_RETRIES")?,

            retry_delays_secs: parse_delays(
                &env::var("RETRY_DELAYS_SECS").unwrap_or_else(|_| "1,2,4".to_string()),
            )?,

            rate_limit_ms: env::var("RATE_LIMIT_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_MS")?,

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECS")?,

            templates_path: env::var("TEMPLATES_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            anyhow::bail!("MAX_RETRIES must be greater than 0");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if !self.evaluation_api_url.starts_with("http://")
            && !self.evaluation_api_url.starts_with("https://")
        {
            anyhow::bail!("EVALUATION_API_URL must be an http(s) URL");
        }

        Ok(())
    }

    /// URL students post their deployment notifications to
    pub fn notify_url(&self) -> String {
        format!("{}/notify", self.evaluation_api_url.trim_end_matches('/'))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delays: self
                .retry_delays_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        }
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_delays(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .with_context(|| format!("Invalid RETRY_DELAYS_SECS entry: {s}"))
        })
        .collect()
}
