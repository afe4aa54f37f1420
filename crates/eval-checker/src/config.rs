//! Configuration management for the checker
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Checker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the evaluation API
    pub evaluation_api_url: String,

    /// Bearer token for submitting results
    pub evaluation_api_token: Option<String>,

    /// Base URL of the repository contents API
    pub github_api_url: String,

    /// Token for the contents API; unauthenticated requests are rate limited
    pub github_token: Option<String>,

    /// Timeout applied to every outbound request, in seconds
    pub check_timeout_secs: u64,
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

            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),

            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),

            check_timeout_secs: env::var("CHECK_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid CHECK_TIMEOUT_SECS")?,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.check_timeout_secs == 0 {
            anyhow::bail!("CHECK_TIMEOUT_SECS must be greater than 0");
        }

        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_zero_timeout() {
        let config = Config {
            evaluation_api_url: "http://localhost:8001".to_string(),
            evaluation_api_token: None,
            github_api_url: "https://api.github.com".to_string(),
            github_token: None,
            check_timeout_secs: 0,
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CHECK_TIMEOUT_SECS"));
    }
}
