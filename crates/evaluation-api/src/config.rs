//! Configuration management for the evaluation API
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Directory holding the deployment and task logs
    pub data_dir: PathBuf,

    /// Reject a notification whose (task, round, nonce) was already received
    pub reject_duplicate_nonce: bool,

    /// Bearer token for mutating routes; unset leaves them open
    pub api_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8001".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            data_dir: env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),

            reject_duplicate_nonce: env::var("REJECT_DUPLICATE_NONCE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid REJECT_DUPLICATE_NONCE (expected true/false)")?,

            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
