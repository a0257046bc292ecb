//! Client configuration loaded from TOML with per-field defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::preprocess::DEFAULT_MAX_DIMENSION;
use crate::quota::DEFAULT_DAILY_LIMIT;
use crate::submission::{RetryPolicy, DEFAULT_MAX_CAPTION_CHARS};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Generation endpoint URL
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    /// Successful generations allowed per day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Attempts per submission
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff unit between attempts, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Caption length bound, in characters
    #[serde(default = "default_max_caption_chars")]
    pub max_caption_chars: usize,
    /// Longest side of an uploaded image, in pixels
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Where quota state is persisted
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_endpoint_url() -> String {
    "http://localhost:8080/api/generate".to_string()
}

fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_caption_chars() -> usize {
    DEFAULT_MAX_CAPTION_CHARS
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".cardgen/state.json")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            daily_limit: default_daily_limit(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_caption_chars: default_max_caption_chars(),
            max_dimension: default_max_dimension(),
            state_file: default_state_file(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Rejects values the controller cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint_url.starts_with("http://") && !self.endpoint_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "endpoint_url must be an http(s) URL, got '{}'",
                self.endpoint_url
            )));
        }
        if self.daily_limit == 0 {
            return Err(ConfigError::Invalid(
                "daily_limit must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
