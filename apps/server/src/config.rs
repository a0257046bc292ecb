use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gemini: GeminiConfig,
    pub limits: RequestLimits,
}

/// Upstream model configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Outbound proxy for regions where the API is not reachable directly
    pub proxy_url: Option<String>,
    pub timeout: Duration,
}

/// Bounds on incoming generation requests
#[derive(Debug, Clone)]
pub struct RequestLimits {
    /// Maximum caption length in characters
    pub max_caption_chars: usize,
    /// Maximum JSON body size in bytes
    pub max_payload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            gemini: GeminiConfig::from_env()?,
            limits: RequestLimits::from_env(),
        })
    }
}

impl GeminiConfig {
    /// Load Gemini configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        url::Url::parse(&base_url).map_err(|_| ConfigError::InvalidUrl("GEMINI_BASE_URL"))?;

        let proxy_url = env::var("HTTP_PROXY_URL").ok().filter(|p| !p.is_empty());
        if let Some(ref proxy) = proxy_url {
            url::Url::parse(proxy).map_err(|_| ConfigError::InvalidUrl("HTTP_PROXY_URL"))?;
        }

        Ok(Self {
            api_key,
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            proxy_url,
            timeout: Duration::from_secs(
                env::var("GEMINI_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .unwrap_or(120),
            ),
        })
    }
}

impl RequestLimits {
    /// Load request limits from environment variables
    pub fn from_env() -> Self {
        Self {
            max_caption_chars: env::var("MAX_CAPTION_CHARS")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .unwrap_or(200),
            max_payload_bytes: env::var("MAX_PAYLOAD_BYTES")
                .unwrap_or_else(|_| "15728640".to_string())
                .parse()
                .unwrap_or(15 * 1024 * 1024),
        }
    }
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_caption_chars: 200,
            max_payload_bytes: 15 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    MissingApiKey,
    InvalidUrl(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid number"),
            ConfigError::MissingApiKey => {
                write!(f, "GEMINI_API_KEY environment variable is required")
            }
            ConfigError::InvalidUrl(var) => write!(f, "{} must be a valid URL", var),
        }
    }
}

impl std::error::Error for ConfigError {}
