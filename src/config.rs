//! Client configuration from the environment

use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_LOG_FILTER: &str = "circuit_chat=info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("backend URL must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
}

/// Where the backend lives and how loudly to log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without a trailing slash (e.g. `http://127.0.0.1:5000`)
    pub base_url: String,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var("CIRCUIT_CHAT_URL").ok(),
            std::env::var("CIRCUIT_CHAT_LOG").ok(),
        )
    }

    fn from_vars(base_url: Option<String>, log_filter: Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            base_url: base_url
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty())
                .unwrap_or(defaults.base_url),
            log_filter: log_filter
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(defaults.log_filter),
        };

        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(config.base_url));
        }
        Ok(config)
    }

    /// Absolute URL for an API path such as `/api/chat`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
