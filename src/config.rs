//! Client configuration.
//!
//! Values come from the environment (optionally seeded from a `.env` file by
//! the binary). The base URL is used verbatim: request paths are appended to
//! it without inserting or trimming slashes.

use std::time::Duration;

use thiserror::Error;

/// Base URL used when neither `SNIFFOUT_API_URL` nor `VITE_API_URL` is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";

/// Refresh endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "auth/refresh-token/";

/// Lifetime given to an access token written after login or refresh.
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for an [`ApiClient`](crate::api::client::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix every request path is appended to, e.g. `https://host/api/`.
    pub base_url: String,
    /// Path of the token refresh endpoint, relative to `base_url`.
    pub refresh_path: String,
    /// Expiry written alongside a freshly obtained access token.
    pub access_token_ttl: Duration,
    /// Whole-request timeout enforced by the transport.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default settings for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Build a configuration from environment variables.
    ///
    /// Base URL: `SNIFFOUT_API_URL` > `VITE_API_URL` > [`DEFAULT_BASE_URL`].
    /// `SNIFFOUT_REFRESH_PATH`, `SNIFFOUT_TOKEN_TTL_SECS` and
    /// `SNIFFOUT_HTTP_TIMEOUT_SECS` override the remaining defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("SNIFFOUT_API_URL")
            .or_else(|| lookup("VITE_API_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut config = Self::new(base_url);

        if let Some(path) = lookup("SNIFFOUT_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Some(raw) = lookup("SNIFFOUT_TOKEN_TTL_SECS") {
            config.access_token_ttl = parse_secs("SNIFFOUT_TOKEN_TTL_SECS", raw)?;
        }
        if let Some(raw) = lookup("SNIFFOUT_HTTP_TIMEOUT_SECS") {
            config.timeout = parse_secs("SNIFFOUT_HTTP_TIMEOUT_SECS", raw)?;
        }

        Ok(config)
    }

    /// Absolute URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_secs(name: &'static str, raw: String) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            name,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
