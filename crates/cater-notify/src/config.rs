//! Notification service configuration.
//!
//! Loaded from the environment by the CLI. Tests build it directly with
//! [`NotifierConfig::new`].

use std::time::Duration;

use url::Url;

/// Default per-request timeout for the HTTP client.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where and how to reach the notification service.
///
/// `Debug` redacts the token.
#[derive(Clone)]
pub struct NotifierConfig {
    /// Service base URL; notifications go to `{base_url}/notifications`.
    pub base_url: Url,
    /// Bearer token.
    pub api_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotifierConfig {
    /// Build a config with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, api_token: impl Into<String>) -> Result<Self, ConfigError> {
        let mut parsed = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        // Relative joins replace the last segment unless the path ends in '/'.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            base_url: parsed,
            api_token: api_token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CATER_NOTIFY_URL` (required)
    /// - `CATER_NOTIFY_TOKEN` (required)
    /// - `CATER_NOTIFY_TIMEOUT_SECS` (default: 10)
    ///
    /// Returns `Ok(None)` when `CATER_NOTIFY_URL` is unset, meaning no
    /// service is configured.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw_url) = lookup("CATER_NOTIFY_URL") else {
            return Ok(None);
        };
        let token = lookup("CATER_NOTIFY_TOKEN").ok_or(ConfigError::MissingToken)?;
        let timeout_secs = match lookup("CATER_NOTIFY_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Some(
            Self::new(raw_url.trim(), token)?.with_timeout(Duration::from_secs(timeout_secs)),
        ))
    }

    /// Full URL of the notifications endpoint.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        self.base_url
            .join("notifications")
            .map_err(|e| ConfigError::InvalidUrl(self.base_url.to_string(), e.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CATER_NOTIFY_TOKEN is required when CATER_NOTIFY_URL is set")]
    MissingToken,
    #[error("invalid URL {0:?}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid notification timeout {0:?}; expected whole seconds")]
    InvalidTimeout(String),
}
