//! Configuration for the resource service connection.

use super::ResourceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Connection settings for the resource service.
///
/// Typically loaded from a `manual-tasks.toml` file or the environment.
///
/// # Example Configuration File
///
/// ```toml
/// base_url = "https://flows.example.com"
/// auth_token = "eyJhbGciOi..."
/// timeout_ms = 15000
/// page_size = 50
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the service; requests go to `{base_url}/api/...`.
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Page size used by the todo list.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_timeout() -> u64 {
    30_000
}

fn default_page_size() -> u32 {
    20
}

/// Environment variable holding the base URL.
pub const ENV_BASE_URL: &str = "MANUAL_TASKS_BASE_URL";
/// Environment variable holding the bearer token.
pub const ENV_AUTH_TOKEN: &str = "MANUAL_TASKS_AUTH_TOKEN";
/// Environment variable holding the timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "MANUAL_TASKS_TIMEOUT_MS";
/// Environment variable holding the todo page size.
pub const ENV_PAGE_SIZE: &str = "MANUAL_TASKS_PAGE_SIZE";

impl ClientConfig {
    /// Creates a configuration for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout_ms: default_timeout(),
            page_size: default_page_size(),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ResourceError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ResourceError> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ResourceError> {
        toml::to_string_pretty(self).map_err(|e| ResourceError::Serialization(e.to_string()))
    }

    /// Loads configuration from environment variables.
    ///
    /// `MANUAL_TASKS_BASE_URL` is required. `MANUAL_TASKS_AUTH_TOKEN`,
    /// `MANUAL_TASKS_TIMEOUT_MS` and `MANUAL_TASKS_PAGE_SIZE` are optional;
    /// unparsable numbers keep their defaults.
    ///
    /// ```bash
    /// export MANUAL_TASKS_BASE_URL="http://localhost:13000"
    /// export MANUAL_TASKS_AUTH_TOKEN="..."
    /// ```
    pub fn from_env() -> Result<Self, ResourceError> {
        let base_url = std::env::var(ENV_BASE_URL)
            .map_err(|_| ResourceError::Configuration(format!("{ENV_BASE_URL} is not set")))?;
        let mut config = Self::new(base_url);
        config.apply_env();
        Ok(config)
    }

    /// Overrides settings from the optional environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ENV_AUTH_TOKEN) {
            if !token.is_empty() {
                self.auth_token = Some(token);
            }
        }
        if let Some(ms) = std::env::var(ENV_TIMEOUT_MS).ok().and_then(|v| v.parse().ok()) {
            self.timeout_ms = ms;
        }
        if let Some(size) = std::env::var(ENV_PAGE_SIZE).ok().and_then(|v| v.parse().ok()) {
            self.page_size = size;
        }
    }

    /// Sets the bearer token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the todo page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates and returns the API root, `{base_url}/api/`.
    pub fn api_root(&self) -> Result<url::Url, ResourceError> {
        let base = self.base_url.trim_end_matches('/');
        url::Url::parse(&format!("{base}/api/"))
            .map_err(|e| ResourceError::Configuration(format!("invalid base_url '{}': {e}", self.base_url)))
    }
}
