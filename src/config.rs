//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_DOWNLOAD_DIR: &str = ".";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API base URL '{0}' (expected http:// or https://)")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, without a trailing slash. Endpoints are appended to it.
    pub api_base_url: String,
    /// Where downloaded reports are written.
    pub download_dir: PathBuf,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `MEDCHAT_API_BASE_URL`: default `http://127.0.0.1:5000/api`
    /// - `MEDCHAT_DOWNLOAD_DIR`: default `.`
    /// - `MEDCHAT_REQUEST_TIMEOUT_SECS`: default 120
    /// - `MEDCHAT_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(
            &std::env::var("MEDCHAT_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        )?;
        let download_dir = std::env::var("MEDCHAT_DOWNLOAD_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_DOWNLOAD_DIR), PathBuf::from);
        let timeouts = Timeouts {
            request_secs: env_parse_u64("MEDCHAT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("MEDCHAT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_base_url, download_dir, timeouts })
    }

    /// Apply command-line overrides on top of the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the overriding base URL is not an http(s) URL.
    pub fn with_overrides(mut self, api_base_url: Option<String>, download_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(url) = api_base_url {
            self.api_base_url = parse_base_url(&url)?;
        }
        if let Some(dir) = download_dir {
            self.download_dir = dir;
        }
        Ok(self)
    }
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidBaseUrl(raw.to_string()))
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
