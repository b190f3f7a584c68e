//! Client configuration loaded from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const SESSION_FILE: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("cannot derive websocket URL from base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Runtime configuration for [`crate::Client`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP base URL of the gateway (e.g. `"http://localhost:8080"`).
    pub base_url: String,
    /// Explicit websocket base URL. Derived from `base_url` when unset.
    pub ws_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Directory holding the persisted session file.
    pub state_dir: PathBuf,
}

impl ClientConfig {
    /// Config for `base_url` with every other field at its default.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ws_url: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            state_dir: default_state_dir(std::env::var("HOME").ok()),
        }
    }

    /// Load config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when `VIDEOHUB_TIMEOUT_MS` is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when `VIDEOHUB_TIMEOUT_MS` is not a number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = non_empty("VIDEOHUB_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let ws_url = non_empty("VIDEOHUB_WS_URL");
        let timeout = match non_empty("VIDEOHUB_TIMEOUT_MS") {
            Some(raw) => {
                let ms = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    key: "VIDEOHUB_TIMEOUT_MS",
                    value: raw.clone(),
                })?;
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };
        let state_dir = non_empty("VIDEOHUB_STATE_DIR")
            .map_or_else(|| default_state_dir(lookup("HOME")), PathBuf::from);

        Ok(Self {
            base_url,
            ws_url,
            timeout,
            state_dir,
        })
    }

    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.state_dir.join(SESSION_FILE)
    }

    /// Websocket base URL: `ws_url` if set, otherwise `base_url` with its
    /// scheme switched to `ws`/`wss`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for a base URL that is neither
    /// `http://` nor `https://`.
    pub fn ws_base(&self) -> Result<String, ConfigError> {
        if let Some(ws_url) = &self.ws_url {
            return Ok(ws_url.trim_end_matches('/').to_owned());
        }

        let trimmed = self.base_url.trim_end_matches('/');
        if let Some(rest) = trimmed.strip_prefix("http://") {
            return Ok(format!("ws://{rest}"));
        }
        if let Some(rest) = trimmed.strip_prefix("https://") {
            return Ok(format!("wss://{rest}"));
        }

        Err(ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }
}

fn default_state_dir(home: Option<String>) -> PathBuf {
    home.filter(|h| !h.is_empty())
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".videohub")
}
