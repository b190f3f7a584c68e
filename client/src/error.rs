//! Error taxonomy shared by the HTTP wrapper, API modules and pages.
//!
//! ERROR HANDLING
//! ==============
//! Wrapper and API layers never swallow failures; they classify them into
//! [`ErrorKind`] so the initiating handler can pick the notification text.

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Failure category, in the order a caller usually checks them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Envelope carried a non-zero `base.code`.
    Application,
    /// HTTP 401, or a protected call made without a token.
    Unauthorized,
    /// Transport failure or unexpected HTTP status.
    Network,
    /// Input rejected before any request was made.
    Validation,
    /// Response body did not match the expected shape.
    Decode,
    /// Caller cancelled the request.
    Cancelled,
}

/// Error returned by every call through [`crate::http::HttpClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Application { code: i64, message: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Validation(String),
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Application { .. } => ErrorKind::Application,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Network(_) => ErrorKind::Network,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Text shown to the user in a transient notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Application { message, .. } | Self::Validation(message) => message.clone(),
            Self::Unauthorized => "登录已过期，请重新登录".to_owned(),
            Self::Network(_) => "网络错误，请稍后重试".to_owned(),
            Self::Decode(_) => "请求失败".to_owned(),
            Self::Cancelled => "请求已取消".to_owned(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

/// Error returned while wiring a [`crate::Client`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("http client error: {0}")]
    Api(#[from] ApiError),
}
