use std::time::Duration;

use cookie_preferences_sdk::CookiePreferencesError;
use thiserror::Error;

/// Failures talking to the preference store over HTTP.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid user agent: {0}")]
    InvalidUserAgent(#[from] http::header::InvalidHeaderValue),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: http::StatusCode,
        message: String,
    },

    #[error("failed to decode response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub(crate) fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(err))
    }

    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures reading or writing local storage.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("malformed value under '{key}': {reason}")]
    Malformed { key: String, reason: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn malformed(key: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<ClientError> for CookiePreferencesError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::HttpStatus { status, message } if status == http::StatusCode::BAD_REQUEST => {
                CookiePreferencesError::validation(message)
            }
            ClientError::HttpStatus { status, message } if status.is_server_error() => {
                CookiePreferencesError::Internal(message)
            }
            other => CookiePreferencesError::Transport(other.to_string()),
        }
    }
}
