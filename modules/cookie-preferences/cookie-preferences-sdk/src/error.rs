use thiserror::Error;

/// Errors returned by [`crate::CookiePreferencesApi`] implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CookiePreferencesError {
    #[error("cookie preferences not found for user '{user_id}'")]
    NotFound { user_id: String },

    #[error("invalid cookie preferences: {message}")]
    Validation { message: String },

    #[error("preference store unreachable: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CookiePreferencesError {
    pub fn not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound {
            user_id: user_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
