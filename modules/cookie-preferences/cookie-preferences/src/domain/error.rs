use cookie_preferences_sdk::CookiePreferencesError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Cookie preferences not found for user '{user_id}'")]
    NotFound { user_id: String },

    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound {
            user_id: user_id.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }
}

impl From<DomainError> for CookiePreferencesError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { user_id } => CookiePreferencesError::NotFound { user_id },
            DomainError::Validation { field, message } => {
                CookiePreferencesError::validation(format!("{field}: {message}"))
            }
            DomainError::Internal(msg) => CookiePreferencesError::Internal(msg),
        }
    }
}
