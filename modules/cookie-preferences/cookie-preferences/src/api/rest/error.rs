use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::dto::MessageResponse;
use crate::domain::error::DomainError;

pub const MSG_INVALID: &str = "Invalid cookie preferences data";
pub const MSG_NOT_FOUND: &str = "Cookie preferences not found";
const MSG_INTERNAL: &str = "An internal error occurred";

/// Map a domain error to its status code and `{ success: false, message }` body.
///
/// Validation details stay in the logs; clients get a generic message.
pub fn domain_error_to_response(e: &DomainError) -> (StatusCode, MessageResponse) {
    match e {
        DomainError::Validation { field, message } => {
            tracing::debug!(field = %field, "Rejected cookie preferences: {}", message);
            (StatusCode::BAD_REQUEST, MessageResponse::failed(MSG_INVALID))
        }
        DomainError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, MessageResponse::failed(MSG_NOT_FOUND))
        }
        DomainError::Internal(msg) => {
            tracing::error!(error = ?e, "Internal error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                MessageResponse::failed(MSG_INTERNAL),
            )
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let (status, body) = domain_error_to_response(&self);
        (status, Json(body)).into_response()
    }
}

/// Malformed or incomplete request bodies are validation errors.
impl From<JsonRejection> for DomainError {
    fn from(rejection: JsonRejection) -> Self {
        DomainError::validation("body", rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, DomainError>;
