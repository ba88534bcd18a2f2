use cookie_preferences_sdk::models::{CookieSettings, CookieSettingsUpdate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// REST DTO for a stored consent record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CookieSettingsDto {
    pub essential: bool,
    pub analytics: bool,
    pub preferences: bool,
    pub user_id: String,
    /// Write time in epoch milliseconds
    pub timestamp: i64,
}

impl From<CookieSettings> for CookieSettingsDto {
    fn from(s: CookieSettings) -> Self {
        Self {
            essential: s.essential,
            analytics: s.analytics,
            preferences: s.preferences,
            user_id: s.user_id,
            timestamp: s.timestamp,
        }
    }
}

/// REST DTO for saving a consent record (full replace).
///
/// Every field is required. A `timestamp` in the body is accepted and ignored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveCookiePreferencesRequest {
    pub essential: bool,
    pub analytics: bool,
    pub preferences: bool,
    pub user_id: String,
}

impl From<SaveCookiePreferencesRequest> for CookieSettingsUpdate {
    fn from(req: SaveCookiePreferencesRequest) -> Self {
        Self {
            essential: req.essential,
            analytics: req.analytics,
            preferences: req.preferences,
            user_id: req.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CookiePreferencesListResponse {
    pub success: bool,
    pub data: Vec<CookieSettingsDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CookiePreferencesResponse {
    pub success: bool,
    pub data: CookieSettingsDto,
}

/// Envelope for writes and failures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
