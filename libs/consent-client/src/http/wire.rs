//! JSON envelopes of the preference store API.

use cookie_preferences_sdk::{CookieSettings, CookieSettingsUpdate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveRequest<'a> {
    pub essential: bool,
    pub analytics: bool,
    pub preferences: bool,
    pub user_id: &'a str,
}

impl<'a> From<&'a CookieSettingsUpdate> for SaveRequest<'a> {
    fn from(update: &'a CookieSettingsUpdate) -> Self {
        Self {
            essential: update.essential,
            analytics: update.analytics,
            preferences: update.preferences,
            user_id: &update.user_id,
        }
    }
}

/// `{ success, data }`; only `data` matters once the status is 2xx.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

pub(crate) type RecordEnvelope = DataEnvelope<CookieSettings>;
pub(crate) type ListEnvelope = DataEnvelope<Vec<CookieSettings>>;

/// `{ success, message }`, the body of writes and of every error.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
