use async_trait::async_trait;

use crate::error::CookiePreferencesError;
use crate::models::{CookieSettings, CookieSettingsUpdate};

/// Access to the preference store.
///
/// Implemented in-process by the module's local client and remotely by the
/// HTTP client in `consent-client`. Consumers hold it as
/// `Arc<dyn CookiePreferencesApi>`.
#[async_trait]
pub trait CookiePreferencesApi: Send + Sync {
    /// All stored records, in no particular order.
    async fn list_preferences(&self) -> Result<Vec<CookieSettings>, CookiePreferencesError>;

    /// Full-replace upsert of the record keyed by `update.user_id`.
    ///
    /// The store forces `essential` to `true` and stamps the timestamp.
    async fn save_preferences(
        &self,
        update: CookieSettingsUpdate,
    ) -> Result<(), CookiePreferencesError>;

    /// Record for exactly `user_id`, or [`CookiePreferencesError::NotFound`].
    async fn get_preferences(&self, user_id: &str)
    -> Result<CookieSettings, CookiePreferencesError>;

    /// Remove the record for `user_id`; returns whether one existed.
    async fn delete_preferences(&self, user_id: &str) -> Result<bool, CookiePreferencesError>;
}
