use async_trait::async_trait;
use cookie_preferences_sdk::models::CookieSettings;

/// Storage port for consent records keyed by `user_id`.
///
/// A durable backend (file, database) replacing the in-memory map must keep
/// the same contract: `upsert` replaces the whole record, `delete` reports
/// whether something was removed.
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<CookieSettings>>;

    async fn find(&self, user_id: &str) -> anyhow::Result<Option<CookieSettings>>;

    async fn upsert(&self, settings: CookieSettings) -> anyhow::Result<()>;

    async fn delete(&self, user_id: &str) -> anyhow::Result<bool>;
}
