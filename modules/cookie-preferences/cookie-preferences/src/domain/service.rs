use std::sync::Arc;

use cookie_preferences_sdk::models::{CookieSettings, CookieSettingsUpdate};
use tracing::{debug, info, instrument};

use super::error::DomainError;
use super::repo::PreferencesRepository;
use crate::config::CookiePreferencesConfig;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_user_id_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&CookiePreferencesConfig::default())
    }
}

impl From<&CookiePreferencesConfig> for ServiceConfig {
    fn from(cfg: &CookiePreferencesConfig) -> Self {
        Self {
            max_user_id_length: cfg.max_user_id_length,
        }
    }
}

/// Source of record timestamps, in epoch milliseconds.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Validate, stamp and upsert consent records.
pub struct Service {
    repo: Arc<dyn PreferencesRepository>,
    config: ServiceConfig,
    clock: Clock,
}

impl Service {
    pub fn new(repo: Arc<dyn PreferencesRepository>, config: ServiceConfig) -> Self {
        Self::with_clock(repo, config, system_clock)
    }

    pub fn with_clock(
        repo: Arc<dyn PreferencesRepository>,
        config: ServiceConfig,
        clock: Clock,
    ) -> Self {
        Self {
            repo,
            config,
            clock,
        }
    }

    /// # Errors
    /// Returns `DomainError::Internal` if the repository fails.
    #[instrument(skip(self))]
    pub async fn list_preferences(&self) -> Result<Vec<CookieSettings>, DomainError> {
        let all = self.repo.list().await?;
        debug!(count = all.len(), "Listed cookie preferences");
        Ok(all)
    }

    /// Full-replace upsert. `essential` is forced to `true` and the timestamp is
    /// taken from the service clock, whatever the caller sent.
    ///
    /// # Errors
    /// Returns `DomainError::Validation` for an empty or oversized `user_id`,
    /// `DomainError::Internal` if the repository fails.
    #[instrument(skip(self, update), fields(user_id = %update.user_id))]
    pub async fn save_preferences(
        &self,
        update: CookieSettingsUpdate,
    ) -> Result<CookieSettings, DomainError> {
        self.validate_user_id(&update.user_id)?;

        if !update.essential {
            debug!("Ignoring attempt to disable essential cookies");
        }

        let record = CookieSettings {
            essential: true,
            analytics: update.analytics,
            preferences: update.preferences,
            user_id: update.user_id,
            timestamp: (self.clock)(),
        };

        self.repo.upsert(record.clone()).await?;
        info!(
            analytics = record.analytics,
            preferences = record.preferences,
            "Saved cookie preferences"
        );
        Ok(record)
    }

    /// # Errors
    /// Returns `DomainError::NotFound` if no record exists for `user_id`.
    #[instrument(skip(self))]
    pub async fn get_preferences(&self, user_id: &str) -> Result<CookieSettings, DomainError> {
        self.repo
            .find(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(user_id))
    }

    /// Returns whether a record existed. Absence is not an error.
    ///
    /// # Errors
    /// Returns `DomainError::Internal` if the repository fails.
    #[instrument(skip(self))]
    pub async fn delete_preferences(&self, user_id: &str) -> Result<bool, DomainError> {
        let deleted = self.repo.delete(user_id).await?;
        if deleted {
            info!("Deleted cookie preferences");
        } else {
            debug!("No cookie preferences to delete");
        }
        Ok(deleted)
    }

    fn validate_user_id(&self, user_id: &str) -> Result<(), DomainError> {
        if user_id.trim().is_empty() {
            return Err(DomainError::validation("userId", "must not be empty"));
        }
        if user_id.len() > self.config.max_user_id_length {
            return Err(DomainError::validation(
                "userId",
                format!(
                    "exceeds maximum length of {} bytes",
                    self.config.max_user_id_length
                ),
            ));
        }
        Ok(())
    }
}
