//! Local-first consent state machine.
//!
//! Local storage is authoritative for reads. The preference store is consulted
//! only when nothing is decided locally and a `userId` is known, and written
//! best-effort after every local save. Remote failures degrade silently.

use std::sync::{Arc, Weak};

use cookie_preferences_sdk::{
    ANONYMOUS_USER_ID, Category, CategorySettings, ConsentKind, CookiePreferencesApi,
    CookieSettingsUpdate,
};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::cookies::{self, ANALYTICS_COOKIE, CookieJar, PREFERENCES_COOKIE};
use crate::error::StorageError;
use crate::events::ConsentEvent;
use crate::onboarding::{self, OnboardingProfile};
use crate::storage::{
    CONSENT_KEY, LocalStorage, Origin, SETTINGS_KEY, USER_DATA_KEY, USER_ID_KEY,
};

const DEFAULT_EVENT_CAPACITY: usize = 16;

/// In-memory consent state. `consent == None` means nothing is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsentSnapshot {
    pub consent: Option<ConsentKind>,
    pub settings: CategorySettings,
}

impl ConsentSnapshot {
    #[must_use]
    pub fn has_decision(&self) -> bool {
        self.consent.is_some()
    }

    /// Nothing is allowed before a decision; afterwards `Essential` always is.
    #[must_use]
    pub fn is_allowed(&self, category: Category) -> bool {
        if self.consent.is_none() {
            return false;
        }
        match category {
            Category::Essential => true,
            other => self.settings.get(other),
        }
    }
}

/// Where [`ConsentClient::load_preferences`] found the state it adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Local,
    Remote,
    Defaults,
}

/// Result of the best-effort remote half of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSync {
    Synced,
    /// No remote call was made.
    Skipped,
    /// The call failed and was logged; local state is unaffected.
    Failed,
}

pub struct ConsentClientBuilder {
    storage: Arc<dyn LocalStorage>,
    remote: Option<Arc<dyn CookiePreferencesApi>>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    event_capacity: usize,
}

impl ConsentClientBuilder {
    /// Preference store to sync with. Without one the client is local-only.
    #[must_use]
    pub fn remote(mut self, remote: Arc<dyn CookiePreferencesApi>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Jar that receives the consented cookies after every save and load.
    #[must_use]
    pub fn cookie_jar(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn build(self) -> ConsentClient {
        let (events, _) = broadcast::channel(self.event_capacity);
        ConsentClient {
            inner: Arc::new(Inner {
                storage: self.storage,
                remote: self.remote,
                cookie_jar: self.cookie_jar,
                origin: Origin::new(),
                state: RwLock::new(ConsentSnapshot::default()),
                events,
            }),
        }
    }

    /// Build and run the initial [`ConsentClient::load_preferences`].
    pub async fn init(self) -> ConsentClient {
        let client = self.build();
        client.load_preferences().await;
        client
    }
}

/// Handle to one consent state, the analogue of a browser tab.
///
/// Clones share state and origin. Build a second client on the same storage to
/// model another tab.
#[derive(Clone)]
pub struct ConsentClient {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn LocalStorage>,
    remote: Option<Arc<dyn CookiePreferencesApi>>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    origin: Origin,
    state: RwLock<ConsentSnapshot>,
    events: broadcast::Sender<ConsentEvent>,
}

impl ConsentClient {
    #[must_use]
    pub fn builder(storage: Arc<dyn LocalStorage>) -> ConsentClientBuilder {
        ConsentClientBuilder {
            storage,
            remote: None,
            cookie_jar: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    #[must_use]
    pub fn origin(&self) -> Origin {
        self.inner.origin
    }

    #[must_use]
    pub fn snapshot(&self) -> ConsentSnapshot {
        *self.inner.state.read()
    }

    #[must_use]
    pub fn consent(&self) -> Option<ConsentKind> {
        self.snapshot().consent
    }

    #[must_use]
    pub fn settings(&self) -> CategorySettings {
        self.snapshot().settings
    }

    #[must_use]
    pub fn is_allowed(&self, category: Category) -> bool {
        self.snapshot().is_allowed(category)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsentEvent> {
        self.inner.events.subscribe()
    }

    /// Stored `userId`, if any non-blank one exists.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.read_raw(USER_ID_KEY)
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
    }

    /// # Errors
    /// Returns `StorageError` if the id cannot be persisted.
    pub fn set_user_id(&self, user_id: &str) -> Result<(), StorageError> {
        self.inner
            .storage
            .set_item(USER_ID_KEY, user_id, self.inner.origin)
    }

    /// Rebuild state from local storage, falling back to the preference store.
    ///
    /// Never fails: unreadable local data is discarded and remote errors are
    /// logged, leaving the defaults in place.
    #[tracing::instrument(skip_all, fields(origin = %self.inner.origin))]
    pub async fn load_preferences(&self) -> LoadOutcome {
        if let Some((consent, settings)) = self.read_local_decision() {
            tracing::debug!(%consent, "adopted local consent");
            self.adopt(consent, settings, false);
            return LoadOutcome::Local;
        }

        if let (Some(user_id), Some(remote)) = (self.user_id(), self.inner.remote.as_ref()) {
            let fetched = remote.get_preferences(&user_id).await;

            // A save that landed during the fetch is newer than the store's copy
            if let Some((consent, settings)) = self.read_local_decision() {
                tracing::debug!(%consent, "local consent decided during remote fetch");
                self.adopt(consent, settings, false);
                return LoadOutcome::Local;
            }

            match fetched {
                Ok(record) => {
                    let settings = record.categories().normalized();
                    if let Err(e) = self.write_local(ConsentKind::Custom, settings) {
                        tracing::warn!(error = %e, "failed to cache remote consent locally");
                    }
                    tracing::debug!(user_id = %user_id, "adopted remote consent");
                    self.adopt(ConsentKind::Custom, settings, false);
                    return LoadOutcome::Remote;
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(user_id = %user_id, "no remote consent record");
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "failed to fetch remote consent");
                }
            }
        }

        let previous = std::mem::take(&mut *self.inner.state.write());
        if previous.has_decision() {
            self.publish(ConsentEvent::Reset);
        }
        LoadOutcome::Defaults
    }

    /// Persist a decision locally, then push it to the store.
    ///
    /// `settings.essential` is forced to `true`.
    ///
    /// # Errors
    /// Returns `StorageError` if the local write fails; nothing else changes
    /// in that case. Remote failures are reported through [`RemoteSync`].
    #[tracing::instrument(skip_all, fields(origin = %self.inner.origin, %consent))]
    pub async fn save_preferences(
        &self,
        consent: ConsentKind,
        settings: CategorySettings,
    ) -> Result<RemoteSync, StorageError> {
        let settings = settings.normalized();
        self.write_local(consent, settings)?;
        self.adopt(consent, settings, true);

        let Some(remote) = self.inner.remote.as_ref() else {
            return Ok(RemoteSync::Skipped);
        };
        let user_id = self
            .user_id()
            .unwrap_or_else(|| ANONYMOUS_USER_ID.to_owned());
        let update = CookieSettingsUpdate::from_categories(user_id, settings);
        match remote.save_preferences(update).await {
            Ok(()) => Ok(RemoteSync::Synced),
            Err(e) => {
                tracing::warn!(error = %e, "failed to push consent to store");
                Ok(RemoteSync::Failed)
            }
        }
    }

    /// # Errors
    /// See [`ConsentClient::save_preferences`].
    pub async fn accept_all(&self) -> Result<RemoteSync, StorageError> {
        self.save_preferences(ConsentKind::All, CategorySettings::all())
            .await
    }

    /// # Errors
    /// See [`ConsentClient::save_preferences`].
    pub async fn reject_all(&self) -> Result<RemoteSync, StorageError> {
        self.save_preferences(ConsentKind::Essential, CategorySettings::essential_only())
            .await
    }

    /// # Errors
    /// See [`ConsentClient::save_preferences`].
    pub async fn save_custom(&self, settings: CategorySettings) -> Result<RemoteSync, StorageError> {
        self.save_preferences(ConsentKind::Custom, settings).await
    }

    /// Flip one category and save as `Custom`. `Essential` is not toggleable
    /// and returns `Skipped` without writing.
    ///
    /// # Errors
    /// See [`ConsentClient::save_preferences`].
    pub async fn set_category(
        &self,
        category: Category,
        enabled: bool,
    ) -> Result<RemoteSync, StorageError> {
        if category == Category::Essential {
            return Ok(RemoteSync::Skipped);
        }
        let settings = self.settings().with(category, enabled);
        self.save_custom(settings).await
    }

    /// Forget the decision locally and on the store.
    ///
    /// The remote delete runs only when a `userId` is known. Saves without one
    /// go to the shared `"anonymous"` record, which every unidentified visitor
    /// overwrites; reset leaves it alone rather than delete another visitor's
    /// latest write.
    ///
    /// # Errors
    /// Returns `StorageError` if the local keys cannot be removed.
    #[tracing::instrument(skip_all, fields(origin = %self.inner.origin))]
    pub async fn reset_preferences(&self) -> Result<RemoteSync, StorageError> {
        let origin = self.inner.origin;
        self.inner.storage.remove_item(CONSENT_KEY, origin)?;
        self.inner.storage.remove_item(SETTINGS_KEY, origin)?;
        *self.inner.state.write() = ConsentSnapshot::default();
        if let Some(jar) = &self.inner.cookie_jar {
            jar.delete_cookie(ANALYTICS_COOKIE);
            jar.delete_cookie(PREFERENCES_COOKIE);
        }
        self.publish(ConsentEvent::Reset);

        let (Some(user_id), Some(remote)) = (self.user_id(), self.inner.remote.as_ref()) else {
            return Ok(RemoteSync::Skipped);
        };
        match remote.delete_preferences(&user_id).await {
            Ok(existed) => {
                tracing::debug!(user_id = %user_id, existed, "remote consent deleted");
                Ok(RemoteSync::Synced)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "failed to delete remote consent");
                Ok(RemoteSync::Failed)
            }
        }
    }

    /// Store the onboarding record and clear the consent tag so the banner
    /// asks the newly onboarded visitor again.
    ///
    /// # Errors
    /// Returns `StorageError` if storage rejects the write.
    pub fn record_onboarding(&self, profile: &OnboardingProfile) -> Result<(), StorageError> {
        let origin = self.inner.origin;
        let raw = serde_json::to_string(profile)?;
        self.inner.storage.set_item(USER_DATA_KEY, &raw, origin)?;
        self.inner.storage.remove_item(CONSENT_KEY, origin)?;
        self.publish(ConsentEvent::OnboardingUpdated);
        Ok(())
    }

    /// The stored onboarding record. An incomplete or unparsable one is removed.
    #[must_use]
    pub fn onboarding_profile(&self) -> Option<OnboardingProfile> {
        let raw = self.read_raw(USER_DATA_KEY)?;
        let profile = OnboardingProfile::parse(&raw);
        if profile.is_none() {
            tracing::warn!(key = USER_DATA_KEY, "discarding invalid onboarding record");
            self.remove_quietly(USER_DATA_KEY);
        }
        profile
    }

    /// # Errors
    /// Returns `StorageError` if the record cannot be removed.
    pub fn clear_onboarding(&self) -> Result<(), StorageError> {
        self.inner
            .storage
            .remove_item(USER_DATA_KEY, self.inner.origin)?;
        self.publish(ConsentEvent::OnboardingUpdated);
        Ok(())
    }

    #[must_use]
    pub fn should_show_banner(&self) -> bool {
        let has_tag = self.read_raw(CONSENT_KEY).is_some();
        onboarding::should_show_banner(self.onboarding_profile().as_ref(), has_tag)
    }

    /// Reload whenever another origin changes the consent keys on the shared
    /// storage, and relay its onboarding updates.
    ///
    /// The task ends once every handle to this client is dropped and the next
    /// storage event arrives; abort the handle to stop it sooner.
    pub fn watch_storage(&self) -> JoinHandle<()> {
        let mut rx = self.inner.storage.subscribe();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let origin = self.inner.origin;

        tokio::spawn(async move {
            loop {
                let reload = match rx.recv().await {
                    Ok(event) if event.origin == origin => continue,
                    Ok(event) => match event.key.as_str() {
                        CONSENT_KEY | SETTINGS_KEY => true,
                        USER_DATA_KEY => {
                            let Some(inner) = weak.upgrade() else { break };
                            let _ = inner.events.send(ConsentEvent::OnboardingUpdated);
                            false
                        }
                        _ => false,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "storage events lagged; reloading");
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if reload {
                    let Some(inner) = weak.upgrade() else { break };
                    ConsentClient { inner }.load_preferences().await;
                }
            }
            tracing::debug!(%origin, "storage watcher stopped");
        })
    }

    fn adopt(&self, consent: ConsentKind, settings: CategorySettings, always_notify: bool) {
        let next = ConsentSnapshot {
            consent: Some(consent),
            settings,
        };
        let previous = std::mem::replace(&mut *self.inner.state.write(), next);
        if let Some(jar) = &self.inner.cookie_jar {
            cookies::apply_consented_cookies(jar.as_ref(), &settings);
        }
        if always_notify || previous != next {
            self.publish(ConsentEvent::Changed { consent, settings });
        }
    }

    fn publish(&self, event: ConsentEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Blob first, tag last: a reader that sees the tag also sees the blob.
    fn write_local(
        &self,
        consent: ConsentKind,
        settings: CategorySettings,
    ) -> Result<(), StorageError> {
        let origin = self.inner.origin;
        let blob = serde_json::to_string(&settings)?;
        self.inner.storage.set_item(SETTINGS_KEY, &blob, origin)?;
        self.inner
            .storage
            .set_item(CONSENT_KEY, consent.as_str(), origin)
    }

    fn read_local_decision(&self) -> Option<(ConsentKind, CategorySettings)> {
        let consent = self.read_parsed(CONSENT_KEY, |raw| {
            raw.parse::<ConsentKind>().map_err(|e| e.to_string())
        });
        let settings = self.read_parsed(SETTINGS_KEY, |raw| {
            serde_json::from_str::<CategorySettings>(raw).map_err(|e| e.to_string())
        });
        Some((consent?, settings?.normalized()))
    }

    /// Parse a stored value; a malformed one is removed and reads as absent.
    fn read_parsed<T>(
        &self,
        key: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        let raw = self.read_raw(key)?;
        match parse(&raw) {
            Ok(value) => Some(value),
            Err(reason) => {
                let err = StorageError::malformed(key, reason);
                tracing::warn!(error = %err, "discarding malformed consent data");
                self.remove_quietly(key);
                None
            }
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.inner.storage.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read local storage");
                None
            }
        }
    }

    fn remove_quietly(&self, key: &str) {
        if let Err(e) = self.inner.storage.remove_item(key, self.inner.origin) {
            tracing::warn!(key, error = %e, "failed to remove local storage key");
        }
    }
}
