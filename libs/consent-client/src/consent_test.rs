#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use cookie_preferences_sdk::{
        Category, CategorySettings, ConsentKind, CookiePreferencesApi, CookiePreferencesError,
        CookieSettings, CookieSettingsUpdate,
    };
    use parking_lot::Mutex;
    use tokio::sync::Notify;
    use tracing_test::traced_test;

    use crate::consent::{ConsentClient, LoadOutcome, RemoteSync};
    use crate::cookies::{ANALYTICS_COOKIE, MemoryCookieJar, SESSION_COOKIE};
    use crate::events::ConsentEvent;
    use crate::onboarding::OnboardingProfile;
    use crate::storage::{
        CONSENT_KEY, LocalStorage, MemoryStorage, Origin, SETTINGS_KEY, USER_DATA_KEY,
        USER_ID_KEY,
    };

    // Store double that records every call
    #[derive(Default)]
    struct RecordingRemote {
        records: Mutex<HashMap<String, CookieSettings>>,
        saves: Mutex<Vec<CookieSettingsUpdate>>,
        deletes: Mutex<Vec<String>>,
        gets: AtomicUsize,
        unavailable: bool,
    }

    impl RecordingRemote {
        fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        fn with_record(user_id: &str, analytics: bool, preferences: bool) -> Self {
            let remote = Self::default();
            remote.records.lock().insert(
                user_id.to_owned(),
                CookieSettings {
                    essential: true,
                    analytics,
                    preferences,
                    user_id: user_id.to_owned(),
                    timestamp: 1_700_000_000_000,
                },
            );
            remote
        }

        fn check(&self) -> Result<(), CookiePreferencesError> {
            if self.unavailable {
                Err(CookiePreferencesError::Transport(
                    "connection refused".to_owned(),
                ))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CookiePreferencesApi for RecordingRemote {
        async fn list_preferences(&self) -> Result<Vec<CookieSettings>, CookiePreferencesError> {
            self.check()?;
            Ok(self.records.lock().values().cloned().collect())
        }

        async fn save_preferences(
            &self,
            update: CookieSettingsUpdate,
        ) -> Result<(), CookiePreferencesError> {
            self.saves.lock().push(update);
            self.check()
        }

        async fn get_preferences(
            &self,
            user_id: &str,
        ) -> Result<CookieSettings, CookiePreferencesError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.records
                .lock()
                .get(user_id)
                .cloned()
                .ok_or_else(|| CookiePreferencesError::not_found(user_id))
        }

        async fn delete_preferences(&self, user_id: &str) -> Result<bool, CookiePreferencesError> {
            self.deletes.lock().push(user_id.to_owned());
            self.check()?;
            Ok(self.records.lock().remove(user_id).is_some())
        }
    }

    // Store double whose fetch blocks until released
    struct GatedRemote {
        record: Option<CookieSettings>,
        entered: Notify,
        release: Notify,
    }

    impl GatedRemote {
        fn new(record: Option<CookieSettings>) -> Self {
            Self {
                record,
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl CookiePreferencesApi for GatedRemote {
        async fn list_preferences(&self) -> Result<Vec<CookieSettings>, CookiePreferencesError> {
            Ok(self.record.iter().cloned().collect())
        }

        async fn save_preferences(
            &self,
            _update: CookieSettingsUpdate,
        ) -> Result<(), CookiePreferencesError> {
            Ok(())
        }

        async fn get_preferences(
            &self,
            user_id: &str,
        ) -> Result<CookieSettings, CookiePreferencesError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.record
                .clone()
                .ok_or_else(|| CookiePreferencesError::not_found(user_id))
        }

        async fn delete_preferences(&self, _user_id: &str) -> Result<bool, CookiePreferencesError> {
            Ok(self.record.is_some())
        }
    }

    /// Start a load, run `accept_all` while the fetch is pending, then let the
    /// fetch finish.
    async fn accept_all_during_fetch(
        remote: Arc<GatedRemote>,
    ) -> (Arc<MemoryStorage>, ConsentClient, LoadOutcome) {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, USER_ID_KEY, "u1");
        let client = ConsentClient::builder(storage.clone())
            .remote(remote.clone())
            .build();

        let loader = tokio::spawn({
            let client = client.clone();
            async move { client.load_preferences().await }
        });
        remote.entered.notified().await;
        client.accept_all().await.unwrap();
        remote.release.notify_one();

        let outcome = tokio::time::timeout(Duration::from_secs(5), loader)
            .await
            .unwrap()
            .unwrap();
        (storage, client, outcome)
    }

    fn client_with(storage: &Arc<MemoryStorage>, remote: &Arc<RecordingRemote>) -> ConsentClient {
        ConsentClient::builder(storage.clone())
            .remote(remote.clone())
            .build()
    }

    fn seed(storage: &MemoryStorage, key: &str, value: &str) {
        storage.set_item(key, value, Origin::new()).unwrap();
    }

    #[tokio::test]
    async fn test_fresh_client_has_no_decision() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(RecordingRemote::default());
        let client = client_with(&storage, &remote);

        assert_eq!(client.load_preferences().await, LoadOutcome::Defaults);

        assert_eq!(client.consent(), None);
        assert_eq!(client.settings(), CategorySettings::essential_only());
        for category in Category::ALL {
            assert!(!client.is_allowed(category));
        }
        // No userId, so nothing to fetch
        assert_eq!(remote.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_accept_all_persists_and_pushes_anonymous_record() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(RecordingRemote::default());
        let client = client_with(&storage, &remote);
        let mut events = client.subscribe();

        let sync = client.accept_all().await.unwrap();

        assert_eq!(sync, RemoteSync::Synced);
        assert_eq!(storage.get_item(CONSENT_KEY).unwrap().as_deref(), Some("all"));
        let blob: CategorySettings =
            serde_json::from_str(&storage.get_item(SETTINGS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(blob, CategorySettings::all());
        for category in Category::ALL {
            assert!(client.is_allowed(category));
        }

        let saves = remote.saves.lock();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].user_id, "anonymous");
        assert!(saves[0].essential && saves[0].analytics && saves[0].preferences);

        assert_eq!(
            events.try_recv().unwrap(),
            ConsentEvent::Changed {
                consent: ConsentKind::All,
                settings: CategorySettings::all(),
            }
        );
    }

    #[tokio::test]
    async fn test_reject_all_keeps_only_essential() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(RecordingRemote::default());
        let client = client_with(&storage, &remote);
        client.set_user_id("u7").unwrap();

        client.reject_all().await.unwrap();

        assert_eq!(
            storage.get_item(CONSENT_KEY).unwrap().as_deref(),
            Some("essential")
        );
        assert_eq!(client.consent(), Some(ConsentKind::Essential));
        assert!(client.is_allowed(Category::Essential));
        assert!(!client.is_allowed(Category::Analytics));
        assert!(!client.is_allowed(Category::Preferences));
        assert_eq!(remote.saves.lock()[0].user_id, "u7");
    }

    #[tokio::test]
    async fn test_custom_save_forces_essential() {
        let storage = Arc::new(MemoryStorage::new());
        let client = ConsentClient::builder(storage.clone()).build();
        let settings = CategorySettings {
            essential: false,
            analytics: true,
            preferences: false,
        };

        let sync = client.save_custom(settings).await.unwrap();

        assert_eq!(sync, RemoteSync::Skipped);
        assert!(client.settings().essential);
        assert!(client.is_allowed(Category::Analytics));
        assert!(!client.is_allowed(Category::Preferences));
    }

    #[tokio::test]
    async fn test_local_decision_skips_remote_fetch() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, CONSENT_KEY, "essential");
        seed(
            &storage,
            SETTINGS_KEY,
            r#"{"essential":true,"analytics":false,"preferences":false}"#,
        );
        seed(&storage, USER_ID_KEY, "u1");
        let remote = Arc::new(RecordingRemote::with_record("u1", true, true));
        let client = client_with(&storage, &remote);

        assert_eq!(client.load_preferences().await, LoadOutcome::Local);

        assert_eq!(remote.gets.load(Ordering::SeqCst), 0);
        assert_eq!(client.consent(), Some(ConsentKind::Essential));
        assert!(!client.is_allowed(Category::Analytics));
    }

    #[tokio::test]
    async fn test_remote_record_is_adopted_as_custom() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, USER_ID_KEY, "u1");
        let remote = Arc::new(RecordingRemote::with_record("u1", true, false));
        let client = client_with(&storage, &remote);

        assert_eq!(client.load_preferences().await, LoadOutcome::Remote);

        assert_eq!(client.consent(), Some(ConsentKind::Custom));
        assert!(client.is_allowed(Category::Analytics));
        assert!(!client.is_allowed(Category::Preferences));
        assert_eq!(
            storage.get_item(CONSENT_KEY).unwrap().as_deref(),
            Some("custom")
        );
        assert!(storage.get_item(SETTINGS_KEY).unwrap().is_some());

        // Cached locally, so the next load stays local
        assert_eq!(client.load_preferences().await, LoadOutcome::Local);
        assert_eq!(remote.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unreachable_store_leaves_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, USER_ID_KEY, "u1");
        let remote = Arc::new(RecordingRemote::unavailable());
        let client = client_with(&storage, &remote);

        assert_eq!(client.load_preferences().await, LoadOutcome::Defaults);
        assert_eq!(client.consent(), None);
        assert_eq!(remote.gets.load(Ordering::SeqCst), 1);
        assert!(logs_contain("failed to fetch remote consent"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_malformed_blob_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, CONSENT_KEY, "all");
        seed(&storage, SETTINGS_KEY, "{not json");
        let client = ConsentClient::builder(storage.clone()).build();

        assert_eq!(client.load_preferences().await, LoadOutcome::Defaults);

        assert_eq!(client.consent(), None);
        assert_eq!(storage.get_item(SETTINGS_KEY).unwrap(), None);
        assert_eq!(storage.get_item(CONSENT_KEY).unwrap().as_deref(), Some("all"));
        assert!(logs_contain("discarding malformed consent data"));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, CONSENT_KEY, "maybe");
        seed(
            &storage,
            SETTINGS_KEY,
            r#"{"essential":true,"analytics":true,"preferences":true}"#,
        );
        let client = ConsentClient::builder(storage.clone()).build();

        assert_eq!(client.load_preferences().await, LoadOutcome::Defaults);

        assert_eq!(storage.get_item(CONSENT_KEY).unwrap(), None);
        assert!(!client.is_allowed(Category::Analytics));
    }

    #[tokio::test]
    async fn test_stored_essential_false_is_corrected() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, CONSENT_KEY, "custom");
        seed(
            &storage,
            SETTINGS_KEY,
            r#"{"essential":false,"analytics":false,"preferences":true}"#,
        );
        let client = ConsentClient::builder(storage.clone()).build();

        client.load_preferences().await;

        assert!(client.settings().essential);
        assert!(client.is_allowed(Category::Essential));
    }

    #[tokio::test]
    async fn test_failed_push_keeps_local_write() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(RecordingRemote::unavailable());
        let client = client_with(&storage, &remote);

        let sync = client.accept_all().await.unwrap();

        assert_eq!(sync, RemoteSync::Failed);
        assert_eq!(client.consent(), Some(ConsentKind::All));
        assert_eq!(storage.get_item(CONSENT_KEY).unwrap().as_deref(), Some("all"));
    }

    #[tokio::test]
    async fn test_reset_clears_local_and_remote() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(RecordingRemote::default());
        let client = client_with(&storage, &remote);
        client.set_user_id("u1").unwrap();
        client.accept_all().await.unwrap();
        let mut events = client.subscribe();

        let sync = client.reset_preferences().await.unwrap();

        assert_eq!(sync, RemoteSync::Synced);
        assert_eq!(remote.deletes.lock().as_slice(), ["u1".to_owned()]);
        assert_eq!(storage.get_item(CONSENT_KEY).unwrap(), None);
        assert_eq!(storage.get_item(SETTINGS_KEY).unwrap(), None);
        assert_eq!(client.consent(), None);
        assert!(!client.is_allowed(Category::Essential));
        assert_eq!(events.try_recv().unwrap(), ConsentEvent::Reset);
    }

    #[tokio::test]
    async fn test_reset_without_user_id_skips_remote() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = Arc::new(RecordingRemote::default());
        let client = client_with(&storage, &remote);
        client.accept_all().await.unwrap();

        let sync = client.reset_preferences().await.unwrap();

        assert_eq!(sync, RemoteSync::Skipped);
        assert!(remote.deletes.lock().is_empty());
        assert_eq!(remote.saves.lock()[0].user_id, "anonymous");
        assert_eq!(client.consent(), None);
    }

    #[tokio::test]
    async fn test_set_category_saves_custom_and_ignores_essential() {
        let storage = Arc::new(MemoryStorage::new());
        let client = ConsentClient::builder(storage.clone()).build();
        client.accept_all().await.unwrap();

        client.set_category(Category::Analytics, false).await.unwrap();
        assert_eq!(client.consent(), Some(ConsentKind::Custom));
        assert!(!client.is_allowed(Category::Analytics));
        assert!(client.is_allowed(Category::Preferences));

        let before = storage.get_item(SETTINGS_KEY).unwrap();
        let sync = client
            .set_category(Category::Essential, false)
            .await
            .unwrap();
        assert_eq!(sync, RemoteSync::Skipped);
        assert!(client.is_allowed(Category::Essential));
        assert_eq!(storage.get_item(SETTINGS_KEY).unwrap(), before);
    }

    #[tokio::test]
    async fn test_cookie_jar_follows_decisions() {
        let storage = Arc::new(MemoryStorage::new());
        let jar = Arc::new(MemoryCookieJar::new());
        let client = ConsentClient::builder(storage.clone())
            .cookie_jar(jar.clone())
            .build();

        client.accept_all().await.unwrap();
        assert_eq!(jar.get(SESSION_COOKIE).as_deref(), Some("essential"));
        assert_eq!(jar.get(ANALYTICS_COOKIE).as_deref(), Some("true"));

        client.reject_all().await.unwrap();
        assert_eq!(jar.get(ANALYTICS_COOKIE), None);

        client.reset_preferences().await.unwrap();
        assert_eq!(jar.get(ANALYTICS_COOKIE), None);
    }

    #[tokio::test]
    async fn test_onboarding_reopens_banner() {
        let storage = Arc::new(MemoryStorage::new());
        let client = ConsentClient::builder(storage.clone()).build();
        assert!(!client.should_show_banner());

        client.accept_all().await.unwrap();
        let mut events = client.subscribe();
        client
            .record_onboarding(&OnboardingProfile::new("Ada", 36))
            .unwrap();

        assert_eq!(events.try_recv().unwrap(), ConsentEvent::OnboardingUpdated);
        assert_eq!(storage.get_item(CONSENT_KEY).unwrap(), None);
        assert_eq!(
            client.onboarding_profile(),
            Some(OnboardingProfile::new("Ada", 36))
        );
        assert!(client.should_show_banner());

        client.reject_all().await.unwrap();
        assert!(!client.should_show_banner());

        client.clear_onboarding().unwrap();
        assert_eq!(client.onboarding_profile(), None);
    }

    #[tokio::test]
    async fn test_invalid_onboarding_record_is_removed() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, USER_DATA_KEY, r#"{"name":"","age":20}"#);
        let client = ConsentClient::builder(storage.clone()).build();

        assert!(!client.should_show_banner());
        assert_eq!(storage.get_item(USER_DATA_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_watch_storage_converges_other_tab() {
        let storage = Arc::new(MemoryStorage::new());
        let tab_a = ConsentClient::builder(storage.clone()).build();
        let tab_b = ConsentClient::builder(storage.clone()).build();
        let mut events = tab_a.subscribe();
        let watcher = tab_a.watch_storage();

        tab_b.accept_all().await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, ConsentEvent::Changed { .. }));
        assert_eq!(tab_a.consent(), Some(ConsentKind::All));

        tab_b.reset_preferences().await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await.unwrap() {
                    ConsentEvent::Reset => break ConsentEvent::Reset,
                    _ => continue,
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(event, ConsentEvent::Reset);
        assert_eq!(tab_a.consent(), None);

        watcher.abort();
    }

    #[tokio::test]
    async fn test_init_loads_on_construction() {
        let storage = Arc::new(MemoryStorage::new());
        seed(&storage, CONSENT_KEY, "all");
        seed(
            &storage,
            SETTINGS_KEY,
            r#"{"essential":true,"analytics":true,"preferences":true}"#,
        );

        let client = ConsentClient::builder(storage).init().await;

        assert_eq!(client.consent(), Some(ConsentKind::All));
    }

    #[tokio::test]
    async fn test_save_during_fetch_wins_over_stale_remote_record() {
        let stale = CookieSettings {
            essential: true,
            analytics: false,
            preferences: false,
            user_id: "u1".to_owned(),
            timestamp: 1_600_000_000_000,
        };
        let (storage, client, outcome) =
            accept_all_during_fetch(Arc::new(GatedRemote::new(Some(stale)))).await;

        assert_eq!(outcome, LoadOutcome::Local);
        assert_eq!(client.consent(), Some(ConsentKind::All));
        assert!(client.is_allowed(Category::Analytics));
        assert_eq!(
            storage.get_item(CONSENT_KEY).unwrap().as_deref(),
            Some("all")
        );
    }

    #[tokio::test]
    async fn test_save_during_missing_fetch_is_not_reset() {
        let (storage, client, outcome) =
            accept_all_during_fetch(Arc::new(GatedRemote::new(None))).await;

        assert_eq!(outcome, LoadOutcome::Local);
        assert_eq!(client.consent(), Some(ConsentKind::All));
        assert_eq!(
            storage.get_item(CONSENT_KEY).unwrap().as_deref(),
            Some("all")
        );
    }
}
