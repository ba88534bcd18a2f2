use async_trait::async_trait;
use cookie_preferences_sdk::models::CookieSettings;
use dashmap::DashMap;

use crate::domain::repo::PreferencesRepository;

/// Process-local store: one record per `user_id`, last write wins.
#[derive(Default)]
pub struct InMemoryPreferencesRepository {
    records: DashMap<String, CookieSettings>,
}

impl InMemoryPreferencesRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryPreferencesRepository {
    async fn list(&self) -> anyhow::Result<Vec<CookieSettings>> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find(&self, user_id: &str) -> anyhow::Result<Option<CookieSettings>> {
        Ok(self.records.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, settings: CookieSettings) -> anyhow::Result<()> {
        self.records.insert(settings.user_id.clone(), settings);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> anyhow::Result<bool> {
        Ok(self.records.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: &str, analytics: bool, timestamp: i64) -> CookieSettings {
        CookieSettings {
            essential: true,
            analytics,
            preferences: false,
            user_id: user_id.to_owned(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let repo = InMemoryPreferencesRepository::new();
        repo.upsert(record("u1", true, 1)).await.unwrap();
        repo.upsert(record("u1", false, 2)).await.unwrap();

        assert_eq!(repo.len(), 1);
        let found = repo.find("u1").await.unwrap().unwrap();
        assert!(!found.analytics);
        assert_eq!(found.timestamp, 2);
    }

    #[tokio::test]
    async fn test_find_requires_exact_key() {
        let repo = InMemoryPreferencesRepository::new();
        repo.upsert(record("user-1", true, 1)).await.unwrap();

        assert!(repo.find("user").await.unwrap().is_none());
        assert!(repo.find("USER-1").await.unwrap().is_none());
        assert!(repo.find("user-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let repo = InMemoryPreferencesRepository::new();
        repo.upsert(record("u1", true, 1)).await.unwrap();

        assert!(repo.delete("u1").await.unwrap());
        assert!(!repo.delete("u1").await.unwrap());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_every_record() {
        let repo = InMemoryPreferencesRepository::new();
        repo.upsert(record("a", true, 1)).await.unwrap();
        repo.upsert(record("b", false, 1)).await.unwrap();

        let mut ids: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_owned(), "b".to_owned()]);
    }
}
