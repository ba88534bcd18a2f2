//! In-process implementation of `CookiePreferencesApi`.

use std::sync::Arc;

use async_trait::async_trait;
use cookie_preferences_sdk::{
    CookiePreferencesApi, CookiePreferencesError, CookieSettings, CookieSettingsUpdate,
};

use crate::domain::service::Service;

/// Calls the domain service directly, without HTTP.
pub struct LocalClient {
    service: Arc<Service>,
}

impl LocalClient {
    #[must_use]
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CookiePreferencesApi for LocalClient {
    async fn list_preferences(&self) -> Result<Vec<CookieSettings>, CookiePreferencesError> {
        self.service.list_preferences().await.map_err(Into::into)
    }

    async fn save_preferences(
        &self,
        update: CookieSettingsUpdate,
    ) -> Result<(), CookiePreferencesError> {
        self.service
            .save_preferences(update)
            .await
            .map(|_| ())
            .map_err(Into::into)
    }

    async fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<CookieSettings, CookiePreferencesError> {
        self.service
            .get_preferences(user_id)
            .await
            .map_err(Into::into)
    }

    async fn delete_preferences(&self, user_id: &str) -> Result<bool, CookiePreferencesError> {
        self.service
            .delete_preferences(user_id)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::ServiceConfig;
    use crate::infra::storage::InMemoryPreferencesRepository;

    fn client() -> LocalClient {
        let repo = Arc::new(InMemoryPreferencesRepository::new());
        LocalClient::new(Arc::new(Service::new(repo, ServiceConfig::default())))
    }

    #[tokio::test]
    async fn test_errors_convert_to_sdk_errors() {
        let client = client();

        let err = client.get_preferences("ghost").await.unwrap_err();
        assert!(err.is_not_found());

        let err = client
            .save_preferences(CookieSettingsUpdate {
                essential: true,
                analytics: true,
                preferences: true,
                user_id: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CookiePreferencesError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_save_and_delete_through_client() {
        let client = client();
        client
            .save_preferences(CookieSettingsUpdate {
                essential: false,
                analytics: false,
                preferences: true,
                user_id: "u1".to_owned(),
            })
            .await
            .unwrap();

        let stored = client.get_preferences("u1").await.unwrap();
        assert!(stored.essential);
        assert!(stored.preferences);

        assert!(client.delete_preferences("u1").await.unwrap());
        assert!(client.list_preferences().await.unwrap().is_empty());
    }
}
