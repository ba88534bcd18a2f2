use std::sync::Arc;

use axum::Router;
use cookie_preferences_sdk::CookiePreferencesApi;

use crate::api::rest::routes;
use crate::config::CookiePreferencesConfig;
use crate::domain::repo::PreferencesRepository;
use crate::domain::service::{Service, ServiceConfig};
use crate::infra::storage::InMemoryPreferencesRepository;
use crate::local_client::LocalClient;

/// Wires repository, service, REST routes and the local client.
///
/// Constructed once by the host and passed to whatever needs it.
#[derive(Clone)]
pub struct CookiePreferencesModule {
    service: Arc<Service>,
}

impl CookiePreferencesModule {
    /// Module backed by the in-memory repository.
    #[must_use]
    pub fn new(config: &CookiePreferencesConfig) -> Self {
        Self::with_repository(Arc::new(InMemoryPreferencesRepository::new()), config)
    }

    #[must_use]
    pub fn with_repository(
        repo: Arc<dyn PreferencesRepository>,
        config: &CookiePreferencesConfig,
    ) -> Self {
        tracing::info!(
            max_user_id_length = config.max_user_id_length,
            "Cookie preferences module initialized"
        );
        Self {
            service: Arc::new(Service::new(repo, ServiceConfig::from(config))),
        }
    }

    #[must_use]
    pub fn service(&self) -> Arc<Service> {
        Arc::clone(&self.service)
    }

    /// Mount the REST routes onto `router`.
    #[must_use]
    pub fn register_rest(&self, router: Router) -> Router {
        routes::register_routes(router, self.service())
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn CookiePreferencesApi> {
        Arc::new(LocalClient::new(self.service()))
    }
}
