//! Local-first cookie consent client.
//!
//! [`ConsentClient`] keeps a visitor's consent decision in a [`LocalStorage`]
//! and reconciles it with the preference store through any
//! [`CookiePreferencesApi`] implementation: [`HttpPreferencesClient`] for a
//! remote store, or the module's in-process client.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use consent_client::{Category, ConsentClient, FileStorage, HttpPreferencesClient};
//!
//! let storage = Arc::new(FileStorage::open("consent.json")?);
//! let remote = Arc::new(HttpPreferencesClient::from_env()?);
//! let client = ConsentClient::builder(storage).remote(remote).init().await;
//!
//! if client.should_show_banner() {
//!     client.accept_all().await?;
//! }
//! let track = client.is_allowed(Category::Analytics);
//! # let _ = track;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consent;
pub mod cookies;
pub mod error;
pub mod events;
pub mod http;
pub mod onboarding;
pub mod storage;

#[cfg(test)]
mod consent_test;

pub use config::ConsentClientConfig;
pub use consent::{ConsentClient, ConsentClientBuilder, ConsentSnapshot, LoadOutcome, RemoteSync};
pub use cookies::{CookieDirective, CookieJar, MemoryCookieJar, apply_consented_cookies};
pub use error::{ClientError, StorageError};
pub use events::ConsentEvent;
pub use http::HttpPreferencesClient;
pub use onboarding::{OnboardingProfile, should_show_banner};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, Origin, StorageEvent};

pub use cookie_preferences_sdk::{
    Category, CategorySettings, ConsentKind, CookiePreferencesApi, CookiePreferencesError,
    CookieSettings, CookieSettingsUpdate,
};
