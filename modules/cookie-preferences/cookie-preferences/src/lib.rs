//! Cookie Preferences Module Implementation
//!
//! The public API is defined in `cookie-preferences-sdk` and re-exported here.

pub use cookie_preferences_sdk::{
    CookiePreferencesApi, CookiePreferencesError, CookieSettings, CookieSettingsUpdate,
};

pub mod config;
pub use config::CookiePreferencesConfig;

pub mod module;
pub use module::CookiePreferencesModule;

pub mod local_client;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
