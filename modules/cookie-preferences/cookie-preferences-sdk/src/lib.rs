//! Cookie Preferences SDK
//!
//! This crate defines the public contract of the `cookie-preferences` module:
//! - `CookiePreferencesApi` trait implemented by the in-process client and the HTTP client
//! - Models (`CookieSettings`, `CategorySettings`, `ConsentKind`, `Category`)
//! - `CookiePreferencesError` shared by every implementation

pub mod api;
pub mod error;
pub mod models;

pub use api::CookiePreferencesApi;
pub use error::CookiePreferencesError;
pub use models::{
    ANONYMOUS_USER_ID, Category, CategorySettings, ConsentKind, CookieSettings,
    CookieSettingsUpdate, UnknownVariant,
};
