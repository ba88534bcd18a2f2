//! Synchronous key-value storage the consent client persists into.
//!
//! Mirrors the browser `localStorage` contract: string keys, string values,
//! and a change feed so other handles sharing the storage can react to writes
//! they did not make.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::fmt;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StorageError;

/// Consent tag: `all`, `essential` or `custom`.
pub const CONSENT_KEY: &str = "cookieConsent";
/// JSON-encoded `CategorySettings`.
pub const SETTINGS_KEY: &str = "cookieSettings";
/// Stable user identifier, when one exists.
pub const USER_ID_KEY: &str = "userId";
/// Onboarding record, consumed only by the banner rule.
pub const USER_DATA_KEY: &str = "userData";

pub(crate) const EVENT_CAPACITY: usize = 64;

/// Identity of one storage writer, the analogue of a browser tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin(Uuid);

impl Origin {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A write observed on the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
    pub origin: Origin,
}

pub trait LocalStorage: Send + Sync {
    /// # Errors
    /// Returns `StorageError` if the backing store cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns `StorageError` if the value cannot be persisted.
    fn set_item(&self, key: &str, value: &str, origin: Origin) -> Result<(), StorageError>;

    /// # Errors
    /// Returns `StorageError` if the removal cannot be persisted.
    fn remove_item(&self, key: &str, origin: Origin) -> Result<(), StorageError>;

    /// Feed of every write, including the subscriber's own.
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}
