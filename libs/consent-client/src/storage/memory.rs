use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::{EVENT_CAPACITY, LocalStorage, Origin, StorageEvent};
use crate::error::StorageError;

/// Process-local storage. Share one `Arc<MemoryStorage>` between clients to
/// model several tabs of the same site.
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: RwLock::new(HashMap::new()),
            events,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn notify(&self, key: &str, new_value: Option<String>, origin: Origin) {
        // No subscribers is fine
        let _ = self.events.send(StorageEvent {
            key: key.to_owned(),
            new_value,
            origin,
        });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str, origin: Origin) -> Result<(), StorageError> {
        self.items.write().insert(key.to_owned(), value.to_owned());
        self.notify(key, Some(value.to_owned()), origin);
        Ok(())
    }

    fn remove_item(&self, key: &str, origin: Origin) -> Result<(), StorageError> {
        let removed = self.items.write().remove(key);
        if removed.is_some() {
            self.notify(key, None, origin);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
