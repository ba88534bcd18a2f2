use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tokio::sync::broadcast;

use super::{EVENT_CAPACITY, LocalStorage, Origin, StorageEvent};
use crate::error::StorageError;

/// Storage persisted as one JSON object on disk.
///
/// Every write rewrites the whole file through a temp file in the same
/// directory followed by a rename, so readers never see a partial document.
/// The in-memory map is the source of truth for reads.
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl FileStorage {
    /// Open `path`, loading existing content.
    ///
    /// A missing or empty file starts empty. A file that is not a JSON object
    /// of strings is moved aside to `<name>.corrupt` and storage starts empty,
    /// which reads as "no decision".
    ///
    /// # Errors
    /// Returns `StorageError::Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "discarding unreadable consent storage"
                    );
                    quarantine(&path);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = items.len(), "opened consent storage");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            path,
            items: Mutex::new(items),
            events,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, items)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn notify(&self, key: &str, new_value: Option<String>, origin: Origin) {
        let _ = self.events.send(StorageEvent {
            key: key.to_owned(),
            new_value,
            origin,
        });
    }
}

/// Path the unreadable file is moved to.
fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

fn quarantine(path: &Path) {
    let target = corrupt_path(path);
    if let Err(e) = std::fs::rename(path, &target) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to move unreadable consent storage aside"
        );
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str, origin: Origin) -> Result<(), StorageError> {
        {
            let mut items = self.items.lock();
            let previous = items.insert(key.to_owned(), value.to_owned());
            if let Err(e) = self.persist(&items) {
                // Keep memory and disk in agreement
                match previous {
                    Some(old) => items.insert(key.to_owned(), old),
                    None => items.remove(key),
                };
                return Err(e);
            }
        }
        self.notify(key, Some(value.to_owned()), origin);
        Ok(())
    }

    fn remove_item(&self, key: &str, origin: Origin) -> Result<(), StorageError> {
        {
            let mut items = self.items.lock();
            let Some(previous) = items.remove(key) else {
                return Ok(());
            };
            if let Err(e) = self.persist(&items) {
                items.insert(key.to_owned(), previous);
                return Err(e);
            }
        }
        self.notify(key, None, origin);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
