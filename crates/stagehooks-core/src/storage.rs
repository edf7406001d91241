//! Text blob stores used to mirror persistent state.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub trait BlobStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Which of the game's blob stores a persistent handle writes to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Cleared when the process context goes away.
    Session,
    /// Survives restarts.
    #[default]
    Durable,
}

/// In-memory store. With a quota, writes that would push the total size of
/// keys and values past it fail.
#[derive(Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: RefCell::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }

    fn used_without(&self, key: &str) -> usize {
        self.items
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl BlobStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::Quota { needed, limit });
            }
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Durable store: one JSON object file mapping keys to text blobs.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/stagehooks.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("stagehooks.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl BlobStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.store(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.store(&items)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path().join("saves"));
        assert_eq!(storage.get_item("slot1").unwrap(), None);

        storage.set_item("slot1", "{\"level\":3}").unwrap();
        storage.set_item("slot2", "[]").unwrap();
        assert_eq!(storage.get_item("slot1").unwrap().as_deref(), Some("{\"level\":3}"));

        storage.remove_item("slot1").unwrap();
        let reopened = FileStorage::new(storage.path());
        assert_eq!(reopened.get_item("slot1").unwrap(), None);
        assert_eq!(reopened.get_item("slot2").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn memory_quota_counts_keys_and_values() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("a", "12345").unwrap();
        // replacing a key only counts its new size
        storage.set_item("a", "123456789").unwrap();

        let err = storage.set_item("b", "1").unwrap_err();
        assert!(matches!(err, StorageError::Quota { needed: 12, limit: 10 }));
        assert_eq!(storage.get_item("b").unwrap(), None);

        storage.remove_item("a").unwrap();
        storage.set_item("b", "1").unwrap();
    }
}
