//! Persisted client state.
//!
//! A handful of stores survive restarts by writing JSON snapshots under fixed
//! keys. This is a cache: the API stays authoritative and a missing or
//! unreadable snapshot is treated as empty.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Storage keys used by the stores.
pub mod keys {
    /// UI preferences (locale, page size).
    pub const MAIN_STORE: &str = "main-store";
    /// Catalog filter metadata.
    pub const DATA_STORE: &str = "data-store";
    /// Navigation menu and categories.
    pub const MENU_STORE: &str = "menu-store";
    /// Session tokens and the signed-in user.
    pub const USERS_STORE: &str = "users-store";
}

/// Errors from a [`StateStorage`] backend.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value storage for serialized snapshots.
#[async_trait]
pub trait StateStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistError>;
    async fn write(&self, key: &str, value: String) -> Result<(), PersistError>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), PersistError>;
}

/// Process-local storage, used when no state directory is configured.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StateStorage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: String) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // Write-then-rename so a crash never leaves a half-written snapshot
        let target = self.path_for(key);
        let temp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&temp, value).await?;
        tokio::fs::rename(&temp, &target).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Typed access to one key of a [`StateStorage`].
///
/// Failures are logged and swallowed: persistence is best effort.
pub struct Persisted<T> {
    storage: Arc<dyn StateStorage>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Persisted<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Persisted<T> {
    #[must_use]
    pub fn new(storage: Arc<dyn StateStorage>, key: &'static str) -> Self {
        Self {
            storage,
            key,
            _marker: PhantomData,
        }
    }

    /// Load the snapshot, or `None` if absent or unreadable.
    pub async fn load(&self) -> Option<T> {
        let raw = match self.storage.read(self.key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = self.key, error = %e, "Failed to read persisted state");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = self.key, error = %e, "Discarding unreadable persisted state");
                None
            }
        }
    }

    /// Replace the snapshot.
    pub async fn save(&self, value: &T) {
        let result = match serde_json::to_string(value) {
            Ok(json) => self.storage.write(self.key, json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(key = self.key, error = %e, "Failed to persist state");
        }
    }

    /// Delete the snapshot.
    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove(self.key).await {
            warn!(key = self.key, error = %e, "Failed to clear persisted state");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        locale: String,
    }

    #[tokio::test]
    async fn test_memory_round_trip_and_clear() {
        let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
        let prefs = Persisted::<Prefs>::new(Arc::clone(&storage), keys::MAIN_STORE);
        assert!(prefs.load().await.is_none());

        prefs
            .save(&Prefs {
                locale: "uk".to_string(),
            })
            .await;
        assert_eq!(prefs.load().await.unwrap().locale, "uk");

        prefs.clear().await;
        assert!(prefs.load().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .write(keys::MAIN_STORE, "{not json".to_string())
            .await
            .unwrap();
        let prefs = Persisted::<Prefs>::new(storage, keys::MAIN_STORE);
        assert!(prefs.load().await.is_none());
    }

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("vitrine-persist-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir);

        assert!(storage.read(keys::MENU_STORE).await.unwrap().is_none());
        storage
            .write(keys::MENU_STORE, "{\"items\":[]}".to_string())
            .await
            .unwrap();
        assert_eq!(
            storage.read(keys::MENU_STORE).await.unwrap().as_deref(),
            Some("{\"items\":[]}")
        );
        assert!(dir.join("menu-store.json").exists());

        storage.remove(keys::MENU_STORE).await.unwrap();
        storage.remove(keys::MENU_STORE).await.unwrap();
        assert!(storage.read(keys::MENU_STORE).await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(dir);
    }
}
