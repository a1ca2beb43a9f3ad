use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::error::DatamartError;

pub const BOOKMARKS_KEY: &str = "bookmarkedDatasets";

/// Small durable key-value surface standing in for browser local storage.
///
/// The storage medium is swappable: [`FileStore`] persists under the user's
/// home directory, [`MemoryStore`] backs tests and ephemeral sessions.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, DatamartError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DatamartError>;
    fn remove(&self, key: &str) -> Result<(), DatamartError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, DatamartError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatamartError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), DatamartError> {
        (**self).remove(key)
    }
}

/// One JSON file per key, written atomically (tmp file + rename).
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Utf8PathBuf,
}

impl FileStore {
    pub fn new() -> Result<Self, DatamartError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".config").join("datamart")).ok()
            })
            .ok_or_else(|| {
                DatamartError::Filesystem("unable to resolve config directory".to_string())
            })?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn ensure_root(&self) -> Result<(), DatamartError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| DatamartError::Filesystem(err.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatamartError> {
        let path = self.key_path(key);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        fs::read_to_string(path.as_std_path())
            .map(Some)
            .map_err(|err| DatamartError::Filesystem(err.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatamartError> {
        self.ensure_root()?;
        let path = self.key_path(key);
        let temp = tempfile::Builder::new()
            .prefix("datamart-kv")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| DatamartError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), value.as_bytes())
            .map_err(|err| DatamartError::Filesystem(err.to_string()))?;
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| DatamartError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| DatamartError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DatamartError> {
        let path = self.key_path(key);
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| DatamartError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatamartError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| DatamartError::Filesystem("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatamartError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DatamartError::Filesystem("store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DatamartError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DatamartError::Filesystem("store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Locally persisted bookmark list, stored as a JSON array of dataset ids.
pub struct Bookmarks<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> Bookmarks<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<String>, DatamartError> {
        match self.store.get(BOOKMARKS_KEY)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|err| DatamartError::SessionCorrupt(err.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn contains(&self, dataset_id: &str) -> Result<bool, DatamartError> {
        Ok(self.list()?.iter().any(|id| id == dataset_id))
    }

    /// Adds the id when absent, removes it when present. Returns the new
    /// bookmarked state.
    pub fn toggle(&self, dataset_id: &str) -> Result<bool, DatamartError> {
        let mut ids = self.list().unwrap_or_default();
        let bookmarked = if let Some(index) = ids.iter().position(|id| id == dataset_id) {
            ids.remove(index);
            false
        } else {
            ids.push(dataset_id.to_string());
            true
        };
        let raw = serde_json::to_string(&ids)
            .map_err(|err| DatamartError::Filesystem(err.to_string()))?;
        self.store.set(BOOKMARKS_KEY, &raw)?;
        Ok(bookmarked)
    }
}
