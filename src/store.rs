use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::StorageError;

pub const DATA_KEY: &str = "tabdesk_data_v2";
pub const LAYOUT_KEY: &str = "tabdesk_layout_v2";
pub const PREFS_KEY: &str = "tabdesk_prefs_v2";
pub const STATS_KEY: &str = "tabdesk_stats_v1";
pub const ACTIVE_WIDGETS_KEY: &str = "tabdesk_active_widgets";
pub const BACKUP_KEY: &str = "tabdesk_backup_before_import";
pub const RECENT_EMOJIS_KEY: &str = "tabdesk_recent_emojis";
pub const POMODORO_DATE_KEY: &str = "tabdesk_pomodoro_date";
pub const POMODORO_SESSIONS_KEY: &str = "tabdesk_pomodoro_sessions";

pub const LEGACY_DATA_KEY: &str = "devspace_data_v2";
pub const LEGACY_LAYOUT_KEY: &str = "devspace_layout_v2";
pub const LEGACY_PREFS_KEY: &str = "devspace_prefs_v2";

/// String-to-string persistent namespace. Every document is stored whole
/// under one key; there are no partial updates.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DirStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_store_persists_between_handles() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        store.set(DATA_KEY, "{\"notes\":\"hi\"}").unwrap();

        let reopened = DirStore::open(tmp.path()).unwrap();
        assert_eq!(
            reopened.get(DATA_KEY).unwrap().as_deref(),
            Some("{\"notes\":\"hi\"}")
        );
        assert_eq!(reopened.keys().unwrap(), vec![DATA_KEY.to_string()]);
    }

    #[test]
    fn dir_store_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        let err = store.set("../escape", "x").unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn clear_removes_every_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear().unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(!store.contains("a").unwrap());
    }

    #[test]
    fn memory_store_remove_missing_is_ok() {
        let mut store = MemoryStore::new();
        store.remove("nothing").unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
