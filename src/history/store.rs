//! Key-value persistence used for history and the rename pattern.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use serde_json::Value;
use tracing::debug;

use crate::utils::{ConverterError, ConverterResult};

/// Key holding the history list, newest first
pub const HISTORY_KEY: &str = "imgc_history";
/// Key holding the rename pattern string (or null)
pub const RENAME_KEY: &str = "imgc_rename";

/// Minimal get/set contract. No schema migration.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ConverterResult<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> ConverterResult<()>;
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ConverterResult<Option<Value>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> ConverterResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk, rewritten on every set.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<serde_json::Map<String, Value>>,
}

impl JsonFileStore {
    /// Opens the store, reading existing contents. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> ConverterResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&raw)? {
                Value::Object(map) => map,
                other => {
                    return Err(ConverterError::store(format!(
                        "{} does not hold a JSON object (found {other})",
                        path.display()
                    )));
                }
            }
        } else {
            serde_json::Map::new()
        };
        debug!("Opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> ConverterResult<Option<Value>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> ConverterResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(&*entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(RENAME_KEY).unwrap(), None);
        store.set(RENAME_KEY, json!("{name}-{n}")).unwrap();
        assert_eq!(store.get(RENAME_KEY).unwrap(), Some(json!("{name}-{n}")));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set(HISTORY_KEY, json!([{"id": "a"}])).unwrap();
        store.set(RENAME_KEY, Value::Null).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get(HISTORY_KEY).unwrap(), Some(json!([{"id": "a"}])));
        assert_eq!(reopened.get(RENAME_KEY).unwrap(), Some(Value::Null));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(ConverterError::Store(_))));
    }
}
