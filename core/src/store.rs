//! Key-value persistence for user configuration.
//!
//! The engine never touches storage itself; front ends persist the rule
//! source, keybindings and configuration under versioned keys through a
//! [`KeyValueStore`]. Two backends:
//! - `MemoryStore`: thread-safe map, used by tests and ephemeral sessions
//! - `RedbStore`: a `redb` database with a single `settings` table
//!
//! Keys carry a version suffix. Entries under older keys are ignored, never
//! migrated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use redb::ReadableTable;
use thiserror::Error;

/// Rule source document (TOML, see `source`).
pub const MACROS_SOURCE_KEY: &str = "texflow_macros_source_v3";
/// Keybindings as JSON (see `Keymap::to_json`).
pub const KEYBINDINGS_KEY: &str = "texflow_keybindings_v1";
/// Engine configuration as TOML.
pub const CONFIG_KEY: &str = "texflow_config_v1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Redb(#[from] redb::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// String-to-string persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Remove `key`. Returns whether it was present.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

/// In-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all entries.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().map(|map| map.clone()).unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(key).is_some())
    }
}

/// Persistent store backed by `redb`.
pub struct RedbStore {
    db: redb::Database,
    path: PathBuf,
}

impl RedbStore {
    const TABLE_DEF: redb::TableDefinition<'static, &'static str, &'static str> =
        redb::TableDefinition::new("settings");

    /// Create or open a database at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!(%err, path = %parent.display(), "cannot create store directory");
            }
        }
        let db = redb::Database::create(path).map_err(redb::Error::from)?;
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, key: &str) -> Result<Option<String>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(Self::TABLE_DEF) {
            Ok(table) => table,
            // nothing has been written yet
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(table.get(key)?.map(|guard| guard.value().to_string()))
    }

    fn write(&self, key: &str, value: Option<&str>) -> Result<bool, redb::Error> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(Self::TABLE_DEF)?;
            match value {
                Some(value) => table.insert(key, value)?.is_some(),
                None => table.remove(key)?.is_some(),
            }
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let list = || -> Result<Vec<String>, redb::Error> {
            let read_txn = self.db.begin_read()?;
            let table = match read_txn.open_table(Self::TABLE_DEF) {
                Ok(table) => table,
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            };
            let mut out = Vec::new();
            for item in table.iter()? {
                let (k, _) = item?;
                out.push(k.value().to_string());
            }
            Ok(out)
        };
        Ok(list()?)
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key).map_err(|err| {
            tracing::warn!(%err, key, "store read failed");
            StoreError::from(err)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write(key, Some(value)).map(|_| ()).map_err(|err| {
            tracing::warn!(%err, key, "store write failed");
            StoreError::from(err)
        })
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.write(key, None).map_err(|err| {
            tracing::warn!(%err, key, "store remove failed");
            StoreError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(CONFIG_KEY).unwrap(), None);
        store.set(CONFIG_KEY, "force_math = true").unwrap();
        assert_eq!(store.get(CONFIG_KEY).unwrap().as_deref(), Some("force_math = true"));
        assert!(store.remove(CONFIG_KEY).unwrap());
        assert!(!store.remove(CONFIG_KEY).unwrap());
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.snapshot().get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_redb_store_reads_none_before_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("settings.redb")).unwrap();
        assert_eq!(store.get(MACROS_SOURCE_KEY).unwrap(), None);
        assert!(store.keys().unwrap().is_empty());
    }
}
