//! File-backed key/value store.
//!
//! The file is a single JSON object mapping keys to arbitrary JSON values,
//! the same shape a browser's local storage would hold. A missing file reads
//! as empty. Writes go to a sibling temp file that is then renamed over the
//! original.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access store '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store '{path}' is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("value under key '{key}' has an unexpected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct LocalStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    pub fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);
        self.write_all(&all)
    }

    /// Returns `true` if the key existed.
    pub fn remove_item(&self, key: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock();
        let mut all = self.read_all()?;
        let existed = all.remove(key).is_some();
        if existed {
            self.write_all(&all)?;
        }
        Ok(existed)
    }

    /// Decode the value under `key`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_item(key)? {
            Some(value) => decode(key, value).map(Some),
            None => Ok(None),
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.set_item(key, encode(key, value)?)
    }

    /// Read-modify-write the value under `key` while holding the store lock.
    ///
    /// A missing key starts from `T::default()`. The value is written back
    /// after `f` returns, whatever `f` did to it.
    pub fn update<T, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let _guard = self.lock.lock();
        let mut all = self.read_all()?;
        let mut value: T = match all.remove(key) {
            Some(v) => decode(key, v)?,
            None => T::default(),
        };
        let out = f(&mut value);
        all.insert(key.to_string(), encode(key, &value)?);
        self.write_all(&all)?;
        Ok(out)
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, all: &Map<String, Value>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_vec_pretty(all).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(path = %self.path.display(), keys = all.len(), "wrote store");
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Shape {
        key: key.to_string(),
        source,
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Shape {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"));
        assert_eq!(store.get_item("reviews").unwrap(), None);
        assert_eq!(store.load::<Vec<String>>("reviews").unwrap(), None);
    }

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("nested/store.json"));

        store.set_item("theme", json!("dark")).unwrap();
        store.save("reviews", &vec![1, 2, 3]).unwrap();
        assert_eq!(store.get_item("theme").unwrap(), Some(json!("dark")));
        assert_eq!(store.load::<Vec<i32>>("reviews").unwrap(), Some(vec![1, 2, 3]));

        assert!(store.remove_item("theme").unwrap());
        assert!(!store.remove_item("theme").unwrap());
        assert_eq!(store.get_item("theme").unwrap(), None);

        // Another handle on the same file sees the persisted state.
        let reopened = LocalStore::open(store.path());
        assert_eq!(reopened.load::<Vec<i32>>("reviews").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn update_starts_from_default_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"));

        let len = store
            .update("reviews", |v: &mut Vec<String>| {
                v.push("a".to_string());
                v.len()
            })
            .unwrap();
        assert_eq!(len, 1);
        store
            .update("reviews", |v: &mut Vec<String>| v.push("b".to_string()))
            .unwrap();
        assert_eq!(
            store.load::<Vec<String>>("reviews").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();
        let store = LocalStore::open(&path);
        assert!(matches!(store.get_item("x"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn wrong_shape_is_reported_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json"));
        store.set_item("reviews", json!({"not": "a list"})).unwrap();
        let err = store.load::<Vec<String>>("reviews").unwrap_err();
        assert!(matches!(err, StoreError::Shape { key, .. } if key == "reviews"));
    }
}
