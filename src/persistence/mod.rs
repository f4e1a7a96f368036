//! Key/value persistence for small JSON records
//!
//! LocalStorage on web, one JSON file per key natively. Values are tiny (a
//! high score, a settings blob) so everything is read and written whole.

use serde::Serialize;
use serde::de::DeserializeOwned;

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

/// Environment variable overriding the native data directory
#[cfg(not(target_arch = "wasm32"))]
pub const DATA_DIR_ENV: &str = "VERTICAL_ODYSSEY_DATA";

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Storage rejected write for key {0}")]
    WriteRejected(String),
}

/// Handle to the platform's storage backend
#[derive(Debug, Clone)]
pub struct Store {
    #[cfg(not(target_arch = "wasm32"))]
    root: PathBuf,
}

impl Store {
    /// Storage for the running platform
    #[cfg(target_arch = "wasm32")]
    pub fn open_default() -> Self {
        Self {}
    }

    /// Storage for the running platform (`$VERTICAL_ODYSSEY_DATA` or `./.vertical-odyssey`)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open_default() -> Self {
        let root = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".vertical-odyssey"));
        Self { root }
    }

    /// Storage rooted at an explicit directory
    #[cfg(not(target_arch = "wasm32"))]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read a record. `Ok(None)` when nothing has been stored yet.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistError> {
        match self.read_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Write a record, replacing any previous value
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PersistError> {
        let json = serde_json::to_string(value)?;
        self.write_raw(key, &json)
    }

    #[cfg(target_arch = "wasm32")]
    fn local_storage() -> Result<web_sys::Storage, PersistError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(PersistError::Unavailable("LocalStorage not accessible"))
    }

    #[cfg(target_arch = "wasm32")]
    fn read_raw(&self, key: &str) -> Result<Option<String>, PersistError> {
        let storage = Self::local_storage()?;
        storage
            .get_item(key)
            .map_err(|_| PersistError::Unavailable("LocalStorage read failed"))
    }

    #[cfg(target_arch = "wasm32")]
    fn write_raw(&self, key: &str, json: &str) -> Result<(), PersistError> {
        let storage = Self::local_storage()?;
        storage
            .set_item(key, json)
            .map_err(|_| PersistError::WriteRejected(key.to_string()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn read_raw(&self, key: &str) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write_raw(&self, key: &str, json: &str) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.root)?;
        // Write then rename so a crash never leaves a half-written record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use tempfile::TempDir;

    /// Store rooted in a fresh temp dir; the dir is removed when the guard drops
    pub(crate) fn scratch_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::at(dir.path().join("data"));
        (dir, store)
    }

    #[test]
    fn test_missing_key_is_none() {
        let (_dir, store) = scratch_store();
        let value: Option<u64> = store.load("nothing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = scratch_store();
        store.save("answer", &42u64).unwrap();
        let value: Option<u64> = store.load("answer").unwrap();
        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_corrupt_record_is_json_error() {
        let (_dir, store) = scratch_store();
        store.save("blob", &"ok").unwrap();
        std::fs::write(store.path_for("blob"), "{ not json").unwrap();
        let err = store.load::<u64>("blob").unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
    }

    #[test]
    fn test_scratch_dir_cleaned_up() {
        let (dir, store) = scratch_store();
        store.save("answer", &1u64).unwrap();
        let root = dir.path().to_path_buf();
        assert!(store.path_for("answer").exists());
        drop(dir);
        assert!(!root.exists());
    }
}
