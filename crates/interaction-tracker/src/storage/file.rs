//! File-per-key store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::config::default_storage_dir;
use crate::error::StorageError;

/// Stores each key as `<dir>/<key>.json`, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (or create) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|source| StorageError::io("creating storage directory", &dir, source))?;
        Ok(Self { dir })
    }

    /// Open the store in the platform's local data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = default_storage_dir().ok_or_else(|| {
            StorageError::Backend("no local data directory on this platform".to_string())
        })?;
        Self::open(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys map one-to-one onto file names: ASCII alphanumerics and `-_.`
    /// are kept, every other byte (including `%`) becomes `%XX`.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut file_name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
                file_name.push(byte as char);
            } else {
                file_name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::io("reading value", path, source)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|source| StorageError::io("writing temporary value", &tmp, source))?;
        fs::rename(&tmp, &path)
            .map_err(|source| StorageError::io("replacing value", &path, source))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::io("removing value", path, source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get_item("interaction_events").unwrap(), None);
        store.set_item("interaction_events", "[]").unwrap();
        assert_eq!(
            store.get_item("interaction_events").unwrap().as_deref(),
            Some("[]")
        );
        assert!(dir.path().join("interaction_events.json").exists());
        assert!(!dir.path().join("interaction_events.json.tmp").exists());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::open(dir.path())
            .unwrap()
            .set_item("k", "value")
            .unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get_item("k").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn test_keys_are_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set_item("../escape", "x").unwrap();
        assert!(dir.path().join("..%2Fescape.json").exists());
        assert_eq!(store.get_item("../escape").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let keys = ["a/b", "a_b", "a%2Fb", "a b", "a\u{e9}b"];
        for (i, key) in keys.iter().enumerate() {
            store.set_item(key, &i.to_string()).unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(store.get_item(key).unwrap(), Some(i.to_string()));
        }
        assert!(dir.path().join("a%C3%A9b.json").exists());
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();
        store.remove_item("never-written").unwrap();
    }
}
