use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::atomic_io::write_text_atomic;
use super::storage_keys::{validate_storage_key, StorageKeyError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("storage I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    InvalidKey(#[from] StorageKeyError),
}

/// Key/value text store for world documents.
pub trait WorldStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_storage_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl WorldStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        write_text_atomic(&path, value).map_err(|source| StorageError::Io { path, source })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// In-memory storage with an optional byte quota across all keys, matching
/// how browser local storage refuses oversized writes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
    write_count: usize,
}

impl MemoryStorage {
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    pub fn set_quota(&mut self, quota_bytes: Option<usize>) {
        self.quota_bytes = quota_bytes;
    }

    pub fn write_count(&self) -> usize {
        self.write_count
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, value)| existing.len() + value.len())
            .sum()
    }
}

impl WorldStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_storage_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_storage_key(key)?;
        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_excluding(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.write_count += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        validate_storage_key(key)?;
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn file_storage_round_trips_and_reports_missing_keys() {
        let temp = TempDir::new().expect("temp");
        let mut storage = FileStorage::new(temp.path().join("saves"));

        assert_eq!(storage.read("world_state").expect("read"), None);
        storage.write("world_state", "{}").expect("write");
        assert_eq!(
            storage.read("world_state").expect("read"),
            Some("{}".to_string())
        );
        assert!(temp.path().join("saves").join("world_state.json").is_file());

        storage.remove("world_state").expect("remove");
        storage.remove("world_state").expect("remove twice");
        assert_eq!(storage.read("world_state").expect("read"), None);
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let temp = TempDir::new().expect("temp");
        let mut storage = FileStorage::new(temp.path());
        let err = storage.write("../escape", "x").expect_err("invalid key");
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn memory_storage_enforces_quota_across_keys() {
        let mut storage = MemoryStorage::with_quota(20);
        storage.write("a", "0123456789").expect("fits");
        let err = storage.write("b", "0123456789").expect_err("over quota");
        match err {
            StorageError::QuotaExceeded { needed, quota } => {
                assert_eq!(needed, 22);
                assert_eq!(quota, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
        // overwriting the same key only counts the new value
        storage.write("a", "0123456789abcdefg").expect("replace fits");
        assert_eq!(storage.write_count(), 2);
    }
}
