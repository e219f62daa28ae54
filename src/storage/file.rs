use super::KeyValueStore;
use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON file-backed key-value store.
///
/// The whole map lives in memory and is rewritten to disk after every
/// mutation, so entries survive process restarts. A missing file is treated
/// as an empty store and created on first load.
#[derive(Debug)]
pub struct JsonFileStorage {
    entries: Mutex<BTreeMap<String, String>>,
    file_path: PathBuf,
}

impl JsonFileStorage {
    /// Open the store at `path`, creating parent directories and the file if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let entries = match fs::read(&file_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
                path: file_path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let empty = BTreeMap::new();
                write_map(&file_path, &empty)?;
                empty
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: file_path,
                    source,
                })
            }
        };

        tracing::debug!(path = %file_path.display(), "opened json file storage");
        Ok(Self {
            entries: Mutex::new(entries),
            file_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn mutate<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        f(&mut next);
        // Memory only changes once the file write succeeded.
        write_map(&self.file_path, &next)?;
        *entries = next;
        Ok(())
    }
}

fn write_map(path: &Path, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(map).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, data).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl KeyValueStore for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.entries.lock().contains_key(key) {
            return Ok(());
        }
        self.mutate(|map| {
            map.remove(key);
        })
    }
}
