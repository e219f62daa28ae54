//! Storage configuration from the environment.
//!
//! | variable               | meaning                               | default        |
//! |------------------------|---------------------------------------|----------------|
//! | `STOWAGE_STORAGE`      | `memory` or `file`                    | `memory`       |
//! | `STOWAGE_STORAGE_PATH` | JSON file used by the `file` backend  | `stowage.json` |
//! | `STOWAGE_KEY_PREFIX`   | prefix prepended to every key         | none           |

use crate::error::{ConfigError, PersistError};
use crate::storage::{JsonFileStorage, KeyValueStore, MemoryStorage, PrefixedStorage};
use std::path::PathBuf;
use std::sync::Arc;

pub const STORAGE_VAR: &str = "STOWAGE_STORAGE";
pub const STORAGE_PATH_VAR: &str = "STOWAGE_STORAGE_PATH";
pub const KEY_PREFIX_VAR: &str = "STOWAGE_KEY_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub key_prefix: Option<String>,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("stowage.json")
}

impl StorageConfig {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let backend = match lookup(STORAGE_VAR).as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StorageBackend::Memory,
            Some("file") => {
                let path = match lookup(STORAGE_PATH_VAR) {
                    Some(path) if path.trim().is_empty() => {
                        return Err(ConfigError::Empty {
                            name: STORAGE_PATH_VAR,
                        })
                    }
                    Some(path) => PathBuf::from(path.trim()),
                    None => default_storage_path(),
                };
                StorageBackend::File(path)
            }
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let key_prefix = lookup(KEY_PREFIX_VAR).filter(|prefix| !prefix.is_empty());

        Ok(Self {
            backend,
            key_prefix,
        })
    }

    /// Open the configured storage.
    pub fn open(&self) -> Result<Arc<dyn KeyValueStore>, PersistError> {
        let base: Arc<dyn KeyValueStore> = match &self.backend {
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
            StorageBackend::File(path) => Arc::new(JsonFileStorage::open(path)?),
        };
        tracing::info!(backend = ?self.backend, prefix = ?self.key_prefix, "storage opened");

        Ok(match &self.key_prefix {
            Some(prefix) => Arc::new(PrefixedStorage::new(prefix.clone(), base)),
            None => base,
        })
    }
}
