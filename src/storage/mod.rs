//! Key-value string storage backing persisted state.
//!
//! Backends are synchronous from the caller's perspective and hold opaque
//! string values. At most one value exists per key.

mod file;
mod memory;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;
use std::sync::Arc;

/// A synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the entry under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Namespaces every key of an inner store with a fixed prefix.
#[derive(Debug, Clone)]
pub struct PrefixedStorage<S> {
    prefix: String,
    inner: S,
}

impl<S: KeyValueStore> PrefixedStorage<S> {
    pub fn new(prefix: impl Into<String>, inner: S) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl<S: KeyValueStore> KeyValueStore for PrefixedStorage<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(&self.full_key(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(&self.full_key(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(&self.full_key(key))
    }
}
