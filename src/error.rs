//! Error types.
//!
//! Storage and codec failures stay local to the caller of the persisted-state
//! API. Fetch failures travel through the loader state to an error boundary.

use std::path::PathBuf;

/// Failure of a key-value storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is not a JSON string map: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure converting between a value and its stored string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("cannot serialize value: {0}")]
    Serialize(String),
    #[error("cannot deserialize value: {0}")]
    Deserialize(String),
}

/// Errors raised by a persisted-state binding.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("storage key must not be empty")]
    EmptyKey,
    #[error("stored value under {key:?} cannot be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },
    #[error("value for {key:?} cannot be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A rejected resource fetch. Displays as its message and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while viewing a resource loader's state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The loader state broke one of its invariants; this is a logic bug.
    #[error("impossible loader state: {0}")]
    ImpossibleState(String),
}

/// Invalid storage configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown storage backend {0:?} (expected \"memory\" or \"file\")")]
    UnknownBackend(String),
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}
