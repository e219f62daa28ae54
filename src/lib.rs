//! # Stowage
//!
//! Reactive state that outlives the process, and asynchronous resource
//! loading with explicit loading and error states.
//!
//! ## Persisted state
//!
//! - [`PersistedState<T>`] - a value bound to a key in a [`KeyValueStore`],
//!   restored on creation and written back on every change
//! - [`Codec`] - pluggable serialization (JSON by default)
//! - Key renames migrate the stored entry
//!
//! ## Resources
//!
//! - [`ResourceLoader`] - `idle`, `pending`, `resolved`, `rejected`, with
//!   stale responses discarded
//! - [`ErrorBoundary`] - catches rejections and resets the loader
//!
//! ## Reactive core
//!
//! - `Signal<T>` - reactive values that notify dependents when changed
//! - `Effect` - side effects that run when dependencies change
//! - `Store<T>` - shared state container with subscribers

pub mod codec;
pub mod config;
pub mod error;
pub mod persisted;
pub mod resource;
pub mod runtime;
pub mod signal;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use codec::{Codec, FnCodec, JsonCodec, RawStringCodec};
pub use config::StorageConfig;
pub use error::{CodecError, ConfigError, FetchError, LoadError, PersistError, StorageError};
pub use persisted::{create_persisted_state, DefaultValue, PersistedState};
pub use resource::{ErrorBoundary, ResourceFetcher, ResourceLoader, ResourceState, StaticFetcher};
pub use signal::{create_effect, create_signal, Effect, ReadSignal, Signal, WriteSignal};
pub use storage::{JsonFileStorage, KeyValueStore, MemoryStorage};
pub use store::Store;
