//! State that survives across sessions.
//!
//! A [`PersistedState`] binds a reactive value to an entry in a
//! [`KeyValueStore`](crate::storage::KeyValueStore). It reads the entry once,
//! falling back to a [`DefaultValue`], and writes the value back whenever it
//! changes. Renaming the key migrates the entry.

mod default_value;
mod state;

pub use default_value::DefaultValue;
pub use state::{create_persisted_state, PersistedState, PersistedStateBuilder};
