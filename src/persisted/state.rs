use super::DefaultValue;
use crate::codec::{Codec, JsonCodec};
use crate::error::{CodecError, PersistError};
use crate::signal::{Effect, ReadSignal, Signal, WriteSignal};
use crate::storage::KeyValueStore;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The codec in use, tagged with a version bumped on every swap so the
/// reconciler can tell codecs apart.
struct CodecSlot<T> {
    version: u64,
    codec: Arc<dyn Codec<T>>,
}

impl<T> Clone for CodecSlot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            codec: Arc::clone(&self.codec),
        }
    }
}

/// A `(key, codec, encoded value)` combination already written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reconciled {
    key: String,
    codec_version: u64,
    raw: String,
}

#[derive(Debug, Default)]
struct Tracking {
    initialized: bool,
    // Key whose entry is owned by this binding; removed once the key changes.
    previous_key: String,
    last: Option<Reconciled>,
    error: Option<PersistError>,
}

/// Storage-side bookkeeping of one persisted value.
struct Binding {
    storage: Arc<dyn KeyValueStore>,
    tracking: Mutex<Tracking>,
}

impl Binding {
    fn reconcile(&self, key: String, codec_version: u64, encoded: Result<String, CodecError>) {
        let mut tracking = self.tracking.lock();

        if !tracking.initialized {
            // The value was just resolved from storage or the default; nothing to write.
            tracking.initialized = true;
            tracking.previous_key = key.clone();
            tracking.last = encoded.ok().map(|raw| Reconciled {
                key,
                codec_version,
                raw,
            });
            return;
        }

        let raw = match encoded {
            Ok(raw) => raw,
            Err(source) => {
                tracing::warn!(%key, error = %source, "cannot encode persisted value");
                tracking.error = Some(PersistError::Encode { key, source });
                return;
            }
        };
        let next = Reconciled {
            key,
            codec_version,
            raw,
        };
        if tracking.last.as_ref() == Some(&next) {
            tracing::trace!(key = %next.key, "persisted value unchanged");
            return;
        }

        match self.write(&tracking.previous_key, &next) {
            Ok(()) => {
                tracking.previous_key = next.key.clone();
                tracking.last = Some(next);
            }
            Err(err) => {
                tracing::warn!(key = %next.key, error = %err, "cannot persist value");
                tracking.error = Some(err);
            }
        }
    }

    fn write(&self, previous_key: &str, next: &Reconciled) -> Result<(), PersistError> {
        if previous_key != next.key {
            self.storage.remove(previous_key)?;
            tracing::debug!(from = %previous_key, to = %next.key, "migrated persisted key");
        }
        self.storage.set(&next.key, &next.raw)?;
        tracing::debug!(key = %next.key, "persisted value written");
        Ok(())
    }
}

/// A value whose canonical copy lives in a [`KeyValueStore`].
///
/// The value is resolved once on creation: decoded from the entry under
/// `key`, or taken from the default when no entry exists. Afterwards every
/// change to the value, key or codec is written back through an effect.
/// The first resolution never writes, and dropping the state leaves the
/// stored entry in place.
///
/// ```
/// use stowage::persisted::create_persisted_state;
/// use stowage::storage::{KeyValueStore, MemoryStorage};
///
/// let storage = MemoryStorage::new();
/// let name = create_persisted_state(storage.clone(), "name", String::from("Andy")).unwrap();
/// assert_eq!(name.get(), "Andy");
/// assert_eq!(storage.get("name").unwrap(), None);
///
/// name.set("Kent".to_string());
/// assert_eq!(storage.get("name").unwrap().as_deref(), Some("\"Kent\""));
/// ```
pub struct PersistedState<T> {
    value: Signal<T>,
    key: Signal<String>,
    codec: Signal<CodecSlot<T>>,
    binding: Arc<Binding>,
    _effect: Effect,
}

impl<T> PersistedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Builder using the JSON codec.
    pub fn builder(key: impl Into<String>) -> PersistedStateBuilder<T>
    where
        T: Serialize + DeserializeOwned,
    {
        Self::with_codec(key, JsonCodec)
    }

    /// Builder using a custom codec.
    pub fn with_codec<C>(key: impl Into<String>, codec: C) -> PersistedStateBuilder<T>
    where
        C: Codec<T> + 'static,
    {
        PersistedStateBuilder {
            key: key.into(),
            codec: Arc::new(codec),
            default: None,
        }
    }

    fn initialize(
        storage: Arc<dyn KeyValueStore>,
        key: String,
        codec: Arc<dyn Codec<T>>,
        default: DefaultValue<T>,
    ) -> Result<Self, PersistError> {
        if key.is_empty() {
            return Err(PersistError::EmptyKey);
        }

        let initial = match storage.get(&key)? {
            Some(raw) => {
                let value = codec
                    .deserialize(&raw)
                    .map_err(|source| PersistError::Decode {
                        key: key.clone(),
                        source,
                    })?;
                tracing::debug!(%key, "restored persisted value");
                value
            }
            None => {
                tracing::debug!(%key, "no stored entry, using default");
                default.resolve()
            }
        };

        let binding = Arc::new(Binding {
            storage,
            tracking: Mutex::new(Tracking::default()),
        });
        let value = Signal::new(initial);
        let key = Signal::new(key);
        let codec = Signal::new(CodecSlot { version: 0, codec });

        let effect = Effect::new({
            let binding = Arc::clone(&binding);
            let value = value.clone();
            let key = key.clone();
            let codec = codec.clone();
            move || {
                let key = key.get();
                let slot = codec.get();
                let encoded = value.with(|v| slot.codec.serialize(v));
                binding.reconcile(key, slot.version, encoded);
            }
        });

        Ok(Self {
            value,
            key,
            codec,
            binding,
            _effect: effect,
        })
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Read the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(f)
    }

    /// Replace the value; the new value is written to storage.
    pub fn set(&self, value: T) {
        self.value.set(value);
    }

    /// Mutate the value in place; the result is written to storage.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.value.update(f);
    }

    /// The `(current value, setter)` pair for handing to consumers.
    pub fn split(&self) -> (ReadSignal<T>, WriteSignal<T>) {
        self.value.split()
    }

    /// Key the value is currently bound to.
    pub fn key(&self) -> String {
        self.key.get_untracked()
    }

    /// Move the value to a new key. The entry under the old key is removed
    /// and the current value is written under the new one.
    ///
    /// The returned error belongs to the move only; a failure left over from
    /// an earlier write is discarded first.
    pub fn set_key(&self, key: impl Into<String>) -> Result<(), PersistError> {
        let key = key.into();
        if key.is_empty() {
            return Err(PersistError::EmptyKey);
        }
        if let Some(stale) = self.take_error() {
            tracing::debug!(error = %stale, "discarding earlier write failure before key change");
        }
        self.key.set(key);
        self.take_error().map_or(Ok(()), Err)
    }

    /// Swap the codec; the current value is rewritten in the new encoding.
    pub fn set_codec<C>(&self, codec: C)
    where
        C: Codec<T> + 'static,
    {
        self.codec.update(|slot| {
            slot.version += 1;
            slot.codec = Arc::new(codec);
        });
    }

    /// Delete the entry under the current key. The in-memory value is kept
    /// and written again on the next change.
    pub fn remove(&self) -> Result<(), PersistError> {
        let key = self.key.get_untracked();
        let mut tracking = self.binding.tracking.lock();
        self.binding.storage.remove(&key)?;
        tracking.last = None;
        Ok(())
    }

    /// Take the last failure recorded while writing back a change.
    ///
    /// Setters cannot return errors, so encode and storage failures are held
    /// here until the caller collects them.
    pub fn take_error(&self) -> Option<PersistError> {
        self.binding.tracking.lock().error.take()
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistedState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedState")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// Configures a [`PersistedState`] before it reads storage.
pub struct PersistedStateBuilder<T> {
    key: String,
    codec: Arc<dyn Codec<T>>,
    default: Option<DefaultValue<T>>,
}

impl<T> PersistedStateBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Replace the codec chosen when the builder was created.
    pub fn codec<C>(mut self, codec: C) -> Self
    where
        C: Codec<T> + 'static,
    {
        self.codec = Arc::new(codec);
        self
    }

    pub fn default_value(mut self, default: impl Into<DefaultValue<T>>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Shorthand for `default_value(DefaultValue::lazy(factory))`.
    pub fn default_with<F>(self, factory: F) -> Self
    where
        F: FnOnce() -> T + 'static,
    {
        self.default_value(DefaultValue::lazy(factory))
    }

    /// Read storage and bind the value. Without an explicit default,
    /// `T::default()` is used.
    pub fn build<S>(self, storage: S) -> Result<PersistedState<T>, PersistError>
    where
        S: KeyValueStore + 'static,
        T: Default,
    {
        let default = self.default.unwrap_or_default();
        PersistedState::initialize(Arc::new(storage), self.key, self.codec, default)
    }

    /// Like [`build`](Self::build) but requires a default to have been given,
    /// for types without a `Default` impl.
    pub fn build_with_default<S>(
        self,
        storage: S,
        default: impl Into<DefaultValue<T>>,
    ) -> Result<PersistedState<T>, PersistError>
    where
        S: KeyValueStore + 'static,
    {
        let default = self.default.unwrap_or_else(|| default.into());
        PersistedState::initialize(Arc::new(storage), self.key, self.codec, default)
    }
}

/// Bind `key` in `storage` with the JSON codec.
pub fn create_persisted_state<T, S>(
    storage: S,
    key: impl Into<String>,
    default: impl Into<DefaultValue<T>>,
) -> Result<PersistedState<T>, PersistError>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    S: KeyValueStore + 'static,
{
    PersistedState::initialize(Arc::new(storage), key.into(), Arc::new(JsonCodec), default.into())
}
