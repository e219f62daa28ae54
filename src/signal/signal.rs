use crate::runtime::ReactiveRuntime;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A reactive signal that holds a value and notifies subscribers when changed.
#[derive(Clone)]
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal in the current runtime.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            value: Arc::new(RwLock::new(initial)),
            id,
            runtime,
        }
    }

    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        self.runtime.track_read(self.id);
        self.value.read().clone()
    }

    /// Get the current value without subscribing the running observer.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value for the signal.
    pub fn set(&self, new_value: T) {
        *self.value.write() = new_value;
        self.runtime.notify_observers(self.id);
    }

    /// Update the value using a function.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.value.write();
        f(&mut *value);
        drop(value); // Release the write lock before notifying
        self.runtime.notify_observers(self.id);
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.runtime.track_read(self.id);
        let value = self.value.read();
        f(&*value)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Split into a read half and a write half sharing the same value.
    pub fn split(&self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                inner: self.clone(),
            },
            WriteSignal {
                inner: self.clone(),
            },
        )
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .finish()
    }
}

/// Read-only half of a signal.
#[derive(Clone)]
pub struct ReadSignal<T> {
    inner: Signal<T>,
}

impl<T: Clone + Send + Sync + 'static> ReadSignal<T> {
    /// Get the current value, subscribing the running observer.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn id(&self) -> usize {
        self.inner.id()
    }
}

/// Write-only half of a signal.
#[derive(Clone)]
pub struct WriteSignal<T> {
    inner: Signal<T>,
}

impl<T: Clone + Send + Sync + 'static> WriteSignal<T> {
    /// Replace the value and notify observers.
    pub fn set(&self, new_value: T) {
        self.inner.set(new_value);
    }

    /// Mutate the value in place and notify observers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f);
    }
}

/// Create a signal and return its read and write halves.
///
/// ```
/// use stowage::create_signal;
///
/// let (count, set_count) = create_signal(0);
/// set_count.set(42);
/// assert_eq!(count.get(), 42);
/// ```
pub fn create_signal<T: Clone + Send + Sync + 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    Signal::new(initial).split()
}
