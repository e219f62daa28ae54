use parking_lot::{ReentrantMutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Store::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

/// A thread-safe store for shared state.
///
/// Subscribers run after every `set`/`update`, outside the state lock.
/// Notifications are delivered one at a time and each carries the state as
/// it is when delivery starts, so the last call a subscriber sees always
/// matches the store, even when writers on other threads race.
pub struct Store<T> {
    state: Arc<RwLock<T>>,
    subscribers: Arc<RwLock<Vec<(SubscriptionId, Subscriber<T>)>>>,
    next_subscription: Arc<AtomicUsize>,
    // Reentrant so a subscriber may write back to the store.
    delivery: Arc<ReentrantMutex<()>>,
}

impl<T: Clone> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscription: Arc::new(AtomicUsize::new(0)),
            delivery: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Get a clone of the current state.
    pub fn get(&self) -> T {
        self.state.read().clone()
    }

    /// Update the state using a function.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        f(&mut *self.state.write());
        self.notify();
    }

    /// Update the state only if `f` returns true; subscribers are notified
    /// only in that case. The check and the write happen under one lock.
    pub fn update_if<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        if !f(&mut *self.state.write()) {
            return false;
        }
        self.notify();
        true
    }

    /// Set a new state value.
    pub fn set(&self, new_state: T) {
        *self.state.write() = new_state;
        self.notify();
    }

    /// Subscribe to state changes.
    ///
    /// The callback will be called whenever the state is updated.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    fn notify(&self) {
        let _delivery = self.delivery.lock();
        let state = self.get();
        let subscribers: Vec<Subscriber<T>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(&state);
        }
    }

    /// Read state without cloning.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.state.read();
        f(&*state)
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            subscribers: Arc::clone(&self.subscribers),
            next_subscription: Arc::clone(&self.next_subscription),
            delivery: Arc::clone(&self.delivery),
        }
    }
}
