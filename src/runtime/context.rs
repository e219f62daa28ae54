use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

type Observer = Arc<dyn Fn() + Send + Sync>;

/// Dependency graph between signals and the observers reading them.
struct ReactiveContext {
    // Observer running on each thread; reads are attributed per thread
    current_observers: HashMap<ThreadId, usize>,
    // Map from signal ID to set of observer IDs that depend on it
    dependencies: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to set of signal IDs it depends on
    observer_deps: HashMap<usize, HashSet<usize>>,
    observers: HashMap<usize, Observer>,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            current_observers: HashMap::new(),
            dependencies: HashMap::new(),
            observer_deps: HashMap::new(),
            observers: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.current_observers.clear();
        self.dependencies.clear();
        self.observer_deps.clear();
        self.observers.clear();
    }

    fn set_current(&mut self, thread: ThreadId, observer: Option<usize>) -> Option<usize> {
        match observer {
            Some(observer_id) => self.current_observers.insert(thread, observer_id),
            None => self.current_observers.remove(&thread),
        }
    }

    fn forget_dependencies(&mut self, observer_id: usize) {
        if let Some(old_deps) = self.observer_deps.remove(&observer_id) {
            for signal_id in old_deps {
                if let Some(deps) = self.dependencies.get_mut(&signal_id) {
                    deps.remove(&observer_id);
                }
            }
        }
    }
}

/// Inner runtime state shared with guards that outlive a borrow of the runtime.
pub struct RuntimeInner {
    context: Mutex<ReactiveContext>,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            context: Mutex::new(ReactiveContext::new()),
        }
    }

    /// Unregister an observer and drop every edge pointing at it.
    pub fn remove_observer(&self, observer_id: usize) {
        let mut ctx = self.context.lock();
        ctx.observers.remove(&observer_id);
        ctx.forget_dependencies(observer_id);
        tracing::trace!(observer_id, "observer removed");
    }
}

/// Reactive runtime tracking which observers depend on which signals.
///
/// Supports a global runtime (default) and scoped runtimes for isolation.
/// Signals and effects capture the runtime that was current when they were
/// created, so they keep notifying the right graph even when used from a
/// different task or thread. The running observer is tracked per thread, so
/// effects running concurrently on one runtime never see each other's reads.
///
/// # Examples
///
/// ```
/// use stowage::runtime::ReactiveRuntime;
/// use stowage::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// // Runtime and all its state is dropped here
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    inner: Arc<RuntimeInner>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(vec![]) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime with its own dependency graph.
    pub fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            inner: Arc::new(RuntimeInner::new()),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// The runtime is dropped when the function returns, unless a signal or
    /// effect created inside still holds it.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .unwrap_or_else(Self::global)
        })
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// ```
    /// use stowage::runtime::ReactiveRuntime;
    /// use stowage::Signal;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// ReactiveRuntime::with_runtime(runtime, || {
    ///     let signal = Signal::new(42);
    ///     assert_eq!(signal.get(), 42);
    /// });
    /// ```
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Clear all observers and dependencies.
    ///
    /// The ID counter keeps running so primitives created afterwards never
    /// reuse the ID of one that is still alive.
    pub fn clear(&self) {
        self.inner.context.lock().clear();
    }

    /// Shared handle to the inner state, for guards that unregister on drop.
    pub fn inner(&self) -> Arc<RuntimeInner> {
        Arc::clone(&self.inner)
    }

    /// Generate the next unique ID for a reactive primitive.
    pub fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Track a read of a signal by the current observer.
    pub fn track_read(&self, signal_id: usize) {
        let mut ctx = self.inner.context.lock();
        if let Some(&current_observer) = ctx.current_observers.get(&thread::current().id()) {
            ctx.dependencies
                .entry(signal_id)
                .or_default()
                .insert(current_observer);
            ctx.observer_deps
                .entry(current_observer)
                .or_default()
                .insert(signal_id);
        }
    }

    /// Re-run every observer that depends on a signal.
    pub fn notify_observers(&self, signal_id: usize) {
        let observers = {
            let ctx = self.inner.context.lock();
            ctx.dependencies
                .get(&signal_id)
                .map(|obs| obs.iter().copied().collect::<Vec<_>>())
        };

        if let Some(observers) = observers {
            tracing::trace!(signal_id, count = observers.len(), "notifying observers");
            for observer_id in observers {
                self.run_observer(observer_id);
            }
        }
    }

    /// Re-run an observer, rebuilding its dependency set from the reads it makes.
    fn run_observer(&self, observer_id: usize) {
        let observer = {
            let mut ctx = self.inner.context.lock();
            let observer = ctx.observers.get(&observer_id).cloned();
            if observer.is_some() {
                ctx.forget_dependencies(observer_id);
            }
            observer
        };

        // The lock is released before user code runs; observers read signals.
        if let Some(observer) = observer {
            self.with_observer(observer_id, || observer());
        }
    }

    /// Register an observer callback under the given ID.
    pub fn create_observer<F>(&self, observer_id: usize, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut ctx = self.inner.context.lock();
        ctx.forget_dependencies(observer_id);
        ctx.observers.insert(observer_id, Arc::new(f));
    }

    /// Run a function with a specific observer as the current context.
    pub fn with_observer<F, R>(&self, observer_id: usize, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let thread = thread::current().id();
        let prev = self
            .inner
            .context
            .lock()
            .set_current(thread, Some(observer_id));

        let result = f();

        self.inner.context.lock().set_current(thread, prev);
        result
    }

    /// Run a function without tracking any reads it makes.
    pub fn untracked<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let thread = thread::current().id();
        let prev = self.inner.context.lock().set_current(thread, None);

        let result = f();

        self.inner.context.lock().set_current(thread, prev);
        result
    }

    /// Number of observers currently subscribed to a signal.
    pub fn observer_count(&self, signal_id: usize) -> usize {
        self.inner
            .context
            .lock()
            .dependencies
            .get(&signal_id)
            .map_or(0, HashSet::len)
    }
}
