use super::{ResourceFetcher, ResourceState};
use crate::error::FetchError;
use crate::store::{Store, SubscriptionId};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Fetches resources by identifier and tracks the request lifecycle.
///
/// Every load takes a new request tag. A completed fetch is applied only if
/// its tag is still the latest, so a slow response for an old identifier
/// never overwrites the state of a newer one.
pub struct ResourceLoader<F: ResourceFetcher> {
    fetcher: Arc<F>,
    identifier: Arc<RwLock<String>>,
    state: Store<ResourceState<F::Data>>,
    latest_tag: Arc<AtomicU64>,
}

impl<F: ResourceFetcher> Clone for ResourceLoader<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            identifier: Arc::clone(&self.identifier),
            state: self.state.clone(),
            latest_tag: Arc::clone(&self.latest_tag),
        }
    }
}

impl<F: ResourceFetcher> ResourceLoader<F> {
    /// An idle loader.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            identifier: Arc::new(RwLock::new(String::new())),
            state: Store::new(ResourceState::Idle),
            latest_tag: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Switch to a new identifier.
    ///
    /// An empty identifier moves the loader to `Idle`. A non-empty one starts
    /// a fetch and returns its task handle. Submitting the identifier already
    /// loaded (or being loaded) does nothing; use [`retry`](Self::retry) to
    /// refetch.
    ///
    /// # Panics
    ///
    /// Starting a fetch panics outside a tokio runtime.
    pub fn submit(&self, identifier: impl Into<String>) -> Option<JoinHandle<()>> {
        let identifier = identifier.into();
        {
            let mut current = self.identifier.write();
            if *current == identifier {
                tracing::trace!(%identifier, "identifier unchanged");
                return None;
            }
            *current = identifier.clone();
        }
        self.load(identifier)
    }

    /// Load the current identifier again, or go idle if there is none.
    pub fn retry(&self) -> Option<JoinHandle<()>> {
        let identifier = self.identifier.read().clone();
        self.load(identifier)
    }

    fn load(&self, identifier: String) -> Option<JoinHandle<()>> {
        // Taking a tag also invalidates whatever is still in flight.
        let tag = self.latest_tag.fetch_add(1, Ordering::SeqCst) + 1;

        if identifier.is_empty() {
            self.state.set(ResourceState::Idle);
            return None;
        }

        tracing::debug!(%identifier, tag, "fetching resource");
        self.state.set(ResourceState::Pending {
            identifier: identifier.clone(),
        });

        let loader = self.clone();
        Some(tokio::spawn(async move {
            let result = loader.fetcher.fetch(&identifier).await;
            loader.complete(tag, identifier, result);
        }))
    }

    fn complete(&self, tag: u64, identifier: String, result: Result<F::Data, FetchError>) {
        let applied = self.state.update_if(|state| {
            if self.latest_tag.load(Ordering::SeqCst) != tag {
                return false;
            }
            *state = match result {
                Ok(data) => ResourceState::Resolved {
                    identifier: identifier.clone(),
                    data,
                },
                Err(error) => {
                    tracing::debug!(%identifier, %error, "resource fetch rejected");
                    ResourceState::Rejected {
                        identifier: identifier.clone(),
                        error,
                    }
                }
            };
            true
        });

        if !applied {
            tracing::debug!(%identifier, tag, "discarding stale response");
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ResourceState<F::Data> {
        self.state.get()
    }

    /// Identifier most recently submitted.
    pub fn identifier(&self) -> String {
        self.identifier.read().clone()
    }

    /// Tag of the most recent load.
    pub fn request_tag(&self) -> u64 {
        self.latest_tag.load(Ordering::SeqCst)
    }

    /// Run `callback` after every state transition.
    pub fn subscribe<C>(&self, callback: C) -> SubscriptionId
    where
        C: Fn(&ResourceState<F::Data>) + Send + Sync + 'static,
    {
        self.state.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{StaticFetcher, Status};
    use parking_lot::Mutex;
    use std::time::Duration;

    fn fetcher() -> StaticFetcher<u32> {
        StaticFetcher::new()
            .with_entry("pikachu", 25)
            .with_entry("charizard", 6)
            .with_latency(Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn submit_walks_idle_pending_resolved() {
        let loader = ResourceLoader::new(fetcher());
        let seen = Arc::new(Mutex::new(vec![loader.state().status()]));
        loader.subscribe({
            let seen = seen.clone();
            move |state| seen.lock().push(state.status())
        });

        let handle = loader.submit("pikachu").unwrap();
        assert_eq!(loader.state().status(), Status::Pending);
        handle.await.unwrap();

        assert_eq!(
            loader.state(),
            ResourceState::Resolved {
                identifier: "pikachu".into(),
                data: 25
            }
        );
        assert_eq!(
            *seen.lock(),
            vec![Status::Idle, Status::Pending, Status::Resolved]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_identifier_goes_idle_without_fetching() {
        let loader = ResourceLoader::new(fetcher());
        loader.submit("pikachu").unwrap().await.unwrap();

        assert!(loader.submit("").is_none());
        assert_eq!(loader.state(), ResourceState::Idle);
        assert_eq!(loader.state().to_string(), "no identifier");
    }

    #[tokio::test(start_paused = true)]
    async fn going_idle_discards_in_flight_fetch() {
        let loader = ResourceLoader::new(fetcher());
        let handle = loader.submit("pikachu").unwrap();
        loader.submit("");
        handle.await.unwrap();
        assert_eq!(loader.state(), ResourceState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn resubmitting_same_identifier_does_not_refetch() {
        let loader = ResourceLoader::new(fetcher());
        loader.submit("mew").unwrap().await.unwrap();
        let tag = loader.request_tag();

        assert!(loader.submit("mew").is_none());
        assert_eq!(loader.request_tag(), tag);
        assert_eq!(loader.state().status(), Status::Rejected);

        let handle = loader.retry().unwrap();
        assert_eq!(loader.state().status(), Status::Pending);
        handle.await.unwrap();
        assert_eq!(loader.state().status(), Status::Rejected);
    }
}
