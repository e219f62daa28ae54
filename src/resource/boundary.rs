use super::{ResourceFetcher, ResourceLoader, ResourceState, View};
use crate::error::{FetchError, LoadError};
use crate::store::SubscriptionId;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

type ResetHook = Box<dyn Fn() + Send + Sync>;

/// Catches fetch failures of a [`ResourceLoader`] and substitutes a fallback.
///
/// The boundary captures the error as soon as the loader is rejected. The
/// error stays caught until [`reset`](Self::reset) is called or the loader
/// moves on to a different identifier.
pub struct ErrorBoundary<F: ResourceFetcher> {
    loader: ResourceLoader<F>,
    caught: Arc<Mutex<Option<FetchError>>>,
    on_reset: Vec<ResetHook>,
    subscription: SubscriptionId,
}

impl<F: ResourceFetcher> ErrorBoundary<F> {
    pub fn new(loader: ResourceLoader<F>) -> Self {
        let caught = Arc::new(Mutex::new(loader.state().error().cloned()));
        let subscription = loader.subscribe({
            let caught = Arc::clone(&caught);
            move |state: &ResourceState<F::Data>| {
                let mut caught = caught.lock();
                match state {
                    ResourceState::Rejected { identifier, error } => {
                        tracing::warn!(%identifier, %error, "error boundary caught fetch failure");
                        *caught = Some(error.clone());
                    }
                    // A new request supersedes the failure.
                    _ => *caught = None,
                }
            }
        });

        Self {
            loader,
            caught,
            on_reset: Vec::new(),
            subscription,
        }
    }

    /// Run `hook` on every reset, before the loader retries.
    pub fn on_reset<H>(mut self, hook: H) -> Self
    where
        H: Fn() + Send + Sync + 'static,
    {
        self.on_reset.push(Box::new(hook));
        self
    }

    /// The caught error, if any.
    pub fn error(&self) -> Option<FetchError> {
        self.caught.lock().clone()
    }

    pub fn has_error(&self) -> bool {
        self.caught.lock().is_some()
    }

    pub fn loader(&self) -> &ResourceLoader<F> {
        &self.loader
    }

    /// Clear the caught error, run the reset hooks, then retry the loader.
    ///
    /// The loader ends up `Idle` if no identifier is set once the hooks ran,
    /// otherwise `Pending` on a fresh request.
    pub fn reset(&self) -> Option<JoinHandle<()>> {
        self.caught.lock().take();
        for hook in &self.on_reset {
            hook();
        }
        tracing::debug!(identifier = %self.loader.identifier(), "error boundary reset");
        self.loader.retry()
    }

    /// Render through the boundary.
    ///
    /// `content` receives the view of a healthy loader; `fallback` receives a
    /// caught error. An invariant violation is returned as
    /// [`LoadError::ImpossibleState`] so the caller can abandon the subtree.
    pub fn render<R>(
        &self,
        content: impl FnOnce(View<'_, F::Data>) -> R,
        fallback: impl FnOnce(&FetchError) -> R,
    ) -> Result<R, LoadError> {
        if let Some(error) = self.error() {
            return Ok(fallback(&error));
        }

        let state = self.loader.state();
        match state.view() {
            Ok(view) => Ok(content(view)),
            Err(LoadError::Fetch(error)) => Ok(fallback(&error)),
            Err(err) => Err(err),
        }
    }
}

impl<F: ResourceFetcher> Drop for ErrorBoundary<F> {
    fn drop(&mut self) {
        self.loader.unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{StaticFetcher, Status};

    fn loader() -> ResourceLoader<StaticFetcher<u32>> {
        ResourceLoader::new(StaticFetcher::new().with_entry("pikachu", 25))
    }

    fn describe(boundary: &ErrorBoundary<StaticFetcher<u32>>) -> String {
        boundary
            .render(
                |view| match view {
                    View::NoIdentifier => "Submit a pokemon".to_string(),
                    View::Loading { identifier } => format!("Loading {identifier}..."),
                    View::Ready { data, .. } => format!("#{data}"),
                },
                |error| format!("There was an error: {error}"),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn renders_content_when_healthy() {
        let loader = loader();
        let boundary = ErrorBoundary::new(loader.clone());
        assert_eq!(describe(&boundary), "Submit a pokemon");

        let handle = loader.submit("pikachu").unwrap();
        assert_eq!(describe(&boundary), "Loading pikachu...");
        handle.await.unwrap();
        assert_eq!(describe(&boundary), "#25");
    }

    #[tokio::test]
    async fn reset_without_hooks_refetches_current_identifier() {
        let loader = loader();
        let boundary = ErrorBoundary::new(loader.clone());

        loader.submit("mew").unwrap().await.unwrap();
        assert!(boundary.has_error());
        assert!(describe(&boundary).starts_with("There was an error: Unsupported identifier"));

        let handle = boundary.reset().unwrap();
        assert!(!boundary.has_error());
        assert_eq!(loader.state().status(), Status::Pending);
        handle.await.unwrap();
        assert!(boundary.has_error());
    }

    #[tokio::test]
    async fn new_identifier_clears_caught_error() {
        let loader = loader();
        let boundary = ErrorBoundary::new(loader.clone());

        loader.submit("mew").unwrap().await.unwrap();
        assert!(boundary.has_error());

        loader.submit("pikachu").unwrap().await.unwrap();
        assert!(!boundary.has_error());
        assert_eq!(describe(&boundary), "#25");
    }

    #[tokio::test]
    async fn dropping_boundary_unsubscribes() {
        let loader = loader();
        let boundary = ErrorBoundary::new(loader.clone());
        let subscription = boundary.subscription;
        drop(boundary);
        assert!(!loader.unsubscribe(subscription));
    }
}
