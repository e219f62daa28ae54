use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Asynchronous source of resource data keyed by identifier.
#[async_trait]
pub trait ResourceFetcher: Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;

    async fn fetch(&self, identifier: &str) -> Result<Self::Data, FetchError>;
}

/// In-memory fetcher with simulated latency.
///
/// Identifiers are matched case-insensitively. Unknown identifiers are
/// rejected with a "not found" message.
#[derive(Debug, Clone)]
pub struct StaticFetcher<D> {
    entries: HashMap<String, D>,
    latency: Duration,
    latency_overrides: HashMap<String, Duration>,
}

impl<D> StaticFetcher<D> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            latency: Duration::ZERO,
            latency_overrides: HashMap::new(),
        }
    }

    pub fn with_entry(mut self, identifier: &str, data: D) -> Self {
        self.entries.insert(identifier.to_lowercase(), data);
        self
    }

    /// Latency applied to every fetch without an override.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Latency for one identifier, found or not.
    pub fn with_latency_for(mut self, identifier: &str, latency: Duration) -> Self {
        self.latency_overrides
            .insert(identifier.to_lowercase(), latency);
        self
    }
}

impl<D> Default for StaticFetcher<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<D> ResourceFetcher for StaticFetcher<D>
where
    D: Clone + Send + Sync + 'static,
{
    type Data = D;

    async fn fetch(&self, identifier: &str) -> Result<D, FetchError> {
        let normalized = identifier.to_lowercase();
        let latency = self
            .latency_overrides
            .get(&normalized)
            .copied()
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.entries.get(&normalized).cloned().ok_or_else(|| {
            FetchError::new(format!(
                "Unsupported identifier: \"{identifier}\". Try \"{}\"",
                self.suggestions()
            ))
        })
    }
}

impl<D> StaticFetcher<D> {
    fn suggestions(&self) -> String {
        let mut known: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        known.sort_unstable();
        known.join("\", \"")
    }
}
