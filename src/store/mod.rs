//! Shared state containers with change subscriptions.
//!
//! Stores hold a whole value behind a lock and notify subscribers on every
//! write. The resource loader keeps its state machine in one.

#[allow(clippy::module_inception)]
mod store;

pub use store::{Store, SubscriptionId};
