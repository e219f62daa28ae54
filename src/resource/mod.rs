//! Asynchronous loading of remote resources.
//!
//! A [`ResourceLoader`] moves through `idle -> pending -> resolved | rejected`
//! as identifiers are submitted. Responses are tagged per request and stale
//! ones are dropped. Rejections are meant to be handled by an
//! [`ErrorBoundary`], which can reset the loader.

mod boundary;
mod fetcher;
mod loader;
mod state;

pub use boundary::ErrorBoundary;
pub use fetcher::{ResourceFetcher, StaticFetcher};
pub use loader::ResourceLoader;
pub use state::{ResourceState, Status, View};
