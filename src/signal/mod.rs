//! Fine-grained reactive primitives.
//!
//! - Signals: Reactive state containers
//! - Effects: Side effects that react to changes

mod effect;
#[allow(clippy::module_inception)]
mod signal;

pub use effect::{create_effect, Effect};
pub use signal::{create_signal, ReadSignal, Signal, WriteSignal};
