//! Dispatcher state and pipeline events
//!
//! Defines the lifecycle of the dispatcher task and the records that
//! travel from interrupt context to callbacks.

pub mod events;
pub mod machine;

pub use events::{PinEvent, PinId, ResolvedEvent};
pub use machine::{DispatcherState, Transition};
