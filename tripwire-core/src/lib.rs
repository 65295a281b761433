//! Board-agnostic deferred GPIO interrupt dispatch
//!
//! Interrupt handlers do the minimum: push the pin number onto a bounded
//! channel. A dispatcher task drains the channel, samples the pin level and
//! calls the application's callback in task context.
//!
//! - Interrupt-safe event channel with producer/consumer capabilities
//! - ISR adapter and the process-wide ISR service state
//! - Pin registry (configure, filter, install)
//! - Dispatcher task and its lifecycle state machine
//! - Shutdown protocol
//! - Configuration type definitions
//!
//! Hardware access goes through the traits in `tripwire-hal`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod isr;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod registry;
pub mod state;

pub use channel::{ChannelError, EventChannel, EventConsumer, EventProducer, DEFAULT_QUEUE_DEPTH};
pub use config::{ActiveLevel, EventCallback, InterruptSpec, ParseError, PinConfig};
pub use dispatcher::{DispatchStats, PinInterrupts};
pub use error::Error;
pub use isr::{on_pin_interrupt, IsrBinding, IsrServiceInit, ISR_SERVICE};
pub use registry::{Registry, MAX_PINS};
pub use state::{DispatcherState, PinEvent, PinId, ResolvedEvent, Transition};
