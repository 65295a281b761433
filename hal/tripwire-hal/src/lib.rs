//! Tripwire Hardware Abstraction Layer
//!
//! This crate defines the two hardware services the interrupt dispatcher
//! talks to. Chip-specific crates implement them; the dispatcher itself
//! never touches registers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application callbacks (task context)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tripwire-core (channel, registry,      │
//! │  dispatcher)                            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tripwire-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  PinDriver    │       │  IsrService   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::PinDriver`] - Input configuration, level sampling, glitch filters
//! - [`interrupt::IsrService`] - Per-pin interrupt handler installation

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod interrupt;

// Re-export key items at crate root for convenience
pub use gpio::{FilterError, GpioError, InterruptType, Level, ParseTriggerError, PinDriver, PinMode};
pub use interrupt::{IsrError, IsrHandler, IsrService};
