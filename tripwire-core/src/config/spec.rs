//! Interrupt registration records

use core::fmt;

use super::types::PinConfig;
use crate::state::{PinId, ResolvedEvent};

/// Application callback for a pin
///
/// Runs on the dispatcher task, never in interrupt context. It must not
/// block indefinitely: every queued event waits behind it.
pub type EventCallback = &'static (dyn Fn(ResolvedEvent) + Sync);

/// A pin configuration paired with its callback
///
/// The callback is optional only so that a missing one can be reported;
/// registration rejects specs without it.
#[derive(Clone, Copy)]
pub struct InterruptSpec {
    /// Pin wiring and trigger
    pub config: PinConfig,
    /// Callback for the interrupt event
    pub callback: Option<EventCallback>,
}

impl InterruptSpec {
    /// Create a spec with a callback
    pub const fn new(config: PinConfig, callback: EventCallback) -> Self {
        Self {
            config,
            callback: Some(callback),
        }
    }

    /// Create a spec with no callback attached
    pub const fn without_callback(config: PinConfig) -> Self {
        Self {
            config,
            callback: None,
        }
    }

    /// GPIO number of this spec
    pub fn pin(&self) -> PinId {
        self.config.pin
    }
}

impl fmt::Debug for InterruptSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptSpec")
            .field("config", &self.config)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InterruptSpec {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "InterruptSpec {{ config: {}, has_callback: {} }}",
            self.config,
            self.callback.is_some()
        )
    }
}
