//! ISR adapter
//!
//! The only code in this crate that runs in interrupt context. Each
//! registered pin gets one [`IsrBinding`] at registration; the ISR service
//! hands it back to [`on_pin_interrupt`] every time the pin fires.

use portable_atomic::{AtomicU8, Ordering};
use tripwire_hal::{IsrError, IsrService};

use crate::channel::EventProducer;
use crate::state::PinId;

/// Per-pin context handed to the ISR service
///
/// Immutable after creation.
#[derive(Debug, Clone, Copy)]
pub struct IsrBinding<'d> {
    pin: PinId,
    producer: EventProducer<'d>,
}

impl<'d> IsrBinding<'d> {
    pub(crate) fn new(pin: PinId, producer: EventProducer<'d>) -> Self {
        Self { pin, producer }
    }

    /// Pin this binding reports
    pub fn pin(&self) -> PinId {
        self.pin
    }
}

/// Interrupt handler installed for every registered pin
///
/// Queues the pin and returns. No locks, no logging, no allocation; a full
/// queue drops the event.
pub fn on_pin_interrupt(binding: &IsrBinding<'_>) {
    let _ = binding.producer.try_push(binding.pin);
}

const UNINIT: u8 = 0;
const ENABLING: u8 = 1;
const READY: u8 = 2;

/// Process-wide "ISR service enabled" state
///
/// The GPIO ISR service must be enabled exactly once before any handler
/// is installed, no matter how many dispatchers are created. The vendor
/// enable call runs with interrupts unmasked; a concurrent caller spins
/// until it finishes.
pub struct IsrServiceInit {
    state: AtomicU8,
}

impl Default for IsrServiceInit {
    fn default() -> Self {
        Self::new()
    }
}

impl IsrServiceInit {
    /// Create the state as not yet enabled
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
        }
    }

    /// Enable the service through `isr` unless already done
    ///
    /// A failed enable leaves the state untouched so a later call retries.
    pub fn ensure_initialized<C, S: IsrService<C>>(&self, isr: &mut S) -> Result<(), IsrError> {
        loop {
            match self
                .state
                .compare_exchange(UNINIT, ENABLING, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => {
                    return match isr.enable() {
                        Ok(()) => {
                            self.state.store(READY, Ordering::Release);
                            Ok(())
                        }
                        Err(e) => {
                            self.state.store(UNINIT, Ordering::Release);
                            Err(e)
                        }
                    };
                }
                Err(READY) => return Ok(()),
                Err(_) => core::hint::spin_loop(),
            }
        }
    }

    /// Check if the service has been enabled
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }
}

/// ISR service state shared by every dispatcher in the process
pub static ISR_SERVICE: IsrServiceInit = IsrServiceInit::new();
