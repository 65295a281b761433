//! Dispatcher errors

use tripwire_hal::{GpioError, IsrError};

use crate::channel::ChannelError;
use crate::state::PinId;

/// Errors returned by construction, registration and the dispatcher loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Event channel could not be claimed; the dispatcher is unusable
    Channel(ChannelError),
    /// The shared ISR service could not be enabled
    IsrService(IsrError),
    /// Spec has no callback, pin not registered
    MissingCallback { pin: PinId },
    /// Pin already has a registered interrupt
    DuplicatePin { pin: PinId },
    /// Registry holds the maximum number of pins
    RegistryFull,
    /// Pin driver rejected the input configuration
    Configure { pin: PinId, error: GpioError },
    /// ISR service rejected the handler
    Install { pin: PinId, error: IsrError },
    /// A task is already running the dispatcher
    AlreadyRunning,
    /// Dispatcher has been shut down
    ShutDown,
}

impl Error {
    /// Check if this error only affects a single pin registration
    pub fn is_pin_error(&self) -> bool {
        matches!(
            self,
            Error::MissingCallback { .. }
                | Error::DuplicatePin { .. }
                | Error::Configure { .. }
                | Error::Install { .. }
        )
    }
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Error::Channel(e)
    }
}
