//! GPIO input abstractions
//!
//! Provides the pin driver trait used to prepare interrupt inputs and to
//! sample their level from task context.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Check if this is the high level
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// Check if this is the low level
    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

/// Hardware condition that raises a pin interrupt
///
/// Only interpreted by the driver; the dispatcher passes it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InterruptType {
    /// Interrupt on any edge
    #[default]
    AnyEdge,
    /// Interrupt on rising edge
    RisingEdge,
    /// Interrupt on falling edge
    FallingEdge,
    /// Interrupt while the pin is low
    LowLevel,
    /// Interrupt while the pin is high
    HighLevel,
}

impl fmt::Display for InterruptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterruptType::AnyEdge => "ANY_EDGE",
            InterruptType::RisingEdge => "RISING_EDGE",
            InterruptType::FallingEdge => "FALLING_EDGE",
            InterruptType::LowLevel => "LOW_LEVEL",
            InterruptType::HighLevel => "HIGH_LEVEL",
        };
        f.write_str(name)
    }
}

/// Error parsing an [`InterruptType`] name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseTriggerError {
    /// Name is empty
    Empty,
    /// Not one of the known trigger names
    Unknown,
}

impl FromStr for InterruptType {
    type Err = ParseTriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "any_edge" | "any" => Ok(InterruptType::AnyEdge),
            "rising_edge" | "rising" => Ok(InterruptType::RisingEdge),
            "falling_edge" | "falling" => Ok(InterruptType::FallingEdge),
            "low_level" => Ok(InterruptType::LowLevel),
            "high_level" => Ok(InterruptType::HighLevel),
            "" => Err(ParseTriggerError::Empty),
            _ => Err(ParseTriggerError::Unknown),
        }
    }
}

/// Electrical configuration for an interrupt input
///
/// The direction is always input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMode {
    /// Enable internal pull-up
    pub pull_up: bool,
    /// Enable internal pull-down
    pub pull_down: bool,
    /// Interrupt trigger
    pub trigger: InterruptType,
}

/// Errors from pin configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioError {
    /// Pin number does not exist on this chip
    InvalidPin,
    /// Pin cannot be used as an interrupt input (reserved, strapping, etc.)
    Unavailable,
    /// Hardware rejected the configuration
    Hardware,
}

/// Errors from glitch filter allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterError {
    /// This chip has no pin glitch filter
    Unsupported,
    /// All filter units are in use
    Exhausted,
    /// Hardware rejected the filter configuration
    Hardware,
}

/// Driver for pins used as interrupt sources
///
/// Implementations own the chip's GPIO matrix (or a view of it) and are
/// only ever called from task context.
pub trait PinDriver {
    /// Token returned when a glitch filter is enabled
    type FilterHandle;

    /// Configure `pin` as an input with the given pulls and trigger
    fn configure(&mut self, pin: u8, mode: &PinMode) -> Result<(), GpioError>;

    /// Sample the current physical level of `pin`
    fn read_level(&self, pin: u8) -> Level;

    /// Enable the hardware glitch filter on `pin`
    ///
    /// Chips without filter support return [`FilterError::Unsupported`].
    fn enable_glitch_filter(&mut self, pin: u8) -> Result<Self::FilterHandle, FilterError>;

    /// Disable and release a filter previously returned by
    /// [`enable_glitch_filter`](Self::enable_glitch_filter)
    fn disable_glitch_filter(&mut self, handle: Self::FilterHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_checks() {
        assert!(Level::High.is_high());
        assert!(!Level::High.is_low());
        assert!(Level::Low.is_low());
    }

    #[test]
    fn test_interrupt_type_parse() {
        assert_eq!("any_edge".parse(), Ok(InterruptType::AnyEdge));
        assert_eq!("rising".parse(), Ok(InterruptType::RisingEdge));
        assert_eq!(" falling_edge ".parse(), Ok(InterruptType::FallingEdge));
        assert_eq!("low_level".parse(), Ok(InterruptType::LowLevel));
        assert_eq!("high_level".parse(), Ok(InterruptType::HighLevel));
        assert_eq!(
            "sideways".parse::<InterruptType>(),
            Err(ParseTriggerError::Unknown)
        );
        assert_eq!("  ".parse::<InterruptType>(), Err(ParseTriggerError::Empty));
    }

    #[test]
    fn test_interrupt_type_config_names() {
        let all = [
            InterruptType::AnyEdge,
            InterruptType::RisingEdge,
            InterruptType::FallingEdge,
            InterruptType::LowLevel,
            InterruptType::HighLevel,
        ];
        let names = ["any_edge", "rising_edge", "falling_edge", "low_level", "high_level"];
        for (t, name) in all.into_iter().zip(names) {
            assert_eq!(name.parse(), Ok(t));
        }
    }
}
