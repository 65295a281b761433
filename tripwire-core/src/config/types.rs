//! Pin configuration types
//!
//! These types describe how a pin is wired and when it counts as
//! "triggered". They carry no callbacks, so they can be stored or loaded
//! from configuration files.

use core::fmt;
use core::str::FromStr;

use tripwire_hal::{InterruptType, Level, PinMode};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::state::PinId;

/// Logical level considered "active" for a pin
///
/// Decouples signal polarity from application meaning: an active-low
/// button reports `active = true` while pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActiveLevel {
    /// Active low
    Low,
    /// Active high
    #[default]
    High,
}

impl ActiveLevel {
    /// Check if a sampled physical level is the active one
    pub fn is_active(self, level: Level) -> bool {
        match self {
            ActiveLevel::High => level.is_high(),
            ActiveLevel::Low => level.is_low(),
        }
    }
}

impl fmt::Display for ActiveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveLevel::Low => f.write_str("LOW"),
            ActiveLevel::High => f.write_str("HIGH"),
        }
    }
}

impl FromStr for ActiveLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" | "LOW" => Ok(ActiveLevel::Low),
            "high" | "HIGH" => Ok(ActiveLevel::High),
            _ => Err(ParseError::InvalidLevel),
        }
    }
}

/// Configuration parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid pin string
    InvalidPin,
    /// Unknown active level name
    InvalidLevel,
}

/// Interrupt configuration for one pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO number
    pub pin: PinId,
    /// Level reported as active to the callback
    pub active_level: ActiveLevel,
    /// Hardware trigger
    pub interrupt_type: InterruptType,
    /// Enable internal pull-up
    pub pull_up: bool,
    /// Enable internal pull-down
    pub pull_down: bool,
    /// Enable the hardware glitch filter, where the chip has one
    pub glitch_filter: bool,
}

impl PinConfig {
    /// Active-high pin interrupting on any edge, no pulls, no filter
    pub const fn new(pin: PinId) -> Self {
        Self {
            pin,
            active_level: ActiveLevel::High,
            interrupt_type: InterruptType::AnyEdge,
            pull_up: false,
            pull_down: false,
            glitch_filter: false,
        }
    }

    /// Create an active-high pin
    pub const fn active_high(pin: PinId) -> Self {
        Self::new(pin)
    }

    /// Create an active-low (inverted) pin
    pub const fn active_low(pin: PinId) -> Self {
        let mut config = Self::new(pin);
        config.active_level = ActiveLevel::Low;
        config
    }

    /// Enable the internal pull-up
    pub const fn with_pull_up(mut self) -> Self {
        self.pull_up = true;
        self
    }

    /// Enable the internal pull-down
    pub const fn with_pull_down(mut self) -> Self {
        self.pull_down = true;
        self
    }

    /// Set the hardware trigger
    pub const fn with_trigger(mut self, interrupt_type: InterruptType) -> Self {
        self.interrupt_type = interrupt_type;
        self
    }

    /// Request the hardware glitch filter
    pub const fn with_glitch_filter(mut self) -> Self {
        self.glitch_filter = true;
        self
    }

    /// Electrical mode handed to the pin driver
    pub fn mode(&self) -> PinMode {
        PinMode {
            pull_up: self.pull_up,
            pull_down: self.pull_down,
            trigger: self.interrupt_type,
        }
    }

    /// Parse a pin string
    ///
    /// Supports formats:
    /// - "gpio4" -> active high
    /// - "!gpio4" -> active low (inverted)
    /// - "^gpio4" -> pull-up
    /// - "~gpio4" -> pull-down
    ///
    /// Modifiers combine in any order, e.g. "!^gpio0" for a button to
    /// ground.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let mut s = s.trim();
        let mut active_low = false;
        let mut pull_up = false;
        let mut pull_down = false;

        // Check for modifiers
        loop {
            if let Some(rest) = s.strip_prefix('!') {
                active_low = true;
                s = rest;
            } else if let Some(rest) = s.strip_prefix('^') {
                pull_up = true;
                s = rest;
            } else if let Some(rest) = s.strip_prefix('~') {
                pull_down = true;
                s = rest;
            } else {
                break;
            }
        }

        let num = s.strip_prefix("gpio").ok_or(ParseError::InvalidPin)?;
        let pin: PinId = num.parse().map_err(|_| ParseError::InvalidPin)?;

        let mut config = if active_low {
            Self::active_low(pin)
        } else {
            Self::active_high(pin)
        };
        config.pull_up = pull_up;
        config.pull_down = pull_down;
        Ok(config)
    }
}

impl fmt::Display for PinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PinConfig{{pin={}, active_level={}, interrupt_type={}, pull_up={}, pull_down={}, glitch_filter={}}}",
            self.pin,
            self.active_level,
            self.interrupt_type,
            self.pull_up,
            self.pull_down,
            self.glitch_filter
        )
    }
}

impl FromStr for PinConfig {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
