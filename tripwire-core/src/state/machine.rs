//! Dispatcher lifecycle state machine
//!
//! The dispatcher is started once, runs until it consumes the shutdown
//! sentinel and never runs again.

/// Dispatcher lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatcherState {
    /// Constructed, consumer not yet claimed by a task
    #[default]
    Idle,
    /// Task is draining the event channel
    Running,
    /// Terminal
    Stopped,
}

/// Inputs that move the dispatcher between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// A task claimed the consumer and entered the loop
    Start,
    /// The loop consumed the shutdown sentinel
    Sentinel,
    /// Shutdown was requested before any task started
    Abandon,
}

impl DispatcherState {
    /// Check if callbacks can currently be delivered
    pub fn is_running(&self) -> bool {
        matches!(self, DispatcherState::Running)
    }

    /// Check if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatcherState::Stopped)
    }

    /// Apply a transition and return the next state
    pub fn transition(self, transition: Transition) -> Self {
        use DispatcherState::*;
        use Transition::*;

        match (self, transition) {
            (Idle, Start) => Running,
            (Idle, Abandon) => Stopped,
            (Running, Sentinel) => Stopped,

            // Stopped never leaves; everything else is ignored
            _ => self,
        }
    }
}
