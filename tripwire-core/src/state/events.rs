//! Events flowing through the dispatch pipeline

/// GPIO number of an interrupt source
pub type PinId = u8;

/// Record queued by the ISR adapter
///
/// Produced in interrupt context and consumed exactly once by the
/// dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinEvent {
    /// The interrupt for this pin fired
    Triggered(PinId),
    /// Stop the dispatcher; sent only by shutdown
    Shutdown,
}

/// Event handed to a pin callback
///
/// `active` compares the level sampled when the dispatcher handles the
/// event against the configured active level. It is not the level at
/// interrupt time: a signal that toggles faster than the dispatcher
/// drains the queue may report a later state than the one that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResolvedEvent {
    /// Pin that fired
    pub pin: PinId,
    /// Pin is at its configured active level
    pub active: bool,
}
