//! Interrupt handler installation
//!
//! Mirrors the shape of vendor "GPIO ISR service" APIs: a service is enabled
//! once, then a handler plus an opaque context is attached to each pin.

/// Handler invoked in interrupt context with the context given at install
pub type IsrHandler<C> = fn(&C);

/// Errors from ISR installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IsrError {
    /// A handler is already installed for this pin
    AlreadyInstalled,
    /// Pin number does not exist on this chip
    InvalidPin,
    /// Interrupt controller rejected the request
    Hardware,
}

/// Per-pin interrupt handler installation
///
/// `C` is the context record handed back to the handler on every
/// interrupt. Implementations must keep it alive and unchanged until
/// [`uninstall`](Self::uninstall) is called for the pin.
pub trait IsrService<C> {
    /// Enable the shared GPIO interrupt service
    ///
    /// Must succeed once per process before the first `install`.
    fn enable(&mut self) -> Result<(), IsrError>;

    /// Attach `handler` to `pin`, passing `context` on every interrupt
    fn install(&mut self, pin: u8, handler: IsrHandler<C>, context: C) -> Result<(), IsrError>;

    /// Detach the handler from `pin`
    ///
    /// After this returns the handler is not invoked for `pin` again.
    fn uninstall(&mut self, pin: u8);
}
