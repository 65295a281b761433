//! Host-side board model
//!
//! [`MockBoard`] implements both hardware services in memory so the whole
//! pipeline can be driven from a test: set pin levels, fire interrupts,
//! take away glitch filter support or make a pin fail to configure or
//! install.
//!
//! [`CallbackLog`] records events from a `static` callback.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;
use tripwire_hal::{
    FilterError, GpioError, IsrError, IsrHandler, IsrService, Level, PinDriver, PinMode,
};

use crate::isr::IsrBinding;
use crate::state::{PinId, ResolvedEvent};

/// Pins the board model can track
const BOARD_PINS: usize = 64;

/// Events a [`CallbackLog`] keeps
const LOG_DEPTH: usize = 64;

#[derive(Clone, Copy)]
struct Installed<'d> {
    pin: PinId,
    handler: IsrHandler<IsrBinding<'d>>,
    binding: IsrBinding<'d>,
}

struct BoardState<'d> {
    levels: Vec<(PinId, Level), BOARD_PINS>,
    modes: Vec<(PinId, PinMode), BOARD_PINS>,
    installed: Vec<Installed<'d>, BOARD_PINS>,
    /// Pins with an active glitch filter
    filters: Vec<PinId, BOARD_PINS>,
    filter_supported: bool,
    fail_configure: Option<PinId>,
    fail_install: Option<PinId>,
    enable_calls: u32,
}

/// In-memory GPIO block with a per-pin ISR service
pub struct MockBoard<'d> {
    state: Mutex<CriticalSectionRawMutex, RefCell<BoardState<'d>>>,
}

impl Default for MockBoard<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'d> MockBoard<'d> {
    /// Board with glitch filters and every pin low
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(BoardState {
                levels: Vec::new(),
                modes: Vec::new(),
                installed: Vec::new(),
                filters: Vec::new(),
                filter_supported: true,
                fail_configure: None,
                fail_install: None,
                enable_calls: 0,
            })),
        }
    }

    /// Report glitch filters as unsupported
    pub fn without_glitch_filter(mut self) -> Self {
        self.state.get_mut().get_mut().filter_supported = false;
        self
    }

    /// Reject configuration of `pin`
    pub fn fail_configure_on(mut self, pin: PinId) -> Self {
        self.state.get_mut().get_mut().fail_configure = Some(pin);
        self
    }

    /// Reject ISR installation on `pin`
    pub fn fail_install_on(mut self, pin: PinId) -> Self {
        self.state.get_mut().get_mut().fail_install = Some(pin);
        self
    }

    fn with<R>(&self, f: impl FnOnce(&mut BoardState<'d>) -> R) -> R {
        self.state.lock(|state| f(&mut *state.borrow_mut()))
    }

    /// Drive the input level of `pin`
    pub fn set_level(&self, pin: PinId, level: Level) {
        self.with(|state| {
            if let Some(entry) = state.levels.iter_mut().find(|(p, _)| *p == pin) {
                entry.1 = level;
            } else {
                let _ = state.levels.push((pin, level));
            }
        });
    }

    /// Raise the interrupt for `pin`
    ///
    /// Runs the installed handler the way the hardware would. Returns
    /// `false` if no handler is installed.
    pub fn fire(&self, pin: PinId) -> bool {
        let installed = self.with(|state| state.installed.iter().find(|i| i.pin == pin).copied());
        match installed {
            Some(installed) => {
                (installed.handler)(&installed.binding);
                true
            }
            None => false,
        }
    }

    /// Check if a handler is installed for `pin`
    pub fn is_installed(&self, pin: PinId) -> bool {
        self.with(|state| state.installed.iter().any(|i| i.pin == pin))
    }

    /// Number of installed handlers
    pub fn installed_count(&self) -> usize {
        self.with(|state| state.installed.len())
    }

    /// Last mode `pin` was configured with
    pub fn mode(&self, pin: PinId) -> Option<PinMode> {
        self.with(|state| {
            state
                .modes
                .iter()
                .find(|(p, _)| *p == pin)
                .map(|(_, mode)| *mode)
        })
    }

    /// Check if `pin` has an active glitch filter
    pub fn filter_active(&self, pin: PinId) -> bool {
        self.with(|state| state.filters.contains(&pin))
    }

    /// Number of times the ISR service was enabled through this board
    pub fn enable_calls(&self) -> u32 {
        self.with(|state| state.enable_calls)
    }
}

impl<'d> PinDriver for &MockBoard<'d> {
    type FilterHandle = PinId;

    fn configure(&mut self, pin: u8, mode: &PinMode) -> Result<(), GpioError> {
        self.with(|state| {
            if state.fail_configure == Some(pin) {
                return Err(GpioError::Hardware);
            }
            if let Some(entry) = state.modes.iter_mut().find(|(p, _)| *p == pin) {
                entry.1 = *mode;
                return Ok(());
            }
            state
                .modes
                .push((pin, *mode))
                .map_err(|_| GpioError::InvalidPin)
        })
    }

    fn read_level(&self, pin: u8) -> Level {
        self.with(|state| {
            state
                .levels
                .iter()
                .find(|(p, _)| *p == pin)
                .map(|(_, level)| *level)
                .unwrap_or(Level::Low)
        })
    }

    fn enable_glitch_filter(&mut self, pin: u8) -> Result<PinId, FilterError> {
        self.with(|state| {
            if !state.filter_supported {
                return Err(FilterError::Unsupported);
            }
            state.filters.push(pin).map_err(|_| FilterError::Exhausted)?;
            Ok(pin)
        })
    }

    fn disable_glitch_filter(&mut self, handle: PinId) {
        self.with(|state| state.filters.retain(|&pin| pin != handle));
    }
}

impl<'d> IsrService<IsrBinding<'d>> for &MockBoard<'d> {
    fn enable(&mut self) -> Result<(), IsrError> {
        self.with(|state| state.enable_calls += 1);
        Ok(())
    }

    fn install(
        &mut self,
        pin: u8,
        handler: IsrHandler<IsrBinding<'d>>,
        context: IsrBinding<'d>,
    ) -> Result<(), IsrError> {
        self.with(|state| {
            if state.fail_install == Some(pin) {
                return Err(IsrError::Hardware);
            }
            if state.installed.iter().any(|i| i.pin == pin) {
                return Err(IsrError::AlreadyInstalled);
            }
            state
                .installed
                .push(Installed {
                    pin,
                    handler,
                    binding: context,
                })
                .map_err(|_| IsrError::InvalidPin)
        })
    }

    fn uninstall(&mut self, pin: u8) {
        self.with(|state| state.installed.retain(|i| i.pin != pin));
    }
}

/// Records the events a callback receives
pub struct CallbackLog {
    events: Mutex<CriticalSectionRawMutex, RefCell<Vec<ResolvedEvent, LOG_DEPTH>>>,
}

impl Default for CallbackLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackLog {
    /// Create an empty log
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Append an event, dropping it if the log is full
    pub fn record(&self, event: ResolvedEvent) {
        self.events.lock(|events| {
            let _ = events.borrow_mut().push(event);
        });
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<ResolvedEvent, LOG_DEPTH> {
        self.events.lock(|events| events.borrow().clone())
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock(|events| events.borrow().len())
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all recorded events
    pub fn clear(&self) {
        self.events.lock(|events| events.borrow_mut().clear());
    }
}
