//! Pin registry
//!
//! Owns every [`InterruptSpec`], the per-pin ISR bindings and the glitch
//! filter handles, together with the pin driver and ISR service that
//! created them. All access goes through one async mutex, taken once per
//! operation: registration holds it for the whole configure/install/append
//! sequence, dispatch holds it only for the lookup and level sample.
//!
//! The mutex is never touched from interrupt context.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use heapless::Vec;
use tripwire_hal::{FilterError, IsrService, PinDriver};

use crate::channel::EventProducer;
use crate::config::{EventCallback, InterruptSpec};
use crate::error::Error;
use crate::isr::{on_pin_interrupt, IsrBinding};
use crate::state::{PinId, ResolvedEvent};

/// Maximum registered pins per dispatcher
pub const MAX_PINS: usize = 32;

/// Why an event could not be turned into a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum DispatchMiss {
    /// No spec for the pin (never added, or removed at shutdown)
    UnknownPin,
    /// Spec exists but has no callback
    MissingCallback,
}

/// Registry contents, guarded by [`Registry`]'s mutex
pub(crate) struct RegistryState<'d, D: PinDriver, S> {
    driver: D,
    isr: S,
    specs: Vec<InterruptSpec, MAX_PINS>,
    /// Contexts handed to the ISR service, one per installed pin
    bindings: Vec<IsrBinding<'d>, MAX_PINS>,
    filters: Vec<(PinId, D::FilterHandle), MAX_PINS>,
    /// Set once shutdown starts; no further registration
    sealed: bool,
}

impl<'d, D, S> RegistryState<'d, D, S>
where
    D: PinDriver,
    S: IsrService<IsrBinding<'d>>,
{
    pub(crate) fn new(driver: D, isr: S) -> Self {
        Self {
            driver,
            isr,
            specs: Vec::new(),
            bindings: Vec::new(),
            filters: Vec::new(),
            sealed: false,
        }
    }

    /// Validate, configure, install and record one pin
    ///
    /// Nothing is recorded unless the ISR was installed.
    pub(crate) fn register(
        &mut self,
        spec: InterruptSpec,
        producer: EventProducer<'d>,
    ) -> Result<(), Error> {
        let pin = spec.pin();

        if self.sealed {
            return Err(Error::ShutDown);
        }
        if spec.callback.is_none() {
            error!("No callback provided for GPIO {}, not registering interrupt", pin);
            return Err(Error::MissingCallback { pin });
        }
        if self.find(pin).is_some() {
            warn!("GPIO {} already has an interrupt registered", pin);
            return Err(Error::DuplicatePin { pin });
        }
        if self.specs.is_full() {
            return Err(Error::RegistryFull);
        }

        info!("Configuring interrupt for GPIO {}", pin);
        debug!("Config: {}", spec.config);

        if let Err(error) = self.driver.configure(pin, &spec.config.mode()) {
            error!("Failed to configure GPIO {}: {}", pin, error);
            return Err(Error::Configure { pin, error });
        }

        let filter = if spec.config.glitch_filter {
            self.enable_filter(pin)
        } else {
            None
        };

        let binding = IsrBinding::new(pin, producer);
        if let Err(error) = self.isr.install(pin, on_pin_interrupt, binding) {
            error!("Failed to install ISR for GPIO {}: {}", pin, error);
            if let Some(handle) = filter {
                self.driver.disable_glitch_filter(handle);
            }
            return Err(Error::Install { pin, error });
        }

        // All three tables share MAX_PINS and `specs` had room
        let _ = self.bindings.push(binding);
        if let Some(handle) = filter {
            let _ = self.filters.push((pin, handle));
        }
        let _ = self.specs.push(spec);
        Ok(())
    }

    fn enable_filter(&mut self, pin: PinId) -> Option<D::FilterHandle> {
        match self.driver.enable_glitch_filter(pin) {
            Ok(handle) => {
                info!("Enabled glitch filter for GPIO {}", pin);
                Some(handle)
            }
            Err(FilterError::Unsupported) => {
                warn!("Glitch filter not supported on this chip, GPIO {} unfiltered", pin);
                None
            }
            Err(e) => {
                error!("Failed to enable glitch filter for GPIO {}: {}", pin, e);
                None
            }
        }
    }

    fn find(&self, pin: PinId) -> Option<&InterruptSpec> {
        self.specs.iter().find(|spec| spec.pin() == pin)
    }

    /// Look up the callback for `pin` and sample its level
    pub(crate) fn resolve(
        &self,
        pin: PinId,
    ) -> Result<(EventCallback, ResolvedEvent), DispatchMiss> {
        let spec = self.find(pin).ok_or(DispatchMiss::UnknownPin)?;
        let callback = spec.callback.ok_or(DispatchMiss::MissingCallback)?;
        let level = self.driver.read_level(pin);
        let active = spec.config.active_level.is_active(level);
        Ok((callback, ResolvedEvent { pin, active }))
    }

    /// Uninstall every ISR and refuse further registration
    pub(crate) fn silence(&mut self) -> usize {
        self.sealed = true;
        let count = self.bindings.len();
        for binding in &self.bindings {
            self.isr.uninstall(binding.pin());
        }
        self.bindings.clear();
        count
    }

    /// Release filters and forget every spec
    pub(crate) fn teardown(&mut self) {
        while let Some((pin, handle)) = self.filters.pop() {
            debug!("Disabling glitch filter for GPIO {}", pin);
            self.driver.disable_glitch_filter(handle);
        }
        self.specs.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.specs.len()
    }
}

/// Locked access to the registered pins
pub struct Registry<'d, D: PinDriver, S> {
    state: Mutex<CriticalSectionRawMutex, RegistryState<'d, D, S>>,
    producer: EventProducer<'d>,
}

impl<'d, D, S> Registry<'d, D, S>
where
    D: PinDriver,
    S: IsrService<IsrBinding<'d>>,
{
    pub(crate) fn new(state: RegistryState<'d, D, S>, producer: EventProducer<'d>) -> Self {
        Self {
            state: Mutex::new(state),
            producer,
        }
    }

    /// Register a pin
    ///
    /// Fails with [`Error::MissingCallback`] for a spec without a callback,
    /// [`Error::DuplicatePin`] for a pin that is already registered, and
    /// with the driver's or ISR service's error if either rejects the pin.
    /// An unsupported glitch filter is not an error.
    pub async fn add(&self, spec: InterruptSpec) -> Result<(), Error> {
        self.state.lock().await.register(spec, self.producer)
    }

    /// Get the spec registered for `pin`
    pub async fn find(&self, pin: PinId) -> Option<InterruptSpec> {
        self.state.lock().await.find(pin).copied()
    }

    /// Registered pins in registration order
    pub async fn pins(&self) -> Vec<PinId, MAX_PINS> {
        self.state.lock().await.specs.iter().map(|spec| spec.pin()).collect()
    }

    /// Number of registered pins
    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    /// Check if no pins are registered
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub(crate) async fn resolve(
        &self,
        pin: PinId,
    ) -> Result<(EventCallback, ResolvedEvent), DispatchMiss> {
        self.state.lock().await.resolve(pin)
    }

    pub(crate) async fn silence(&self) -> usize {
        self.state.lock().await.silence()
    }

    pub(crate) async fn teardown(&self) {
        self.state.lock().await.teardown()
    }

    /// Silence and tear down without waiting, for use from `Drop`
    pub(crate) fn teardown_now(&mut self) {
        let state = self.state.get_mut();
        state.silence();
        state.teardown();
    }
}
