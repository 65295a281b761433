//! Interrupt dispatcher
//!
//! [`PinInterrupts`] owns the registry and the consumer side of an
//! [`EventChannel`]. A task drives [`PinInterrupts::run`], which drains the
//! channel and calls each pin's callback in task context. Interrupt
//! handlers only ever push pin numbers.
//!
//! # Lifecycle
//!
//! ```text
//!   new() ──► Idle ──run()──► Running ──sentinel──► Stopped
//!               │                                     ▲
//!               └──────────── shutdown() ─────────────┘
//! ```
//!
//! [`PinInterrupts::shutdown`] uninstalls every handler, stops the task if
//! it is running, releases glitch filters and finally returns the channel
//! so it can be split again.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, Ordering};
use tripwire_hal::{IsrService, PinDriver};

use crate::channel::{push_waiting, EventChannel, EventConsumer, EventQueue};
use crate::config::InterruptSpec;
use crate::error::Error;
use crate::isr::{IsrBinding, ISR_SERVICE};
use crate::registry::{DispatchMiss, Registry, RegistryState};
use crate::state::{DispatcherState, PinEvent, PinId, Transition};

/// Dispatch counters
///
/// Each counter wraps on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchStats {
    /// Callbacks invoked
    pub dispatched: u32,
    /// Events for pins with no registered spec
    pub unknown_pin: u32,
    /// Events for specs without a callback
    pub missing_callback: u32,
    /// Events dropped because shutdown was in progress
    pub discarded: u32,
}

struct Lifecycle<'d> {
    state: DispatcherState,
    /// Held until a task claims it in `run`
    consumer: Option<EventConsumer<'d>>,
}

/// Deferred GPIO interrupt dispatcher
pub struct PinInterrupts<'d, D: PinDriver, S: IsrService<IsrBinding<'d>>> {
    registry: Registry<'d, D, S>,
    queue: &'d dyn EventQueue,
    lifecycle: Mutex<CriticalSectionRawMutex, RefCell<Lifecycle<'d>>>,
    shutdown_requested: AtomicBool,
    /// Channel handed back, nothing left to undo
    released: AtomicBool,
    stopped: Signal<CriticalSectionRawMutex, ()>,
    stats: Mutex<CriticalSectionRawMutex, Cell<DispatchStats>>,
}

impl<'d, D, S> PinInterrupts<'d, D, S>
where
    D: PinDriver,
    S: IsrService<IsrBinding<'d>>,
{
    /// Claim `channel`, enable the ISR service and register `specs`
    ///
    /// Only a channel that can't be split or an ISR service that can't be
    /// enabled fails construction. A spec that can't be registered is
    /// logged and skipped; check [`Registry::pins`] for what made it in.
    pub fn new<const N: usize>(
        channel: &'d EventChannel<N>,
        driver: D,
        mut isr: S,
        specs: &[InterruptSpec],
    ) -> Result<Self, Error> {
        let (producer, consumer) = channel.split()?;

        if let Err(e) = ISR_SERVICE.ensure_initialized::<IsrBinding<'d>, S>(&mut isr) {
            error!("Failed to enable GPIO ISR service: {}", e);
            channel.release();
            return Err(Error::IsrService(e));
        }

        let mut state = RegistryState::new(driver, isr);
        for spec in specs {
            match state.register(*spec, producer) {
                Ok(()) => {}
                Err(e) if e.is_pin_error() => {
                    error!("Skipping interrupt for GPIO {}: {}", spec.pin(), e);
                }
                Err(e) => {
                    error!("Stopped registering at GPIO {}: {}", spec.pin(), e);
                    break;
                }
            }
        }

        info!(
            "Interrupt dispatcher ready: {} pins, queue depth {}",
            state.len(),
            N
        );

        Ok(Self {
            registry: Registry::new(state, producer),
            queue: channel,
            lifecycle: Mutex::new(RefCell::new(Lifecycle {
                state: DispatcherState::Idle,
                consumer: Some(consumer),
            })),
            shutdown_requested: AtomicBool::new(false),
            released: AtomicBool::new(false),
            stopped: Signal::new(),
            stats: Mutex::new(Cell::new(DispatchStats::default())),
        })
    }

    /// Register another pin
    ///
    /// May be called from any task while the dispatcher runs. Callbacks run
    /// outside the registry lock, so work they kick off may register pins.
    pub async fn add_interrupt(&self, spec: InterruptSpec) -> Result<(), Error> {
        if self.shutdown_requested.load(Ordering::Acquire) || self.state().is_terminal() {
            return Err(Error::ShutDown);
        }
        self.registry.add(spec).await
    }

    /// Registered pins
    pub fn registry(&self) -> &Registry<'d, D, S> {
        &self.registry
    }

    /// Current lifecycle state
    pub fn state(&self) -> DispatcherState {
        self.lifecycle.lock(|lifecycle| lifecycle.borrow().state)
    }

    /// Dispatch counters so far
    pub fn stats(&self) -> DispatchStats {
        self.stats.lock(|stats| stats.get())
    }

    /// Interrupts lost because the channel was full
    pub fn dropped_events(&self) -> u32 {
        self.queue.dropped()
    }

    /// Check if shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Drain the channel and invoke callbacks until shut down
    ///
    /// Returns once the shutdown sentinel is consumed. Only one task may
    /// run the dispatcher, and only once. The future must be polled to
    /// completion; dropping it early leaves the dispatcher `Running` and
    /// [`shutdown`](Self::shutdown) would wait for it forever.
    pub async fn run(&self) -> Result<(), Error> {
        let mut consumer = self.lifecycle.lock(|lifecycle| {
            let mut lifecycle = lifecycle.borrow_mut();
            match lifecycle.state {
                DispatcherState::Running => return Err(Error::AlreadyRunning),
                DispatcherState::Stopped => return Err(Error::ShutDown),
                DispatcherState::Idle => {}
            }
            if self.shutdown_requested.load(Ordering::Acquire) {
                return Err(Error::ShutDown);
            }
            let consumer = lifecycle.consumer.take().ok_or(Error::AlreadyRunning)?;
            lifecycle.state = lifecycle.state.transition(Transition::Start);
            Ok(consumer)
        })?;

        info!("Interrupt dispatcher running");

        loop {
            match consumer.pop().await {
                PinEvent::Shutdown => break,
                PinEvent::Triggered(pin) => self.dispatch(pin).await,
            }
        }

        self.lifecycle.lock(|lifecycle| {
            let mut lifecycle = lifecycle.borrow_mut();
            lifecycle.state = lifecycle.state.transition(Transition::Sentinel);
        });
        debug!("Interrupt dispatcher exited");
        self.stopped.signal(());
        Ok(())
    }

    async fn dispatch(&self, pin: PinId) {
        if self.shutdown_requested.load(Ordering::Acquire) {
            self.count(|stats| stats.discarded = stats.discarded.wrapping_add(1));
            return;
        }

        let resolved = self.registry.resolve(pin).await;

        // Shutdown may have started while waiting for the registry
        if self.shutdown_requested.load(Ordering::Acquire) {
            self.count(|stats| stats.discarded = stats.discarded.wrapping_add(1));
            return;
        }

        match resolved {
            Ok((callback, event)) => {
                trace!("GPIO {} active={}", event.pin, event.active);
                callback(event);
                self.count(|stats| stats.dispatched = stats.dispatched.wrapping_add(1));
            }
            Err(DispatchMiss::UnknownPin) => {
                error!("Received interrupt for unregistered GPIO {}", pin);
                self.count(|stats| stats.unknown_pin = stats.unknown_pin.wrapping_add(1));
            }
            Err(DispatchMiss::MissingCallback) => {
                error!("No callback registered for GPIO {}", pin);
                self.count(|stats| stats.missing_callback = stats.missing_callback.wrapping_add(1));
            }
        }
    }

    fn count(&self, f: impl FnOnce(&mut DispatchStats)) {
        self.stats.lock(|stats| {
            let mut current = stats.get();
            f(&mut current);
            stats.set(current);
        });
    }

    /// Stop dispatching and release all hardware
    ///
    /// Waits for a running dispatcher to exit. Events still queued are
    /// discarded without invoking callbacks. Calling it again returns
    /// immediately.
    pub async fn shutdown(&self) {
        if self.shutdown_requested.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Shutting down interrupt dispatcher");

        let silenced = self.registry.silence().await;
        debug!("Uninstalled {} interrupt handlers", silenced);

        let running = self.lifecycle.lock(|lifecycle| {
            let mut lifecycle = lifecycle.borrow_mut();
            if lifecycle.state == DispatcherState::Idle {
                lifecycle.state = lifecycle.state.transition(Transition::Abandon);
                lifecycle.consumer = None;
            }
            lifecycle.state.is_running()
        });

        if running {
            self.queue.clear();
            push_waiting(self.queue, PinEvent::Shutdown).await;
            self.stopped.wait().await;
        }

        self.registry.teardown().await;
        self.queue.release();
        self.released.store(true, Ordering::Release);
        info!("Interrupt dispatcher stopped");
    }
}

impl<'d, D, S> Drop for PinInterrupts<'d, D, S>
where
    D: PinDriver,
    S: IsrService<IsrBinding<'d>>,
{
    fn drop(&mut self) {
        if self.released.load(Ordering::Acquire) {
            return;
        }
        self.shutdown_requested.store(true, Ordering::Release);
        self.registry.teardown_now();
        self.queue.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinConfig;
    use crate::mock::{CallbackLog, MockBoard};
    use crate::registry::MAX_PINS;
    use crate::state::ResolvedEvent;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_futures::yield_now;
    use tripwire_hal::{InterruptType, Level};

    /// Let the dispatcher drain whatever is queued
    async fn settle() {
        for _ in 0..8 {
            yield_now().await;
        }
    }

    #[test]
    fn test_active_high_edge_dispatched_once() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<10>::new();
        let board = MockBoard::new();
        let config = PinConfig::active_high(4).with_trigger(InterruptType::AnyEdge);
        let interrupts = PinInterrupts::new(
            &channel,
            &board,
            &board,
            &[InterruptSpec::new(config, &on_event)],
        )
        .unwrap();
        assert!(ISR_SERVICE.is_initialized());
        assert!(board.is_installed(4));

        block_on(async {
            let (result, _) = join(interrupts.run(), async {
                settle().await;
                assert_eq!(interrupts.state(), DispatcherState::Running);

                board.set_level(4, Level::High);
                assert!(board.fire(4));
                settle().await;
                assert_eq!(
                    LOG.events().as_slice(),
                    &[ResolvedEvent { pin: 4, active: true }]
                );

                interrupts.shutdown().await;
            })
            .await;
            assert_eq!(result, Ok(()));
        });

        assert_eq!(LOG.len(), 1);
        assert_eq!(interrupts.stats().dispatched, 1);
        assert_eq!(interrupts.state(), DispatcherState::Stopped);
    }

    #[test]
    fn test_missing_callback_never_installed() {
        let channel = EventChannel::<10>::new();
        let board = MockBoard::new();
        let spec = InterruptSpec::without_callback(PinConfig::new(7));
        let interrupts = PinInterrupts::new(&channel, &board, &board, &[spec]).unwrap();

        block_on(async {
            assert!(interrupts.registry().is_empty().await);
            assert_eq!(
                interrupts.add_interrupt(spec).await,
                Err(Error::MissingCallback { pin: 7 })
            );
        });
        assert!(!board.is_installed(7));
        assert!(!board.fire(7));
        assert!(channel.is_empty());
    }

    #[test]
    fn test_level_resolution_follows_active_level() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<10>::new();
        let board = MockBoard::new();
        let specs = [
            InterruptSpec::new(PinConfig::active_high(1), &on_event),
            InterruptSpec::new(PinConfig::active_low(2).with_pull_up(), &on_event),
        ];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            join(interrupts.run(), async {
                board.set_level(1, Level::High);
                board.set_level(2, Level::High);
                board.fire(1);
                board.fire(2);
                settle().await;

                board.set_level(1, Level::Low);
                board.set_level(2, Level::Low);
                board.fire(1);
                board.fire(2);
                settle().await;

                interrupts.shutdown().await;
            })
            .await;
        });

        assert_eq!(
            LOG.events().as_slice(),
            &[
                ResolvedEvent { pin: 1, active: true },
                ResolvedEvent { pin: 2, active: false },
                ResolvedEvent { pin: 1, active: false },
                ResolvedEvent { pin: 2, active: true },
            ]
        );
    }

    #[test]
    fn test_each_event_reaches_its_own_callback() {
        static LOG_A: CallbackLog = CallbackLog::new();
        static LOG_B: CallbackLog = CallbackLog::new();
        static LOG_C: CallbackLog = CallbackLog::new();
        fn on_a(event: ResolvedEvent) {
            LOG_A.record(event);
        }
        fn on_b(event: ResolvedEvent) {
            LOG_B.record(event);
        }
        fn on_c(event: ResolvedEvent) {
            LOG_C.record(event);
        }

        let channel = EventChannel::<10>::new();
        let board = MockBoard::new();
        // Registration order differs from pin order
        let specs = [
            InterruptSpec::new(PinConfig::new(5), &on_b),
            InterruptSpec::new(PinConfig::new(3), &on_a),
            InterruptSpec::new(PinConfig::new(11), &on_c),
        ];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            join(interrupts.run(), async {
                for pin in [5, 3, 5, 5, 11] {
                    board.fire(pin);
                }
                settle().await;
                interrupts.shutdown().await;
            })
            .await;
        });

        let pins = |log: &CallbackLog| -> heapless::Vec<PinId, 8> {
            log.events().iter().map(|e| e.pin).collect()
        };
        assert_eq!(pins(&LOG_A).as_slice(), &[3]);
        assert_eq!(pins(&LOG_B).as_slice(), &[5, 5, 5]);
        assert_eq!(pins(&LOG_C).as_slice(), &[11]);
        assert_eq!(interrupts.stats().dispatched, 5);
        assert_eq!(interrupts.dropped_events(), 0);
    }

    #[test]
    fn test_overflow_before_run_drops_newest() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<2>::new();
        let board = MockBoard::new();
        let specs = [InterruptSpec::new(PinConfig::new(6), &on_event)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        // Handlers are live before the task starts
        for _ in 0..4 {
            board.fire(6);
        }
        assert_eq!(interrupts.dropped_events(), 2);

        block_on(async {
            join(interrupts.run(), async {
                settle().await;
                interrupts.shutdown().await;
            })
            .await;
        });
        assert_eq!(LOG.len(), 2);
    }

    #[test]
    fn test_unknown_pin_counted() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let specs = [InterruptSpec::new(PinConfig::new(1), &on_event)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            join(interrupts.run(), async {
                channel.producer().try_push(9);
                board.set_level(1, Level::High);
                board.fire(1);
                settle().await;
                interrupts.shutdown().await;
            })
            .await;
        });

        let stats = interrupts.stats();
        assert_eq!(stats.unknown_pin, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(LOG.events().as_slice(), &[ResolvedEvent { pin: 1, active: true }]);
    }

    #[test]
    fn test_events_discarded_once_shutdown_requested() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let specs = [InterruptSpec::new(PinConfig::new(2), &on_event)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        interrupts.shutdown_requested.store(true, Ordering::Release);
        block_on(interrupts.dispatch(2));

        assert!(LOG.is_empty());
        assert_eq!(interrupts.stats().discarded, 1);
        assert_eq!(interrupts.stats().dispatched, 0);
    }

    #[test]
    fn test_shutdown_stops_blocked_dispatcher() {
        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        fn noop(_event: ResolvedEvent) {}
        let specs = [InterruptSpec::new(PinConfig::new(8).with_glitch_filter(), &noop)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();
        assert!(board.filter_active(8));

        block_on(async {
            let (result, _) = join(interrupts.run(), async {
                // Dispatcher is parked on an empty queue
                settle().await;
                interrupts.shutdown().await;
                assert_eq!(interrupts.state(), DispatcherState::Stopped);
            })
            .await;
            assert_eq!(result, Ok(()));
        });

        assert_eq!(board.installed_count(), 0);
        assert!(!board.filter_active(8));
        assert!(!channel.is_claimed());
        assert!(channel.is_empty());
        assert!(!board.fire(8));
    }

    #[test]
    fn test_shutdown_discards_queued_events() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let specs = [InterruptSpec::new(PinConfig::new(2), &on_event)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            join(interrupts.run(), async {
                settle().await;
                board.fire(2);
                board.fire(2);
                interrupts.shutdown().await;
            })
            .await;
        });

        assert!(LOG.is_empty());
        assert_eq!(interrupts.stats().dispatched, 0);
    }

    #[test]
    fn test_shutdown_before_run() {
        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        fn noop(_event: ResolvedEvent) {}
        let specs = [InterruptSpec::new(PinConfig::new(3), &noop)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            interrupts.shutdown().await;
            assert_eq!(interrupts.state(), DispatcherState::Stopped);
            assert_eq!(interrupts.run().await, Err(Error::ShutDown));
            assert_eq!(
                interrupts
                    .add_interrupt(InterruptSpec::new(PinConfig::new(4), &noop))
                    .await,
                Err(Error::ShutDown)
            );

            // Second call is a no-op
            interrupts.shutdown().await;
        });

        assert_eq!(board.installed_count(), 0);
        assert!(interrupts.is_shutting_down());
        assert!(!channel.is_claimed());
    }

    #[test]
    fn test_run_twice_rejected() {
        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let interrupts = PinInterrupts::new(&channel, &board, &board, &[]).unwrap();

        block_on(async {
            let (first, _) = join(interrupts.run(), async {
                settle().await;
                assert_eq!(interrupts.run().await, Err(Error::AlreadyRunning));
                interrupts.shutdown().await;
            })
            .await;
            assert_eq!(first, Ok(()));
            assert_eq!(interrupts.run().await, Err(Error::ShutDown));
        });
    }

    #[test]
    fn test_channel_claimed_by_one_dispatcher() {
        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let first = PinInterrupts::new(&channel, &board, &board, &[]).unwrap();

        let second = PinInterrupts::new(&channel, &board, &board, &[]);
        assert!(matches!(
            second,
            Err(Error::Channel(crate::channel::ChannelError::InUse))
        ));

        block_on(first.shutdown());
        drop(first);

        let reused = PinInterrupts::new(&channel, &board, &board, &[]);
        assert!(reused.is_ok());
    }

    #[test]
    fn test_drop_releases_hardware() {
        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        fn noop(_event: ResolvedEvent) {}
        let specs = [InterruptSpec::new(PinConfig::new(9).with_glitch_filter(), &noop)];

        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();
        assert!(board.is_installed(9));
        drop(interrupts);

        assert!(!board.is_installed(9));
        assert!(!board.filter_active(9));
        assert!(!channel.is_claimed());
    }

    #[test]
    fn test_failed_specs_skipped_at_construction() {
        let channel = EventChannel::<4>::new();
        let board = MockBoard::new().fail_install_on(5).fail_configure_on(6);
        fn noop(_event: ResolvedEvent) {}
        let specs = [
            InterruptSpec::new(PinConfig::new(4), &noop),
            InterruptSpec::new(PinConfig::new(5), &noop),
            InterruptSpec::new(PinConfig::new(6), &noop),
            InterruptSpec::without_callback(PinConfig::new(7)),
            InterruptSpec::new(PinConfig::new(4), &noop),
            InterruptSpec::new(PinConfig::new(8), &noop),
        ];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            assert_eq!(interrupts.registry().pins().await.as_slice(), &[4, 8]);
        });
        assert_eq!(board.installed_count(), 2);
    }

    #[test]
    fn test_unsupported_filter_still_dispatches() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new().without_glitch_filter();
        let specs = [InterruptSpec::new(
            PinConfig::active_low(10).with_glitch_filter(),
            &on_event,
        )];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();
        assert!(!board.filter_active(10));

        block_on(async {
            join(interrupts.run(), async {
                board.fire(10);
                settle().await;
                interrupts.shutdown().await;
            })
            .await;
        });

        assert_eq!(
            LOG.events().as_slice(),
            &[ResolvedEvent { pin: 10, active: true }]
        );
    }

    #[test]
    fn test_add_interrupt_while_running() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let interrupts = PinInterrupts::new(&channel, &board, &board, &[]).unwrap();

        block_on(async {
            join(interrupts.run(), async {
                settle().await;
                assert!(!board.fire(12));

                let spec = InterruptSpec::new(
                    PinConfig::new(12).with_trigger(InterruptType::RisingEdge),
                    &on_event,
                );
                assert_eq!(interrupts.add_interrupt(spec).await, Ok(()));
                assert_eq!(
                    interrupts.add_interrupt(spec).await,
                    Err(Error::DuplicatePin { pin: 12 })
                );

                board.set_level(12, Level::High);
                assert!(board.fire(12));
                settle().await;
                interrupts.shutdown().await;
            })
            .await;
        });

        assert_eq!(
            board.mode(12).map(|mode| mode.trigger),
            Some(InterruptType::RisingEdge)
        );
        assert_eq!(
            LOG.events().as_slice(),
            &[ResolvedEvent { pin: 12, active: true }]
        );
    }

    #[test]
    fn test_counters_wrap() {
        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let interrupts = PinInterrupts::new(&channel, &board, &board, &[]).unwrap();

        interrupts.stats.lock(|stats| {
            stats.set(DispatchStats {
                unknown_pin: u32::MAX,
                ..DispatchStats::default()
            })
        });
        block_on(interrupts.dispatch(1));
        assert_eq!(interrupts.stats().unknown_pin, 0);
    }

    #[test]
    fn test_producer_cannot_stop_dispatcher() {
        static LOG: CallbackLog = CallbackLog::new();
        fn on_event(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let specs = [InterruptSpec::new(PinConfig::new(4), &on_event)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            join(interrupts.run(), async {
                let producer = channel.producer();
                for pin in [4, 200, 4] {
                    assert!(producer.try_push(pin));
                }
                settle().await;

                assert_eq!(interrupts.state(), DispatcherState::Running);
                assert!(!interrupts.is_shutting_down());
                assert!(board.is_installed(4));
                assert_eq!(LOG.len(), 2);

                interrupts.shutdown().await;
            })
            .await;
        });

        assert!(interrupts.state().is_terminal());
        let late = InterruptSpec::new(PinConfig::new(5), &on_event);
        assert_eq!(block_on(interrupts.add_interrupt(late)), Err(Error::ShutDown));
        assert!(!board.is_installed(5));
    }

    #[test]
    fn test_callback_work_registers_pin_while_running() {
        static REGISTER_NEXT: Signal<CriticalSectionRawMutex, ()> = Signal::new();
        static LOG: CallbackLog = CallbackLog::new();
        fn on_first(_event: ResolvedEvent) {
            REGISTER_NEXT.signal(());
        }
        fn on_second(event: ResolvedEvent) {
            LOG.record(event);
        }

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let specs = [InterruptSpec::new(PinConfig::new(1), &on_first)];
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            join(interrupts.run(), async {
                settle().await;
                assert!(!board.fire(2));
                assert!(board.fire(1));

                // Woken from inside the pin 1 callback
                REGISTER_NEXT.wait().await;
                let spec = InterruptSpec::new(PinConfig::active_low(2), &on_second);
                assert_eq!(interrupts.add_interrupt(spec).await, Ok(()));
                assert_eq!(interrupts.state(), DispatcherState::Running);

                assert!(board.fire(2));
                settle().await;
                interrupts.shutdown().await;
            })
            .await;
        });

        assert_eq!(
            LOG.events().as_slice(),
            &[ResolvedEvent { pin: 2, active: true }]
        );
        assert_eq!(interrupts.stats().dispatched, 2);
    }

    #[test]
    fn test_full_registry_stops_batch() {
        fn noop(_event: ResolvedEvent) {}

        let channel = EventChannel::<4>::new();
        let board = MockBoard::new();
        let specs: heapless::Vec<InterruptSpec, { MAX_PINS + 2 }> = (0..MAX_PINS as u8 + 2)
            .map(|pin| InterruptSpec::new(PinConfig::new(pin), &noop))
            .collect();
        let interrupts = PinInterrupts::new(&channel, &board, &board, &specs).unwrap();

        block_on(async {
            assert_eq!(interrupts.registry().len().await, MAX_PINS);
        });
        assert!(!board.is_installed(MAX_PINS as u8));
        assert!(!board.is_installed(MAX_PINS as u8 + 1));
    }
}
