//! Interrupt-safe event channel
//!
//! A bounded FIFO of [`PinEvent`]s built on an embassy channel behind a
//! critical-section mutex, so pushes are safe from any interrupt.
//!
//! The channel hands out two capabilities:
//! - [`EventProducer`]: `Copy`, push-only, never blocks or allocates.
//!   This is the only thing interrupt handlers get to touch.
//! - [`EventConsumer`]: unique, may suspend while the queue is empty.
//!
//! When the queue is full the newest event is dropped and counted.

use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::state::{PinEvent, PinId};

/// Default queue depth
pub const DEFAULT_QUEUE_DEPTH: usize = 10;

/// Errors from claiming a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelError {
    /// Channel has no storage
    ZeroCapacity,
    /// The consumer is owned by another dispatcher
    InUse,
}

/// Type-erased queue operations, so capabilities don't carry `N`
pub(crate) trait EventQueue: Sync {
    fn try_push(&self, event: PinEvent) -> bool;
    fn try_pop(&self) -> Option<PinEvent>;
    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<PinEvent>;
    fn poll_push(&self, cx: &mut Context<'_>, event: PinEvent) -> Poll<()>;
    fn clear(&self);
    fn release(&self);
    fn dropped(&self) -> u32;
}

/// Bounded pin event channel with `N` slots
pub struct EventChannel<const N: usize = DEFAULT_QUEUE_DEPTH> {
    queue: Channel<CriticalSectionRawMutex, PinEvent, N>,
    /// Pushes rejected because the queue was full
    dropped: AtomicU32,
    /// Consumer is outstanding
    claimed: AtomicBool,
}

impl<const N: usize> Default for EventChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventChannel<N> {
    /// Create an empty channel
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            dropped: AtomicU32::new(0),
            claimed: AtomicBool::new(false),
        }
    }

    /// Hand out the producer and the single consumer
    ///
    /// Fails if the channel has no capacity or its consumer is still
    /// owned by a previous split that was not released.
    pub fn split(&self) -> Result<(EventProducer<'_>, EventConsumer<'_>), ChannelError> {
        if N == 0 {
            return Err(ChannelError::ZeroCapacity);
        }
        if self.claimed.swap(true, Ordering::AcqRel) {
            return Err(ChannelError::InUse);
        }
        Ok((EventProducer { queue: self }, EventConsumer { queue: self }))
    }

    /// Get an additional producer
    pub fn producer(&self) -> EventProducer<'_> {
        EventProducer { queue: self }
    }

    /// Number of events rejected because the queue was full
    pub fn dropped_events(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no events are queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of queued events
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Check if the consumer is currently handed out
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

impl<const N: usize> EventQueue for EventChannel<N> {
    fn try_push(&self, event: PinEvent) -> bool {
        if self.queue.try_send(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    fn try_pop(&self) -> Option<PinEvent> {
        self.queue.try_receive().ok()
    }

    fn poll_pop(&self, cx: &mut Context<'_>) -> Poll<PinEvent> {
        self.queue.poll_receive(cx)
    }

    fn poll_push(&self, cx: &mut Context<'_>, event: PinEvent) -> Poll<()> {
        match self.queue.poll_ready_to_send(cx) {
            Poll::Ready(()) => {
                if self.queue.try_send(event).is_ok() {
                    Poll::Ready(())
                } else {
                    // Lost the slot to an interrupt, try again
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn clear(&self) {
        self.queue.clear();
    }

    fn release(&self) {
        self.queue.clear();
        self.claimed.store(false, Ordering::Release);
    }

    fn dropped(&self) -> u32 {
        self.dropped_events()
    }
}

/// Push side of the channel
///
/// Safe to use from interrupt context: no locks held across calls, no
/// allocation, no blocking.
#[derive(Clone, Copy)]
pub struct EventProducer<'d> {
    queue: &'d dyn EventQueue,
}

impl EventProducer<'_> {
    /// Enqueue a trigger for `pin` without blocking
    ///
    /// Returns `false` and drops the event if the queue is full. The
    /// shutdown sentinel can't be sent through a producer.
    #[inline]
    pub fn try_push(&self, pin: PinId) -> bool {
        self.queue.try_push(PinEvent::Triggered(pin))
    }
}

impl core::fmt::Debug for EventProducer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventProducer").finish_non_exhaustive()
    }
}

/// Pop side of the channel
///
/// There is exactly one per split, and it is only used from task context.
pub struct EventConsumer<'d> {
    queue: &'d dyn EventQueue,
}

impl EventConsumer<'_> {
    /// Wait for the next event
    pub async fn pop(&mut self) -> PinEvent {
        let queue = self.queue;
        poll_fn(|cx| queue.poll_pop(cx)).await
    }

    /// Take the next event if one is queued
    pub fn try_pop(&mut self) -> Option<PinEvent> {
        self.queue.try_pop()
    }
}

/// Enqueue from task context, waiting for a free slot
pub(crate) async fn push_waiting(queue: &dyn EventQueue, event: PinEvent) {
    poll_fn(|cx| queue.poll_push(cx, event)).await
}
