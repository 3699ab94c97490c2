//! # Events emitted by slots.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Stage events**: slot stage transitions
//! - **Module events**: child module construction, registration, failure
//! - **Resource events**: timers, intervals and abortable requests
//! - **Subscriber events**: delivery problems inside the subscriber set
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! slot and module identities, reasons, delays and counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use slotkeeper::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ModuleInitFailed)
//!     .with_slot("page")
//!     .with_module("widget")
//!     .with_reason("no data");
//!
//! assert_eq!(ev.kind, EventKind::ModuleInitFailed);
//! assert_eq!(ev.slot.as_deref(), Some("page"));
//! assert_eq!(ev.reason.as_deref(), Some("no data"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of slot events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Stage events ===
    /// Slot stage changed.
    ///
    /// Sets:
    /// - `slot`: slot module id
    /// - `reason`: `"<from> -> <to>"`
    StageChanged,

    // === Module events ===
    /// `init` was called on a slot that is not alive; nothing was constructed.
    ///
    /// Sets:
    /// - `slot`: slot module id
    /// - `module`: requested module type
    InitDiscarded,

    /// Host constructed a child module; its init is now running.
    ///
    /// Sets:
    /// - `slot`: slot module id
    /// - `module`: module type
    ModuleLoaded,

    /// Child module initialized and was inserted into the registry.
    ///
    /// Sets:
    /// - `slot`: slot module id
    /// - `module`: module type
    /// - `count`: number of registered instances of that type
    ModuleRegistered,

    /// Registry entry for a type was promoted from a single instance to a sequence.
    ///
    /// Sets:
    /// - `slot`: slot module id
    /// - `module`: module type
    ModulePromoted,

    /// Child module init failed; the module was disposed.
    ///
    /// Sets:
    /// - `slot`: slot module id
    /// - `module`: module type
    /// - `reason`: error message
    ModuleInitFailed,

    // === Resource events ===
    /// Timeout scheduled and tracked.
    ///
    /// Sets:
    /// - `slot`, `delay_ms`
    TimeoutScheduled,

    /// Interval scheduled and tracked.
    ///
    /// Sets:
    /// - `slot`, `delay_ms`
    IntervalScheduled,

    /// Tracked timeouts cancelled.
    ///
    /// Sets:
    /// - `slot`, `count`
    TimeoutsCleared,

    /// Tracked intervals cancelled.
    ///
    /// Sets:
    /// - `slot`, `count`
    IntervalsCleared,

    /// Abortable request emitted by a component and tracked.
    ///
    /// Sets:
    /// - `slot`, `reason` (component name)
    RequestTracked,

    /// Tracked request completed and was removed.
    ///
    /// Sets:
    /// - `slot`, `reason` (component name)
    RequestDone,

    /// Tracked requests aborted.
    ///
    /// Sets:
    /// - `slot`, `count`
    RequestsAborted,

    /// All slot resources released (timeouts, intervals, requests).
    ///
    /// Sets:
    /// - `slot`
    ResourcesReleased,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Slot event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Module id of the slot that emitted the event.
    pub slot: Option<Arc<str>>,
    /// Module type (or subscriber name for subscriber events).
    pub module: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Timer delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Number of items affected.
    pub count: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            slot: None,
            module: None,
            reason: None,
            delay_ms: None,
            count: None,
        }
    }

    /// Attaches the emitting slot's module id.
    #[inline]
    pub fn with_slot(mut self, slot: impl Into<Arc<str>>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    /// Attaches a module type.
    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timer delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an item count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_module(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_module(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TimeoutScheduled);
        let b = Event::new(EventKind::TimeoutScheduled);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::IntervalScheduled)
            .with_delay(Duration::from_secs(u64::MAX / 2));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_overflow_helper() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert!(!ev.is_subscriber_panic());
        assert_eq!(ev.module.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
    }
}
