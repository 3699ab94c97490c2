//! # Resource tracking: timers, intervals and abortable requests.
//!
//! Every asynchronous resource a slot creates on its owner's behalf is recorded
//! here so that it can be revoked when the slot dies.
//!
//! ## Architecture
//! ```text
//! Slot::set_timeout ──► Timers::set_timeout ──► TimerTracker::track (timeouts)
//! Slot::set_interval ─► Timers::set_interval ─► TimerTracker::track (intervals)
//! component "abortable" event ──► RequestTracker::track
//! component "done" event      ──► RequestTracker::complete
//!
//! Slot::release()
//!   ├─► TimerTracker::drain(timeouts)  → Timers::clear_timeout  (each)
//!   ├─► TimerTracker::drain(intervals) → Timers::clear_interval (each)
//!   └─► RequestTracker::abort_all()    → Abortable::abort       (each)
//! ```
//!
//! ## Rules
//! - Gated tracking re-checks the stage **under the lock**: a handle either lands
//!   before the death drain (and is revoked by it) or is refused.
//! - Drains take the sequence out of the lock before cancelling, so callbacks
//!   fired by cancellation may re-enter the tracker.
//! - Requests are compared by `Arc` identity; a request is tracked at most once.

use std::mem;
use std::sync::{Arc, Mutex};

use crate::host::{RequestRef, TimerHandle};

use super::{lock, StageCell};

/// Outcome of a gated `track` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tracked {
    /// Handle recorded.
    Added,
    /// Handle was already recorded (requests only).
    Duplicate,
    /// Slot not alive; handle refused and must be revoked by the caller.
    Refused,
}

/// Ordered sequence of timer handles of one kind.
#[derive(Default)]
pub(crate) struct TimerTracker {
    handles: Mutex<Vec<TimerHandle>>,
}

impl TimerTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `handle`, refusing it if `gate` reports the slot not alive.
    pub(crate) fn track(&self, handle: TimerHandle, gate: Option<&StageCell>) -> Tracked {
        let mut handles = lock(&self.handles);
        if gate.is_some_and(StageCell::is_not_alive) {
            return Tracked::Refused;
        }
        handles.push(handle);
        Tracked::Added
    }

    /// Removes and returns every recorded handle.
    pub(crate) fn drain(&self) -> Vec<TimerHandle> {
        mem::take(&mut *lock(&self.handles))
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.handles).len()
    }
}

/// Abortable requests started by the slot's components.
#[derive(Default)]
pub(crate) struct RequestTracker {
    requests: Mutex<Vec<RequestRef>>,
}

impl RequestTracker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records `req` unless it is already tracked or the slot is not alive.
    pub(crate) fn track(&self, req: RequestRef, stage: &StageCell) -> Tracked {
        let mut requests = lock(&self.requests);
        if stage.is_not_alive() {
            return Tracked::Refused;
        }
        if requests.iter().any(|r| Arc::ptr_eq(r, &req)) {
            return Tracked::Duplicate;
        }
        requests.push(req);
        Tracked::Added
    }

    /// Forgets a finished request. Returns false if it was not tracked.
    pub(crate) fn complete(&self, req: &RequestRef) -> bool {
        let mut requests = lock(&self.requests);
        let before = requests.len();
        requests.retain(|r| !Arc::ptr_eq(r, req));
        requests.len() != before
    }

    /// Aborts and forgets every tracked request. Returns how many were aborted.
    pub(crate) fn abort_all(&self) -> usize {
        let drained = mem::take(&mut *lock(&self.requests));
        for req in &drained {
            req.abort();
        }
        drained.len()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;
    use crate::testing::TestRequest;

    #[test]
    fn test_timer_tracker_gate() {
        let stage = StageCell::new();
        let timers = TimerTracker::new();

        assert_eq!(timers.track(TimerHandle::new(), Some(&stage)), Tracked::Added);
        stage.advance(Stage::Killed).unwrap();
        assert_eq!(timers.track(TimerHandle::new(), Some(&stage)), Tracked::Refused);
        assert_eq!(timers.track(TimerHandle::new(), None), Tracked::Added);
        assert_eq!(timers.len(), 2);

        assert_eq!(timers.drain().len(), 2);
        assert!(timers.drain().is_empty());
    }

    #[test]
    fn test_request_identity() {
        let stage = StageCell::new();
        let tracker = RequestTracker::new();
        let (a, a_aborts) = TestRequest::new();
        let (b, b_aborts) = TestRequest::new();

        assert_eq!(tracker.track(a.clone(), &stage), Tracked::Added);
        assert_eq!(tracker.track(a.clone(), &stage), Tracked::Duplicate);
        assert_eq!(tracker.track(b.clone(), &stage), Tracked::Added);
        assert_eq!(tracker.len(), 2);

        assert!(tracker.complete(&a));
        assert!(!tracker.complete(&a));

        assert_eq!(tracker.abort_all(), 1);
        assert_eq!(a_aborts.aborts(), 0);
        assert_eq!(b_aborts.aborts(), 1);
        assert_eq!(tracker.abort_all(), 0);
        assert_eq!(b_aborts.aborts(), 1);
    }

    #[test]
    fn test_request_refused_after_death() {
        let stage = StageCell::new();
        let tracker = RequestTracker::new();
        stage.advance(Stage::Disposed).unwrap();

        let (req, _aborts) = TestRequest::new();
        assert_eq!(tracker.track(req, &stage), Tracked::Refused);
        assert_eq!(tracker.len(), 0);
    }
}
