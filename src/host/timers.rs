//! # Cancelable timer primitives.
//!
//! [`Timers`] is the low-level scheduling contract the slot wraps with stage
//! gating and tracking. [`TokioTimers`] is the default implementation: each
//! timer is a spawned task racing `tokio::time::sleep` against the handle's
//! [`CancellationToken`].
//!
//! ## Rules
//! - Cancelling a handle twice (or after it fired) is a no-op.
//! - `set_*` may return `None` when the primitive cannot schedule (e.g. no
//!   tokio runtime is running); the slot then tracks nothing.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

/// Callback of a one-shot timer.
pub type TimeoutFn = Box<dyn FnOnce() + Send + 'static>;

/// Callback of a repeating timer.
pub type IntervalFn = Box<dyn FnMut() + Send + 'static>;

static TIMER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque handle of a scheduled timeout or interval.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    id: u64,
    token: CancellationToken,
}

impl TimerHandle {
    /// Creates a fresh, not yet cancelled handle with a process-unique id.
    pub fn new() -> Self {
        Self {
            id: TIMER_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            token: CancellationToken::new(),
        }
    }

    /// Process-unique identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Token the timer task watches; cancelled by [`TimerHandle::cancel`].
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the timer. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the timer was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TimerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TimerHandle {}

/// Timer primitives used by a slot.
pub trait Timers: Send + Sync + 'static {
    /// Runs `f` once after `delay`.
    fn set_timeout(&self, f: TimeoutFn, delay: Duration) -> Option<TimerHandle>;

    /// Cancels a timeout. Must tolerate repeated calls.
    fn clear_timeout(&self, handle: &TimerHandle);

    /// Runs `f` every `period`, first after one full period.
    fn set_interval(&self, f: IntervalFn, period: Duration) -> Option<TimerHandle>;

    /// Cancels an interval. Must tolerate repeated calls.
    fn clear_interval(&self, handle: &TimerHandle);
}

/// Tokio-backed [`Timers`].
///
/// Timer tasks run on the handle given to [`TokioTimers::with_handle`], or on
/// the runtime current at scheduling time when none was given.
#[derive(Clone, Debug, Default)]
pub struct TokioTimers {
    rt: Option<Handle>,
}

impl TokioTimers {
    /// Smallest interval period; `tokio::time::interval` rejects zero.
    const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Timers that spawn onto whatever runtime is current when scheduling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers bound to `rt`; usable from threads outside any runtime.
    pub fn with_handle(rt: Handle) -> Self {
        Self { rt: Some(rt) }
    }

    fn runtime(&self) -> Option<Handle> {
        match &self.rt {
            Some(rt) => Some(rt.clone()),
            None => Handle::try_current().ok(),
        }
    }
}

impl Timers for TokioTimers {
    fn set_timeout(&self, f: TimeoutFn, delay: Duration) -> Option<TimerHandle> {
        let rt = self.runtime()?;
        let handle = TimerHandle::new();
        let token = handle.token.clone();

        rt.spawn(async move {
            select! {
                biased;
                _ = token.cancelled() => {}
                _ = time::sleep(delay) => f(),
            }
        });
        Some(handle)
    }

    fn clear_timeout(&self, handle: &TimerHandle) {
        handle.cancel();
    }

    fn set_interval(&self, mut f: IntervalFn, period: Duration) -> Option<TimerHandle> {
        let rt = self.runtime()?;
        let handle = TimerHandle::new();
        let token = handle.token.clone();
        let period = period.max(Self::MIN_PERIOD);

        rt.spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            loop {
                select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => f(),
                }
            }
        });
        Some(handle)
    }

    fn clear_interval(&self, handle: &TimerHandle) {
        handle.cancel();
    }
}
