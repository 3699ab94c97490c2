//! # Slot: lifecycle container for child modules.
//!
//! The [`Slot`] owns:
//! - the shared [`StageCell`] (driven by the host),
//! - the [`ModuleRegistry`] of initialized children,
//! - the timer/interval/request trackers,
//! - the event [`Bus`] its subscribers listen to.
//!
//! Everything else is forwarded to the [`Host`] with this slot's module id.
//!
//! ## Death
//! ```text
//! host: slot.set_stage(Stage::Killed)   → init / set_timeout refused, guarded callbacks swallowed
//! host: slot.release()                  → clear_timeouts + clear_intervals + clear_requests
//! host: slot.set_stage(Stage::Disposed)
//! ```
//! The slot never moves its own stage.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::broadcast;
use tokio_util::sync::DropGuard;

use crate::config::SlotConfig;
use crate::error::SlotError;
use crate::events::{Bus, Event, EventKind};
use crate::host::{ComponentRef, Host, ModuleRef, RequestRef, TimerHandle, Timers, DONE_EVENT};

use super::builder::SlotBuilder;
use super::guard::IfAlive;
use super::init::Instantiator;
use super::registry::ModuleRegistry;
use super::resources::{RequestTracker, TimerTracker, Tracked};
use super::{Stage, StageCell};

/// Lifecycle container of one owner module.
pub struct Slot {
    pub(super) cfg: SlotConfig,
    pub(super) module_id: Arc<str>,
    pub(super) host: Arc<dyn Host>,
    pub(super) timers: Arc<dyn Timers>,
    pub(super) rt: RuntimeHandle,
    pub(super) stage: StageCell,
    pub(super) registry: Arc<ModuleRegistry>,
    pub(super) instantiator: Instantiator,
    pub(super) timeouts: TimerTracker,
    pub(super) intervals: TimerTracker,
    pub(super) requests: Arc<RequestTracker>,
    pub(super) bus: Bus,
    /// Stops the subscriber listener when the slot is dropped.
    pub(super) _listener: Option<DropGuard>,
}

impl Slot {
    /// Starts building a slot for the owner module `module_id`.
    pub fn builder(host: Arc<dyn Host>, module_id: impl Into<Arc<str>>) -> SlotBuilder {
        SlotBuilder::new(host, module_id.into())
    }

    /// Module id of the owner module.
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Configuration the slot was built with.
    pub fn config(&self) -> &SlotConfig {
        &self.cfg
    }

    /// Receiver of every event this slot publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // ---------------------------
    // Stage
    // ---------------------------

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    pub fn is_alive(&self) -> bool {
        self.stage.is_alive()
    }

    pub fn is_not_alive(&self) -> bool {
        self.stage.is_not_alive()
    }

    /// Moves the stage forward. Called by the host's lifecycle only.
    ///
    /// Setting the current stage again is a no-op. Backward moves fail with
    /// [`SlotError::InvalidTransition`] and leave the stage untouched.
    pub fn set_stage(&self, stage: Stage) -> Result<(), SlotError> {
        if let Some(from) = self.stage.advance(stage)? {
            self.publish(
                Event::new(EventKind::StageChanged)
                    .with_reason(format!("{} -> {}", from.as_str(), stage.as_str())),
            );
        }
        Ok(())
    }

    // ---------------------------
    // Registry
    // ---------------------------

    /// Initialized children of this slot.
    pub fn modules(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Child module of this slot by its id (host lookup).
    pub fn module_by_id(&self, id: &str) -> Option<ModuleRef> {
        self.host.child_module_by_id(&self.module_id, id)
    }

    // ---------------------------
    // Timers
    // ---------------------------

    /// Runs `f` once after `delay`; the timeout is cancelled on [`Slot::clear_timeouts`].
    ///
    /// Returns `None` without scheduling anything when the slot is not alive.
    pub fn set_timeout<F>(&self, f: F, delay: Duration) -> Option<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.stage.is_not_alive() {
            return None;
        }
        let handle = self.timers.set_timeout(Box::new(f), delay)?;
        if self.timeouts.track(handle.clone(), Some(&self.stage)) == Tracked::Refused {
            self.timers.clear_timeout(&handle);
            return None;
        }
        self.publish(Event::new(EventKind::TimeoutScheduled).with_delay(delay));
        Some(handle)
    }

    /// Cancels every tracked timeout. Safe to call repeatedly.
    pub fn clear_timeouts(&self) {
        let drained = self.timeouts.drain();
        for handle in &drained {
            self.timers.clear_timeout(handle);
        }
        self.publish(Event::new(EventKind::TimeoutsCleared).with_count(drained.len()));
    }

    /// Runs `f` every `period`; the interval is cancelled on [`Slot::clear_intervals`].
    ///
    /// Not gated by the stage unless [`SlotConfig::gate_intervals`] is set.
    pub fn set_interval<F>(&self, f: F, period: Duration) -> Option<TimerHandle>
    where
        F: FnMut() + Send + 'static,
    {
        let gate = self.cfg.gate_intervals.then_some(&self.stage);
        if gate.is_some_and(StageCell::is_not_alive) {
            return None;
        }
        let handle = self.timers.set_interval(Box::new(f), period)?;
        if self.intervals.track(handle.clone(), gate) == Tracked::Refused {
            self.timers.clear_interval(&handle);
            return None;
        }
        self.publish(Event::new(EventKind::IntervalScheduled).with_delay(period));
        Some(handle)
    }

    /// Cancels every tracked interval. Safe to call repeatedly.
    pub fn clear_intervals(&self) {
        let drained = self.intervals.drain();
        for handle in &drained {
            self.timers.clear_interval(handle);
        }
        self.publish(Event::new(EventKind::IntervalsCleared).with_count(drained.len()));
    }

    // ---------------------------
    // Components & requests
    // ---------------------------

    /// Obtains a component from the host.
    ///
    /// Components that declare abortable emission are created fresh and their
    /// requests are tracked until `"done"` or [`Slot::clear_requests`]. A request
    /// announced while the slot is not alive (or after the slot is gone) is
    /// aborted on the spot.
    pub fn require_component(&self, name: &str, args: &[Value]) -> ComponentRef {
        let meta = self.host.load_component(name);
        let Some(event) = meta.emit_abortables_by else {
            return self.host.require_component(name, args);
        };

        let component = self.host.new_component(name, args);
        let source: Arc<str> = Arc::from(name);

        let tracker = Arc::downgrade(&self.requests);
        let stage = self.stage.clone();
        let bus = self.bus.clone();
        let slot_id = self.module_id.clone();
        let comp = source.clone();
        component.on(
            &event,
            Arc::new(move |req: RequestRef| {
                let Some(tracker) = tracker.upgrade() else {
                    req.abort();
                    return;
                };
                match tracker.track(req.clone(), &stage) {
                    Tracked::Added => bus.publish(
                        Event::new(EventKind::RequestTracked)
                            .with_slot(slot_id.clone())
                            .with_reason(comp.clone()),
                    ),
                    Tracked::Refused => req.abort(),
                    Tracked::Duplicate => {}
                }
            }),
        );

        let tracker = Arc::downgrade(&self.requests);
        let bus = self.bus.clone();
        let slot_id = self.module_id.clone();
        component.on(
            DONE_EVENT,
            Arc::new(move |req: RequestRef| {
                let Some(tracker) = tracker.upgrade() else { return };
                if tracker.complete(&req) {
                    bus.publish(
                        Event::new(EventKind::RequestDone)
                            .with_slot(slot_id.clone())
                            .with_reason(source.clone()),
                    );
                }
            }),
        );
        component
    }

    /// Aborts every tracked request and forgets them.
    pub fn clear_requests(&self) {
        let aborted = self.requests.abort_all();
        self.publish(Event::new(EventKind::RequestsAborted).with_count(aborted));
    }

    /// Revokes all tracked resources: timeouts, intervals, then requests.
    ///
    /// Meant for the host's shutdown path; idempotent.
    pub fn release(&self) {
        self.clear_timeouts();
        self.clear_intervals();
        self.clear_requests();
        self.publish(Event::new(EventKind::ResourcesReleased));
    }

    /// Number of timeouts currently tracked.
    pub fn tracked_timeouts(&self) -> usize {
        self.timeouts.len()
    }

    /// Number of intervals currently tracked.
    pub fn tracked_intervals(&self) -> usize {
        self.intervals.len()
    }

    /// Number of in-flight requests currently tracked.
    pub fn tracked_requests(&self) -> usize {
        self.requests.len()
    }

    // ---------------------------
    // Guarded callbacks
    // ---------------------------

    /// Gate evaluating this slot's stage at call time.
    pub fn guard(&self) -> IfAlive {
        IfAlive::new(self.stage.clone())
    }

    /// Wraps `f` so calls are swallowed once the slot is not alive.
    pub fn if_alive<A, R, F>(&self, f: F) -> impl Fn(A) -> Option<R>
    where
        F: Fn(A) -> R,
    {
        self.guard().wrap(f)
    }

    /// One-shot variant of [`Slot::if_alive`], e.g. for an init callback.
    pub fn if_alive_once<A, R, F>(&self, f: F) -> impl FnOnce(A) -> Option<R>
    where
        F: FnOnce(A) -> R,
    {
        self.guard().wrap_once(f)
    }

    // ---------------------------
    // Forwarded host capabilities
    // ---------------------------

    /// Sends `message` up the parent chain.
    pub fn notify(&self, message: &Value) {
        self.host.notify(&self.module_id, message);
    }

    /// Sends `message` to all descendants.
    pub fn broadcast(&self, message: &Value) {
        self.host.broadcast(&self.module_id, message);
    }

    pub fn query_modules(&self, selector: &str) -> Vec<ModuleRef> {
        self.host.query_modules(&self.module_id, selector)
    }

    pub fn closest_module(&self, kind: &str) -> Option<ModuleRef> {
        self.host.closest_module(&self.module_id, kind)
    }

    pub fn rerender(&self) {
        self.host.rerender(&self.module_id);
    }

    pub fn bind_events(&self) {
        self.host.bind_events(&self.module_id);
    }

    /// Re-binds UI events on the client; no-op on the server.
    pub fn rebind(&self) {
        if self.host.is_client() {
            self.host.unbind_events(&self.module_id);
            self.host.bind_events(&self.module_id);
        }
    }

    pub fn is_client(&self) -> bool {
        self.host.is_client()
    }

    pub fn is_server(&self) -> bool {
        self.host.is_server()
    }

    pub fn need_render_state(&self) -> bool {
        self.host.need_render_state()
    }

    pub fn unique_id(&self) -> String {
        self.host.unique_id()
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_slot(self.module_id.clone()));
    }
}
