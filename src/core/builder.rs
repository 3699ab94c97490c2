use std::sync::Arc;

use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    config::SlotConfig,
    events::Bus,
    host::{Host, Timers, TokioTimers},
    subscribers::{Subscribe, SubscriberSet},
};

use super::{
    init::Instantiator,
    registry::ModuleRegistry,
    resources::{RequestTracker, TimerTracker},
    slot::Slot,
    StageCell,
};

/// Builder for constructing a [`Slot`] with optional collaborators.
pub struct SlotBuilder {
    host: Arc<dyn Host>,
    module_id: Arc<str>,
    cfg: SlotConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    timers: Option<Arc<dyn Timers>>,
    runtime: Option<RuntimeHandle>,
}

impl SlotBuilder {
    /// Creates a new builder for the owner module `module_id`.
    pub fn new(host: Arc<dyn Host>, module_id: Arc<str>) -> Self {
        Self {
            host,
            module_id,
            cfg: SlotConfig::default(),
            subscribers: Vec::new(),
            timers: None,
            runtime: None,
        }
    }

    /// Replaces the default [`SlotConfig`].
    pub fn with_config(mut self, cfg: SlotConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive slot events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the default [`TokioTimers`] primitives.
    ///
    /// The default timers are bound to the slot's runtime (see [`SlotBuilder::with_runtime`]).
    pub fn with_timers(mut self, timers: Arc<dyn Timers>) -> Self {
        self.timers = Some(timers);
        self
    }

    /// Runtime used for init completions, default timers and subscriber workers.
    ///
    /// Defaults to the runtime `build` is called from.
    pub fn with_runtime(mut self, runtime: RuntimeHandle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the slot and registers it with the host.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Subscriber workers and the bus listener (if any subscribers)
    /// - Empty registry and resource trackers, stage `Initing`
    ///
    /// # Panics
    /// Panics when no runtime was given and `build` is called outside a tokio runtime.
    pub fn build(self) -> Arc<Slot> {
        let rt = self.runtime.unwrap_or_else(RuntimeHandle::current);
        let timers = self
            .timers
            .unwrap_or_else(|| Arc::new(TokioTimers::with_handle(rt.clone())));
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let _entered = rt.enter();
            let subs = SubscriberSet::new(self.module_id.clone(), self.subscribers, bus.clone());
            let token = CancellationToken::new();
            subscriber_listener(&rt, &bus, subs, token.clone());
            Some(token.drop_guard())
        };

        let stage = StageCell::new();
        let registry = Arc::new(ModuleRegistry::new());
        let instantiator = Instantiator {
            slot_id: self.module_id.clone(),
            host: Arc::clone(&self.host),
            stage: stage.clone(),
            registry: Arc::clone(&registry),
            bus: bus.clone(),
        };

        let slot = Arc::new(Slot {
            cfg: self.cfg,
            module_id: self.module_id,
            host: self.host,
            timers,
            rt,
            stage,
            registry,
            instantiator,
            timeouts: TimerTracker::new(),
            intervals: TimerTracker::new(),
            requests: RequestTracker::new(),
            bus,
            _listener: listener,
        });

        slot.host.setup_slot(&slot);
        slot
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
///
/// Runs until `token` is cancelled (the slot was dropped), then forwards what
/// is already queued and shuts the subscriber workers down.
fn subscriber_listener(
    rt: &RuntimeHandle,
    bus: &Bus,
    set: SubscriberSet,
    token: CancellationToken,
) {
    let mut rx = bus.subscribe();
    rt.spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(&ev);
        }
        set.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;
    use crate::events::{Event, EventKind};
    use crate::testing::{eventually, FakeHost};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_slot_events() {
        let host = FakeHost::new();
        let rec = Arc::new(Recorder::default());
        let slot = SlotBuilder::new(host.clone(), Arc::from("page"))
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build();

        slot.set_stage(Stage::Inited).unwrap();
        slot.release();

        assert!(eventually(|| rec.seen.lock().unwrap().len() >= 5).await);
        let seen = rec.seen.lock().unwrap().clone();
        assert_eq!(seen[0], EventKind::StageChanged);
        assert_eq!(seen[4], EventKind::ResourcesReleased);
    }

    #[tokio::test]
    async fn test_dropping_slot_stops_subscribers() {
        let host = FakeHost::new();
        let rec = Arc::new(Recorder::default());
        let slot = SlotBuilder::new(host.clone(), Arc::from("page"))
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build();
        assert_eq!(Arc::strong_count(&rec), 2);

        slot.set_stage(Stage::Killed).unwrap();
        drop(slot);

        assert!(eventually(|| Arc::strong_count(&rec) == 1).await);
        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::StageChanged]);
    }

    #[test]
    fn test_explicit_runtime_drives_timers_from_plain_thread() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();
        let host = FakeHost::new();
        let slot = Slot::builder(host.clone(), "page")
            .with_runtime(rt.handle().clone())
            .build();
        let (tx, rx) = std::sync::mpsc::channel();

        let tx_timeout = tx.clone();
        assert!(slot
            .set_timeout(
                move || {
                    let _ = tx_timeout.send("timeout");
                },
                Duration::from_millis(5),
            )
            .is_some());
        assert!(slot
            .set_interval(
                move || {
                    let _ = tx.send("interval");
                },
                Duration::from_millis(5),
            )
            .is_some());
        assert_eq!(slot.tracked_timeouts(), 1);
        assert_eq!(slot.tracked_intervals(), 1);

        let mut seen = Vec::new();
        while seen.len() < 2 {
            let tag = rx.recv_timeout(Duration::from_secs(5)).expect("timer fired");
            if !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        slot.release();
    }

    #[tokio::test]
    async fn test_defaults() {
        let host = FakeHost::new();
        let slot = SlotBuilder::new(host.clone(), Arc::from("page")).build();
        assert_eq!(slot.config().bus_capacity, 1024);
        assert!(!slot.config().gate_intervals);
        assert_eq!(slot.stage(), Stage::Initing);
        assert!(slot.modules().is_empty());
        assert_eq!(host.registered_slots(), 1);
    }
}
