//! # Per-subscriber event lanes.
//!
//! [`SubscriberSet`] hands every slot event to each attached subscriber
//! through its own bounded lane, so the slot never waits on a subscriber.
//!
//! ```text
//! emit(event)
//!     ├──► lane "log"     ──► drive() ──► log.on_event()
//!     ├──► lane "metrics" ──► drive() ──► metrics.on_event()
//!     └──► lane full/closed ──► SubscriberOverflow{slot, subscriber}
//!
//! drive(): panic in on_event ──► SubscriberPanicked{slot, subscriber}
//! ```
//!
//! A lane is FIFO; there is no ordering across lanes. Diagnostics published
//! back on the bus carry the owning slot's id, like every other slot event.
//! An overflow notice that itself overflows is dropped.
//!
//! `on_event` runs under `AssertUnwindSafe`: a subscriber panicking while it
//! holds a lock may leave that state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::panic_message;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out of slot events to attached subscribers.
pub struct SubscriberSet {
    slot: Arc<str>,
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Opens one lane per subscriber and spawns its worker.
    ///
    /// `slot` is the id stamped on the diagnostics this set publishes. Must be
    /// called inside a tokio runtime when `subs` is not empty. Lane capacity
    /// is at least 1.
    #[must_use]
    pub fn new(slot: impl Into<Arc<str>>, subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let slot = slot.into();
        let (lanes, workers) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let lane = Lane {
                    name: sub.name(),
                    tx,
                };
                let worker = tokio::spawn(drive(sub, rx, bus.clone(), slot.clone()));
                (lane, worker)
            })
            .unzip();

        Self {
            slot,
            lanes,
            workers,
            bus,
        }
    }

    /// Queues `event` on every lane without waiting.
    ///
    /// A full or closed lane loses the event and a `SubscriberOverflow`
    /// (reason `"full"` / `"closed"`) is published for that subscriber.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for lane in &self.lanes {
            let reason = match lane.tx.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if !event.is_subscriber_overflow() {
                self.bus.publish(
                    Event::subscriber_overflow(lane.name, reason).with_slot(self.slot.clone()),
                );
            }
        }
    }

    /// Closes every lane and waits until each worker has drained its queue.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn drive(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
    slot: Arc<str>,
) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if let Err(payload) = handled {
            bus.publish(
                Event::subscriber_panicked(sub.name(), panic_message(&*payload))
                    .with_slot(slot.clone()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
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

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _event: &Event) {
            panic!("exploded");
        }

        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    struct Narrow;

    #[async_trait]
    impl Subscribe for Narrow {
        async fn on_event(&self, _event: &Event) {}

        fn name(&self) -> &'static str {
            "narrow"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order_and_shuts_down() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(
            "page",
            vec![Arc::new(Recorder { seen: seen.clone() })],
            Bus::new(8),
        );

        set.emit(&Event::new(EventKind::TimeoutScheduled));
        set.emit(&Event::new(EventKind::TimeoutsCleared));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::TimeoutScheduled, EventKind::TimeoutsCleared]
        );
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_reported_for_its_slot() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new("page", vec![Arc::new(Exploder)], bus.clone());

        set.emit(&Event::new(EventKind::ResourcesReleased));
        let ev = rx.recv().await.expect("panic event");
        assert!(ev.is_subscriber_panic());
        assert_eq!(ev.slot.as_deref(), Some("page"));
        assert_eq!(ev.module.as_deref(), Some("exploder"));
        assert_eq!(ev.reason.as_deref(), Some("exploded"));
        set.shutdown().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_lane_reports_overflow_for_its_slot() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new("sidebar", vec![Arc::new(Narrow)], bus.clone());

        // The worker cannot run between these two sends on a current-thread runtime.
        set.emit(&Event::new(EventKind::TimeoutScheduled));
        set.emit(&Event::new(EventKind::TimeoutScheduled));

        let ev = rx.recv().await.expect("overflow event");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.slot.as_deref(), Some("sidebar"));
        assert_eq!(ev.module.as_deref(), Some("narrow"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=narrow reason=full"));
        set.shutdown().await;
    }
}
