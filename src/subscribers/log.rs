//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [stage] slot="page" "initing -> killed"
//! [loaded] slot="page" module="widget"
//! [registered] slot="page" module="widget" instances=2
//! [init-failed] slot="page" module="map" err="no tiles"
//! [timeout] slot="page" delay_ms=250
//! [released] slot="page"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let slot = e.slot.as_deref().unwrap_or("-");
        let module = e.module.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::StageChanged => {
                println!("[stage] slot={slot:?} {:?}", e.reason.as_deref().unwrap_or(""));
            }
            EventKind::InitDiscarded => {
                println!("[init-discarded] slot={slot:?} module={module:?}");
            }
            EventKind::ModuleLoaded => {
                println!("[loaded] slot={slot:?} module={module:?}");
            }
            EventKind::ModuleRegistered => {
                println!(
                    "[registered] slot={slot:?} module={module:?} instances={:?}",
                    e.count
                );
            }
            EventKind::ModulePromoted => {
                println!("[promoted] slot={slot:?} module={module:?}");
            }
            EventKind::ModuleInitFailed => {
                println!(
                    "[init-failed] slot={slot:?} module={module:?} err={:?}",
                    e.reason
                );
            }
            EventKind::TimeoutScheduled => {
                println!("[timeout] slot={slot:?} delay_ms={:?}", e.delay_ms);
            }
            EventKind::IntervalScheduled => {
                println!("[interval] slot={slot:?} period_ms={:?}", e.delay_ms);
            }
            EventKind::TimeoutsCleared => {
                println!("[timeouts-cleared] slot={slot:?} count={:?}", e.count);
            }
            EventKind::IntervalsCleared => {
                println!("[intervals-cleared] slot={slot:?} count={:?}", e.count);
            }
            EventKind::RequestTracked => {
                println!("[request] slot={slot:?} component={:?}", e.reason);
            }
            EventKind::RequestDone => {
                println!("[request-done] slot={slot:?} component={:?}", e.reason);
            }
            EventKind::RequestsAborted => {
                println!("[requests-aborted] slot={slot:?} count={:?}", e.count);
            }
            EventKind::ResourcesReleased => {
                println!("[released] slot={slot:?}");
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={module:?} reason={:?}",
                    e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={} info={}",
                    module,
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
