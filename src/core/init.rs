//! # Child module instantiation protocol.
//!
//! ## Flow
//! ```text
//! Slot::init(kind, data, cb)
//!   ├─ stage not alive? ──► publish InitDiscarded, return None (cb dropped)
//!   ├─► Host::load_module(ModuleConfig{kind, data, parent_id})   (sync)
//!   ├─► publish ModuleLoaded, return Some(module)
//!   └─► spawned completion:
//!         module.init(data).await   (panics become ModuleError::Fatal)
//!           ├─ Err ──► module.dispose() (panics caught), publish ModuleInitFailed
//!           └─ Ok  ──► registry.insert (maybe promote), publish ModuleRegistered
//!         cb(InitOutcome)            (exactly once, after bookkeeping)
//! ```
//!
//! Batches reuse the same completion:
//! - [`Slot::init_modules`]: every item spawned at once; the aggregate callback
//!   fires on the first failure or when all items succeeded.
//! - [`Slot::init_modules_series`]: items run one after another; the first
//!   failure halts the series.
//!
//! A batch item discarded because the slot died stops the batch and drops its
//! aggregate callback, like a single discarded `init`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::error::{panic_message, BatchError, ModuleError};
use crate::events::{Bus, Event, EventKind};
use crate::host::{Host, ModuleConfig, ModuleRef};

use super::registry::{Insertion, ModuleRegistry};
use super::{Slot, StageCell};

/// Callback of a single `init`.
pub type InitCallback = Box<dyn FnOnce(InitOutcome) + Send + 'static>;

/// Aggregate callback of a batch.
pub type BatchCallback = Box<dyn FnOnce(Result<Vec<ModuleRef>, BatchError>) + Send + 'static>;

/// Completion report of a single `init`.
#[derive(Debug)]
pub struct InitOutcome {
    /// The module handle returned by `init` (disposed if `result` is an error).
    pub module: ModuleRef,
    /// Result of the module's own `init`.
    pub result: Result<(), ModuleError>,
}

impl InitOutcome {
    /// True if the module initialized and was registered.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Converts into the registered module or the init error.
    pub fn into_result(self) -> Result<ModuleRef, ModuleError> {
        self.result.map(|()| self.module)
    }
}

/// Everything a completion needs, detached from the slot's lifetime.
#[derive(Clone)]
pub(crate) struct Instantiator {
    pub(crate) slot_id: Arc<str>,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) stage: StageCell,
    pub(crate) registry: Arc<ModuleRegistry>,
    pub(crate) bus: Bus,
}

impl Instantiator {
    /// Constructs a module and returns it with its (not yet polled) completion.
    ///
    /// Returns `None` without touching the host when the slot is not alive.
    pub(crate) fn start(
        &self,
        kind: &str,
        data: Option<Value>,
    ) -> Option<(ModuleRef, impl Future<Output = InitOutcome> + Send + 'static)> {
        if self.stage.is_not_alive() {
            self.publish(Event::new(EventKind::InitDiscarded).with_module(kind));
            return None;
        }

        let data = match data {
            None | Some(Value::Null) => crate::host::empty_data(),
            Some(data) => data,
        };
        let module = self.host.load_module(ModuleConfig {
            kind: kind.to_string(),
            data: data.clone(),
            parent_id: Some(self.slot_id.to_string()),
        });
        let kind: Arc<str> = Arc::from(kind);
        self.publish(Event::new(EventKind::ModuleLoaded).with_module(kind.clone()));

        let me = self.clone();
        let handle = Arc::clone(&module);
        let completion = async move {
            let result = match AssertUnwindSafe(handle.init(data)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(ModuleError::Fatal {
                    error: format!("init panicked: {}", panic_message(&*payload)),
                }),
            };
            me.finish(&kind, &handle, &result);
            InitOutcome {
                module: handle,
                result,
            }
        };
        Some((module, completion))
    }

    /// Registry bookkeeping after a module's init finished.
    fn finish(&self, kind: &Arc<str>, module: &ModuleRef, result: &Result<(), ModuleError>) {
        match result {
            Err(err) => {
                // The completion must reach its callback even if dispose unwinds.
                let mut reason = err.as_message();
                let disposed = std::panic::catch_unwind(AssertUnwindSafe(|| module.dispose()));
                if let Err(payload) = disposed {
                    reason = format!("{reason}; dispose panicked: {}", panic_message(&*payload));
                }
                self.publish(
                    Event::new(EventKind::ModuleInitFailed)
                        .with_module(kind.clone())
                        .with_reason(reason),
                );
            }
            Ok(()) => {
                let insertion = self.registry.insert(kind, Arc::clone(module));
                if insertion == Insertion::Promoted {
                    self.publish(Event::new(EventKind::ModulePromoted).with_module(kind.clone()));
                }
                self.publish(
                    Event::new(EventKind::ModuleRegistered)
                        .with_module(kind.clone())
                        .with_count(insertion.count()),
                );
            }
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_slot(self.slot_id.clone()));
    }
}

impl Slot {
    /// Instantiates a child module of type `name`.
    ///
    /// `data` defaults to an empty JSON object (`null` counts as absent);
    /// `callback` is optional. Returns the constructed module right away;
    /// initialization completes asynchronously and the callback then receives
    /// the [`InitOutcome`] exactly once.
    ///
    /// On a slot that is not alive this is a silent no-op returning `None`:
    /// nothing is constructed and the callback is never invoked.
    pub fn init(
        &self,
        name: &str,
        data: Option<Value>,
        callback: Option<InitCallback>,
    ) -> Option<ModuleRef> {
        let (module, completion) = self.instantiator.start(name, data)?;
        self.rt.spawn(async move {
            let outcome = completion.await;
            if let Some(callback) = callback {
                callback(outcome);
            }
        });
        Some(module)
    }

    /// Legacy single-object form of [`Slot::init`]. `config.parent_id` is ignored.
    #[deprecated(note = "use `Slot::init`")]
    pub fn init_from_config(
        &self,
        config: ModuleConfig,
        callback: Option<InitCallback>,
    ) -> Option<ModuleRef> {
        self.init(&config.kind, Some(config.data), callback)
    }

    /// Alias of [`Slot::init_from_config`].
    #[deprecated(note = "use `Slot::init`")]
    pub fn init_module(
        &self,
        config: ModuleConfig,
        callback: Option<InitCallback>,
    ) -> Option<ModuleRef> {
        #[allow(deprecated)]
        self.init_from_config(config, callback)
    }

    /// Instantiates every item concurrently, then reports once.
    ///
    /// The callback receives the modules in list order when all succeeded, or
    /// a [`BatchError`] as soon as the first failure completes. Items still in
    /// flight at that point keep running and registering on their own.
    pub fn init_modules(&self, list: Vec<ModuleConfig>, callback: BatchCallback) {
        let total = list.len();
        if total == 0 {
            callback(Ok(Vec::new()));
            return;
        }

        let mut set = JoinSet::new();
        for (index, item) in list.into_iter().enumerate() {
            let Some((_, completion)) = self.instantiator.start(&item.kind, Some(item.data))
            else {
                set.detach_all();
                return;
            };
            set.spawn_on(async move { (index, completion.await) }, &self.rt);
        }

        self.rt.spawn(async move {
            let mut modules: Vec<Option<ModuleRef>> = vec![None; total];

            while let Some(joined) = set.join_next().await {
                let Ok((index, outcome)) = joined else {
                    // The runtime is shutting down and cancelled the completion.
                    set.detach_all();
                    return;
                };
                modules[index] = Some(outcome.module);
                if let Err(source) = outcome.result {
                    // Items still in flight finish and register on their own.
                    set.detach_all();
                    callback(Err(BatchError {
                        index,
                        source,
                        modules,
                    }));
                    return;
                }
            }
            callback(Ok(modules.into_iter().flatten().collect()));
        });
    }

    /// Instantiates items one after another, then reports once.
    ///
    /// The next item is constructed only after the previous one initialized;
    /// the first failure halts the series and is reported as a [`BatchError`].
    pub fn init_modules_series(&self, list: Vec<ModuleConfig>, callback: BatchCallback) {
        let inst = self.instantiator.clone();
        self.rt.spawn(async move {
            let total = list.len();
            let mut modules: Vec<Option<ModuleRef>> = Vec::with_capacity(total);

            for (index, item) in list.into_iter().enumerate() {
                let Some((_, completion)) = inst.start(&item.kind, Some(item.data)) else {
                    return;
                };
                let outcome = completion.await;
                modules.push(Some(outcome.module));
                if let Err(source) = outcome.result {
                    modules.resize(total, None);
                    callback(Err(BatchError {
                        index,
                        source,
                        modules,
                    }));
                    return;
                }
            }
            callback(Ok(modules.into_iter().flatten().collect()));
        });
    }
}
