//! # slotkeeper
//!
//! **Slotkeeper** manages the lifecycle of child module instances owned by a
//! parent module inside a larger application runtime (the *host*).
//!
//! A [`Slot`] tracks its owner's life stage, instantiates and registers child
//! modules under that stage, and guarantees that every asynchronous resource
//! created on its behalf (timeouts, intervals, abortable in-flight requests) is
//! revoked exactly once when the owner dies. Guarded callbacks
//! ([`Slot::if_alive`]) stop post-death code from running.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!        Host (application runtime)
//!          │  builds, drives stage, calls release()
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Slot (one per owner module)                                      │
//! │  - StageCell       (Initing → Inited → Killed → Disposed)         │
//! │  - ModuleRegistry  (type → Single | Many)                         │
//! │  - trackers        (timeouts, intervals, abortable requests)      │
//! │  - Bus             (broadcast events)                             │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!   Host::load_module   Timers::set_*    Component::on(ev)     │
//!   Module::init(data)  (TokioTimers)    Abortable::abort      │
//!        │                                                     │
//!        │ publishes ModuleLoaded / ModuleRegistered / ...     │
//!        ▼                                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                 (capacity: SlotConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                     sub1.on   sub2.on   subN.on
//!                      _event()  _event()  _event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! Slot::builder(host, id).build() ──► Host::setup_slot(&slot)   stage = Initing
//!
//! slot.init("widget", data, cb)
//!   ├─ not alive ─► None (nothing built, cb dropped)
//!   └─ alive     ─► Host::load_module ─► Some(module)
//!                     └─► module.init(data).await
//!                            ├─ Ok  ─► registry: Single(a) → Many([a, b]) ─► cb
//!                            └─ Err ─► module.dispose()                   ─► cb
//!
//! host: slot.set_stage(Stage::Killed)
//! host: slot.release()   ─► clear_timeouts, clear_intervals, clear_requests
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                       |
//! |-------------------|-------------------------------------------------------------------|------------------------------------------|
//! | **Slot**          | Stage gating, instantiation, resource tracking, host forwarding.  | [`Slot`], [`SlotBuilder`], [`Stage`]     |
//! | **Registry**      | Initialized children by module type.                              | [`ModuleRegistry`], [`RegistryEntry`]    |
//! | **Host API**      | Contracts the slot consumes from the application runtime.         | [`Host`], [`Module`], [`Component`], [`Timers`] |
//! | **Subscriber API**| Hook into slot events (logging, metrics, custom subscribers).     | [`Subscribe`]                            |
//! | **Errors**        | Typed errors for module init and stage moves.                     | [`ModuleError`], [`SlotError`], [`BatchError`] |
//! | **Configuration** | Per-slot settings.                                                | [`SlotConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use slotkeeper::{
//!     Component, ComponentMeta, ComponentRef, Host, Module, ModuleConfig, ModuleError,
//!     ModuleRef, RequestListener, Slot, Stage,
//! };
//!
//! struct Widget(String);
//!
//! #[async_trait]
//! impl Module for Widget {
//!     fn id(&self) -> &str {
//!         &self.0
//!     }
//!     async fn init(&self, _data: Value) -> Result<(), ModuleError> {
//!         Ok(())
//!     }
//!     fn dispose(&self) {}
//! }
//!
//! struct Plain;
//!
//! impl Component for Plain {
//!     fn on(&self, _event: &str, _listener: RequestListener) {}
//! }
//!
//! struct App;
//!
//! impl Host for App {
//!     fn load_module(&self, config: ModuleConfig) -> ModuleRef {
//!         Arc::new(Widget(config.kind))
//!     }
//!     fn load_component(&self, _name: &str) -> ComponentMeta {
//!         ComponentMeta::default()
//!     }
//!     fn new_component(&self, _name: &str, _args: &[Value]) -> ComponentRef {
//!         Arc::new(Plain)
//!     }
//!     fn require_component(&self, _name: &str, _args: &[Value]) -> ComponentRef {
//!         Arc::new(Plain)
//!     }
//!     fn unique_id(&self) -> String {
//!         "uid-1".into()
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let slot = Slot::builder(Arc::new(App), "page").build();
//!     slot.set_stage(Stage::Inited)?;
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     slot.init(
//!         "widget",
//!         Some(json!({ "title": "hello" })),
//!         Some(Box::new(move |outcome| {
//!             let _ = tx.send(outcome.is_ok());
//!         })),
//!     );
//!     assert!(rx.await?);
//!     assert_eq!(slot.modules().count("widget"), 1);
//!
//!     slot.set_stage(Stage::Killed)?;
//!     slot.release();
//!     assert!(slot.init("widget", None, None).is_none());
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod host;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use config::SlotConfig;
pub use core::{
    BatchCallback, IfAlive, InitCallback, InitOutcome, ModuleRegistry, RegistryEntry, Slot,
    SlotBuilder, Stage, StageCell,
};
pub use error::{BatchError, ModuleError, SlotError};
pub use events::{Bus, Event, EventKind};
pub use host::{
    Abortable, Component, ComponentMeta, ComponentRef, Host, IntervalFn, Module, ModuleConfig,
    ModuleRef, RequestListener, RequestRef, TimeoutFn, TimerHandle, Timers, TokioTimers,
    DONE_EVENT,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
