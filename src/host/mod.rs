//! # Host collaborators.
//!
//! A slot never constructs modules, components or timers on its own: it asks
//! the **host** (the owning application runtime) for them. This module defines
//! the contracts the slot consumes:
//!
//! - [`Host`]: module/component factories plus forwarded capabilities
//!   (messaging, rendering, event binding)
//! - [`Module`] / [`ModuleRef`]: child modules with `init`/`dispose`
//! - [`Component`] / [`ComponentMeta`] / [`Abortable`]: components that may emit abortable requests
//! - [`Timers`] / [`TimerHandle`] / [`TokioTimers`]: cancelable timer primitives
//!
//! ## Wiring
//! ```text
//! Slot::init ─────────────► Host::load_module(ModuleConfig{kind, data, parent_id})
//! Slot::require_component ─► Host::load_component(name).emit_abortables_by
//!                              ├─ Some(ev) → Host::new_component + track requests
//!                              └─ None     → Host::require_component
//! Slot::set_timeout ───────► Timers::set_timeout
//! Slot::notify/broadcast ──► Host::notify/broadcast(module_id, ..)
//! ```

mod component;
mod module;
mod timers;

use std::sync::Arc;

use serde_json::Value;

pub use component::{
    Abortable, Component, ComponentMeta, ComponentRef, RequestListener, RequestRef, DONE_EVENT,
};
pub(crate) use module::empty_data;
pub use module::{Module, ModuleConfig, ModuleRef};
pub use timers::{IntervalFn, TimeoutFn, TimerHandle, Timers, TokioTimers};

use crate::core::Slot;

/// Contract of the application runtime that owns slots.
///
/// Only the factory methods are required. Forwarded capabilities default to
/// inert behavior so hosts can implement the subset they support. Every
/// forwarded call receives the calling slot's module id first.
pub trait Host: Send + Sync + 'static {
    /// Constructs (but does not initialize) a module.
    ///
    /// Construction is synchronous; the slot initializes the module afterwards.
    fn load_module(&self, config: ModuleConfig) -> ModuleRef;

    /// Returns static metadata of a component.
    fn load_component(&self, name: &str) -> ComponentMeta;

    /// Creates a fresh component instance that emits abortable requests.
    fn new_component(&self, name: &str, args: &[Value]) -> ComponentRef;

    /// Returns a plain (untracked) component instance.
    fn require_component(&self, name: &str, args: &[Value]) -> ComponentRef;

    /// Called once by [`SlotBuilder::build`](crate::SlotBuilder::build).
    ///
    /// Hosts that keep slots around should store a [`Weak`](std::sync::Weak)
    /// reference: the slot holds the host strongly.
    fn setup_slot(&self, _slot: &Arc<Slot>) {}

    /// Looks up a child module of `parent_id` by its own id.
    fn child_module_by_id(&self, _parent_id: &str, _id: &str) -> Option<ModuleRef> {
        None
    }

    /// Sends a message to the parent chain of `from`.
    fn notify(&self, _from: &str, _message: &Value) {}

    /// Sends a message to all descendants of `from`.
    fn broadcast(&self, _from: &str, _message: &Value) {}

    /// Returns the modules below `from` matching `selector`.
    fn query_modules(&self, _from: &str, _selector: &str) -> Vec<ModuleRef> {
        Vec::new()
    }

    /// Returns the closest ancestor of `from` with the given module type.
    fn closest_module(&self, _from: &str, _kind: &str) -> Option<ModuleRef> {
        None
    }

    /// Schedules a re-render of `module_id`.
    fn rerender(&self, _module_id: &str) {}

    /// Binds UI events of `module_id`.
    fn bind_events(&self, _module_id: &str) {}

    /// Unbinds UI events of `module_id`.
    fn unbind_events(&self, _module_id: &str) {}

    /// Whether the host runs on the client side.
    fn is_client(&self) -> bool {
        false
    }

    /// Whether the host runs on the server side.
    fn is_server(&self) -> bool {
        !self.is_client()
    }

    /// Whether state has to be rendered during application init.
    fn need_render_state(&self) -> bool {
        true
    }

    /// Produces a host-unique identifier.
    fn unique_id(&self) -> String;
}
