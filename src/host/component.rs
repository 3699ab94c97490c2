//! # Components and abortable requests.
//!
//! A component is a host-provided helper (API client, uploader, ...). Some
//! components start in-flight operations that must be cancelled when the slot
//! dies; their [`ComponentMeta::emit_abortables_by`] names the event through
//! which each operation is announced. Operations report completion through the
//! [`DONE_EVENT`] event with the same handle.
//!
//! ```text
//! component ── emit(meta.emit_abortables_by, req) ──► slot tracks req
//! component ── emit("done", req)                  ──► slot forgets req
//! slot dies ── clear_requests()                   ──► req.abort() for the rest
//! ```

use std::sync::Arc;

/// Event name a component uses to report a finished request.
pub const DONE_EVENT: &str = "done";

/// In-flight operation that can be cancelled.
pub trait Abortable: Send + Sync + 'static {
    /// Cancels the operation. Must tolerate being called after completion.
    fn abort(&self);
}

/// Shared handle to an abortable request. Identity is the `Arc` pointer.
pub type RequestRef = Arc<dyn Abortable>;

/// Listener invoked with the request carried by a component event.
pub type RequestListener = Arc<dyn Fn(RequestRef) + Send + Sync>;

/// Shared handle to a component.
pub type ComponentRef = Arc<dyn Component>;

/// Static metadata of a component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentMeta {
    /// Name of the event announcing a new abortable request, if the component emits any.
    pub emit_abortables_by: Option<String>,
}

impl ComponentMeta {
    /// Metadata of a component that emits abortables through `event`.
    pub fn abortable(event: impl Into<String>) -> Self {
        Self {
            emit_abortables_by: Some(event.into()),
        }
    }
}

/// Host-provided component instance.
pub trait Component: Send + Sync + 'static {
    /// Subscribes `listener` to `event`.
    ///
    /// Only called for components whose metadata declares abortable emission.
    fn on(&self, event: &str, listener: RequestListener);
}
