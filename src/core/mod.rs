//! Slot core: stage, registry, resource tracking and instantiation.
//!
//! The only types a host needs from here are [`Slot`] and [`SlotBuilder`];
//! the rest is exposed for inspection.
//!
//! Internal modules:
//! - [`stage`]: lifecycle stage codes and the shared [`StageCell`];
//! - [`registry`]: initialized children by module type (single → many promotion);
//! - [`resources`]: timer/interval/request trackers revoked on death;
//! - [`init`]: child module instantiation (single and batched);
//! - [`guard`]: stage-gated callbacks;
//! - [`slot`]: the slot itself and forwarded host capabilities;
//! - [`builder`]: slot construction and subscriber wiring.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod builder;
mod guard;
mod init;
mod registry;
mod resources;
mod slot;
mod stage;

pub use builder::SlotBuilder;
pub use guard::IfAlive;
pub use init::{BatchCallback, InitCallback, InitOutcome};
pub use registry::{ModuleRegistry, RegistryEntry};
pub use slot::Slot;
pub use stage::{Stage, StageCell};

/// Locks `m`, recovering the data if a previous holder panicked.
///
/// Tracker state stays consistent across panics (every critical section is a
/// single push/drain), so poisoning carries no information here.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
