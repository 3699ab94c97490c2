//! # Guarded callbacks.
//!
//! [`IfAlive`] wraps callbacks so they only run while the slot is alive. The
//! stage is read when the wrapped callback is **invoked**, not when it is
//! created, so a completion registered long before death is still suppressed
//! if it fires afterwards.
//!
//! ```text
//! let cb = slot.if_alive(|x| ..);      // stage: Inited
//! cb(1)  → Some(..)                     // forwarded
//! slot.set_stage(Stage::Killed)
//! cb(2)  → None                         // swallowed, no error, no event
//! ```
//!
//! Multiple arguments are passed as a tuple.

use super::StageCell;

/// Stage-aware gate shared by guarded callbacks.
#[derive(Clone, Debug)]
pub struct IfAlive {
    stage: StageCell,
}

impl IfAlive {
    pub(crate) fn new(stage: StageCell) -> Self {
        Self { stage }
    }

    /// Whether guarded callbacks would run right now.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.stage.is_alive()
    }

    /// Runs `f` if the slot is alive.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if self.stage.is_not_alive() {
            return None;
        }
        Some(f())
    }

    /// Wraps a reusable callback.
    pub fn wrap<A, R, F>(&self, f: F) -> impl Fn(A) -> Option<R>
    where
        F: Fn(A) -> R,
    {
        let stage = self.stage.clone();
        move |args: A| {
            if stage.is_not_alive() {
                return None;
            }
            Some(f(args))
        }
    }

    /// Wraps a one-shot callback.
    pub fn wrap_once<A, R, F>(&self, f: F) -> impl FnOnce(A) -> Option<R>
    where
        F: FnOnce(A) -> R,
    {
        let stage = self.stage.clone();
        move |args: A| {
            if stage.is_not_alive() {
                return None;
            }
            Some(f(args))
        }
    }
}
