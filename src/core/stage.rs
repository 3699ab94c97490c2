//! # Slot stage machine.
//!
//! A slot lives through four stages:
//!
//! ```text
//! Initing ──► Inited ──► Killed ──► Disposed
//!    │                     ▲  │         ▲
//!    └─────────────────────┘  └─────────┘   (skipping forward is allowed)
//! ```
//!
//! `Initing` and `Inited` are **alive**; `Killed` and `Disposed` are **not alive**.
//! The unions are predicates, never stored values.
//!
//! ## Rules
//! - The stage only moves forward; the host drives every transition.
//! - [`StageCell`] is shared by the slot, its spawned completions and every
//!   guarded callback, so predicates are evaluated at call time.

use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::error::SlotError;

/// Lifecycle stage of a slot.
///
/// Discriminants are the legacy bit codes (`1, 2, 4, 8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Created, owner module still initializing.
    Initing = 1,
    /// Owner module initialized.
    Inited = 2,
    /// Owner module is being torn down.
    Killed = 4,
    /// Owner module is gone.
    Disposed = 8,
}

impl Stage {
    /// Bit mask of the alive stages (`Initing | Inited`).
    pub const ALIVE_MASK: u8 = Stage::Initing.bits() | Stage::Inited.bits();

    /// Bit mask of the not-alive stages (`Killed | Disposed`).
    pub const NOT_ALIVE_MASK: u8 = Stage::Killed.bits() | Stage::Disposed.bits();

    /// Legacy bit code of this stage.
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decodes a legacy bit code. Union masks are not stages and yield `None`.
    pub const fn from_bits(bits: u8) -> Option<Stage> {
        match bits {
            1 => Some(Stage::Initing),
            2 => Some(Stage::Inited),
            4 => Some(Stage::Killed),
            8 => Some(Stage::Disposed),
            _ => None,
        }
    }

    /// True for `Initing` and `Inited`.
    #[inline]
    pub const fn is_alive(self) -> bool {
        matches!(self, Stage::Initing | Stage::Inited)
    }

    /// True for `Killed` and `Disposed`.
    #[inline]
    pub const fn is_not_alive(self) -> bool {
        !self.is_alive()
    }

    /// Whether the host may move from `self` to `to`.
    #[inline]
    pub fn can_move_to(self, to: Stage) -> bool {
        to >= self
    }

    /// Lowercase name for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Initing => "initing",
            Stage::Inited => "inited",
            Stage::Killed => "killed",
            Stage::Disposed => "disposed",
        }
    }
}

/// Shared, atomically updated stage.
///
/// Clones observe the same value.
#[derive(Clone, Debug)]
pub struct StageCell(Arc<AtomicU8>);

impl StageCell {
    /// Creates a cell in [`Stage::Initing`].
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(Stage::Initing.bits())))
    }

    /// Current stage.
    #[inline]
    pub fn get(&self) -> Stage {
        decode(self.0.load(AtomicOrdering::Acquire))
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.get().is_alive()
    }

    #[inline]
    pub fn is_not_alive(&self) -> bool {
        self.get().is_not_alive()
    }

    /// Moves the stage forward.
    ///
    /// Returns `Ok(Some(previous))` when the stage changed, `Ok(None)` when it
    /// already was `to`, and [`SlotError::InvalidTransition`] for backward moves.
    pub(crate) fn advance(&self, to: Stage) -> Result<Option<Stage>, SlotError> {
        let mut from = self.get();
        loop {
            if from == to {
                return Ok(None);
            }
            if !from.can_move_to(to) {
                return Err(SlotError::InvalidTransition { from, to });
            }
            match self.0.compare_exchange(
                from.bits(),
                to.bits(),
                AtomicOrdering::AcqRel,
                AtomicOrdering::Acquire,
            ) {
                Ok(_) => return Ok(Some(from)),
                Err(actual) => from = decode(actual),
            }
        }
    }
}

impl Default for StageCell {
    fn default() -> Self {
        Self::new()
    }
}

// Only codes produced by `Stage::bits` are ever stored.
fn decode(bits: u8) -> Stage {
    Stage::from_bits(bits).unwrap_or(Stage::Disposed)
}
