//! Error types used by slots and the modules they supervise.
//!
//! This module defines three error types:
//!
//! - [`ModuleError`]: errors reported by a child module's `init`.
//! - [`SlotError`]: errors raised by the slot itself (invalid stage moves).
//! - [`BatchError`]: first failure of an [`init_modules`](crate::Slot::init_modules) /
//!   [`init_modules_series`](crate::Slot::init_modules_series) batch.
//!
//! Each type provides helper methods (`as_label`, `as_message`) for logging.
//!
//! Operations on a dead slot are **not** errors: they are silently discarded.

use std::any::Any;

use thiserror::Error;

use crate::core::Stage;
use crate::host::ModuleRef;

/// # Errors reported by module initialization.
///
/// Returned from [`Module::init`](crate::Module::init). A failed module is
/// disposed by the slot and never registered.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// Initialization failed.
    #[error("init failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Initialization failed in a way the module considers unrecoverable.
    #[error("fatal init error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Initialization was cancelled before it could finish.
    #[error("init cancelled")]
    Canceled,
}

impl ModuleError {
    /// Shorthand for [`ModuleError::Failed`].
    pub fn failed(error: impl Into<String>) -> Self {
        ModuleError::Failed {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use slotkeeper::ModuleError;
    ///
    /// let err = ModuleError::failed("no data");
    /// assert_eq!(err.as_label(), "module_init_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ModuleError::Failed { .. } => "module_init_failed",
            ModuleError::Fatal { .. } => "module_init_fatal",
            ModuleError::Canceled => "module_init_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ModuleError::Failed { error } => format!("error: {error}"),
            ModuleError::Fatal { error } => format!("fatal: {error}"),
            ModuleError::Canceled => "init cancelled".to_string(),
        }
    }
}

/// # Errors produced by the slot itself.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// The host tried to move the stage backwards (e.g. `Killed` → `Inited`).
    #[error("invalid stage transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Stage at the time of the request.
        from: Stage,
        /// Requested stage.
        to: Stage,
    },
}

impl SlotError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SlotError::InvalidTransition { .. } => "slot_invalid_transition",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SlotError::InvalidTransition { from, to } => {
                format!("stage cannot move from {} to {}", from.as_str(), to.as_str())
            }
        }
    }
}

/// First failure of a batch instantiation.
///
/// `modules` holds the per-item outcome known when the failure was reported,
/// in list order: `Some(module)` for items that completed (including the failing
/// one), `None` for items still in flight or never started.
#[derive(Error, Debug)]
#[error("batch item #{index} failed: {source}")]
pub struct BatchError {
    /// Position of the failing item in the batch list.
    pub index: usize,
    /// Error reported by the failing module.
    #[source]
    pub source: ModuleError,
    /// Per-item results at the time of failure.
    pub modules: Vec<Option<ModuleRef>>,
}

impl BatchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        self.source.as_label()
    }
}

/// Extracts the message carried by a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
