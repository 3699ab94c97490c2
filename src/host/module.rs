//! # Child module abstraction.
//!
//! This module defines the [`Module`] trait (async init, sync dispose) and the
//! configuration handed to [`Host::load_module`](crate::Host::load_module).
//! The common handle type is [`ModuleRef`], an `Arc<dyn Module>` suitable for
//! sharing between the slot's registry, the host and callers.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ModuleError;

/// Shared handle to a module.
pub type ModuleRef = Arc<dyn Module>;

/// # Externally constructed unit with an init/dispose lifecycle.
///
/// The slot treats modules as opaque: it initializes them, disposes the ones
/// that fail, and keeps references to the ones that succeed.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use slotkeeper::{Module, ModuleError};
///
/// struct Banner;
///
/// #[async_trait]
/// impl Module for Banner {
///     fn id(&self) -> &str { "banner-1" }
///
///     async fn init(&self, data: Value) -> Result<(), ModuleError> {
///         if data.get("text").is_none() {
///             return Err(ModuleError::failed("missing text"));
///         }
///         Ok(())
///     }
///
///     fn dispose(&self) {}
/// }
/// ```
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Host-assigned identifier of this instance.
    fn id(&self) -> &str;

    /// Initializes the module with the data passed to `Slot::init`.
    async fn init(&self, data: Value) -> Result<(), ModuleError>;

    /// Releases a module whose initialization failed.
    fn dispose(&self);
}

impl fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("id", &self.id()).finish()
    }
}

/// Construction request passed to the host.
///
/// `parent_id` is overwritten by the slot with its own module id so the child
/// can address its parent.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleConfig {
    /// Module type name, e.g. `"firmCard"`.
    pub kind: String,
    /// Init data; an empty JSON object when not provided.
    pub data: Value,
    /// Module id of the owning slot.
    pub parent_id: Option<String>,
}

impl ModuleConfig {
    /// Creates a config with empty data and no parent.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: empty_data(),
            parent_id: None,
        }
    }

    /// Returns a new config with updated data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Default init data: an empty record.
pub(crate) fn empty_data() -> Value {
    Value::Object(Map::new())
}
