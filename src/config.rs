//! # Slot configuration.
//!
//! Provides [`SlotConfig`], the settings a host passes to
//! [`Slot::builder`](crate::Slot::builder).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by the event bus

/// Configuration for a single slot.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `gate_intervals`: Refuse `set_interval` on a dead slot (`false` keeps intervals ungated)
#[derive(Clone, Debug)]
pub struct SlotConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// skip older items.
    pub bus_capacity: usize,

    /// Whether [`Slot::set_interval`](crate::Slot::set_interval) is gated by the stage.
    ///
    /// Timeouts are always refused once the slot is not alive. Intervals are
    /// created unconditionally unless this flag is set, in which case they
    /// follow the same rule as timeouts.
    pub gate_intervals: bool,
}

impl SlotConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SlotConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `gate_intervals = false`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            gate_intervals: false,
        }
    }
}
