//! Growth and sizing knobs for the containers.
//!
//! Every container has a `Default` configuration and a `with_config`
//! constructor. Configurations are validated when a container is built from
//! them; the defaults always validate.

use crate::error::{ContainerError, Result};

/// Buffer growth policy for [`Array`](crate::Array).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayConfig {
    /// Capacity multiplier applied when a resize outgrows the buffer.
    pub growth_factor: usize,
    /// Smallest capacity (in elements) ever allocated.
    pub min_capacity: usize,
}

impl ArrayConfig {
    /// Create a new array configuration
    pub fn new(growth_factor: usize, min_capacity: usize) -> Self {
        Self {
            growth_factor,
            min_capacity,
        }
    }

    /// Reject policies that would not grow geometrically.
    pub fn validate(&self) -> Result<()> {
        if self.growth_factor < 2 {
            return Err(ContainerError::invalid_config(
                "growth_factor must be at least 2",
            ));
        }
        Ok(())
    }
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self::new(2, 8)
    }
}

/// Sizing for [`Mempool`](crate::Mempool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MempoolConfig {
    /// Number of blocks reserved up front.
    pub initial_capacity: usize,
}

impl MempoolConfig {
    /// Create a new mempool configuration
    pub fn new(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }

    /// Any capacity is fine; kept for symmetry with the other configs.
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Slot-count policy for [`Hash`](crate::Hash).
///
/// The table grows to `slots * growth_factor + 1` once
/// `elem_count > max_load * slots`, and shrinks to `slots / growth_factor`
/// on removal when `elem_count * shrink_divisor < slots`, never below
/// `min_slots`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashConfig {
    pub initial_slots: usize,
    pub min_slots: usize,
    pub max_load: usize,
    pub growth_factor: usize,
    pub shrink_divisor: usize,
}

impl HashConfig {
    /// Small tables for many short-lived hashes.
    pub fn small() -> Self {
        Self {
            initial_slots: 15,
            min_slots: 15,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_slots == 0 || self.min_slots == 0 {
            return Err(ContainerError::invalid_config("slot counts must be positive"));
        }
        if self.initial_slots < self.min_slots {
            return Err(ContainerError::invalid_config(
                "initial_slots must not be below min_slots",
            ));
        }
        if self.max_load == 0 {
            return Err(ContainerError::invalid_config("max_load must be positive"));
        }
        if self.growth_factor < 2 {
            return Err(ContainerError::invalid_config(
                "growth_factor must be at least 2",
            ));
        }
        // A shrink must never land the table straight back above max_load.
        if self.shrink_divisor <= self.growth_factor {
            return Err(ContainerError::invalid_config(
                "shrink_divisor must exceed growth_factor",
            ));
        }
        Ok(())
    }

    /// New slot count if `elems` overloads `slots`.
    pub(crate) fn grow_target(&self, elems: usize, slots: usize) -> Option<usize> {
        (elems > self.max_load.saturating_mul(slots))
            .then(|| slots.saturating_mul(self.growth_factor).saturating_add(1))
    }

    /// New slot count if `elems` leaves `slots` mostly empty.
    pub(crate) fn shrink_target(&self, elems: usize, slots: usize) -> Option<usize> {
        let shrunk = slots / self.growth_factor;
        (elems.saturating_mul(self.shrink_divisor) < slots && shrunk >= self.min_slots)
            .then_some(shrunk)
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            initial_slots: 255,
            min_slots: 255,
            max_load: 4,
            growth_factor: 2,
            shrink_divisor: 4,
        }
    }
}
