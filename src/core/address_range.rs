//! AddressRange type for code-section bounds.
//!
//! A half-open `[start, end)` region. Module code sections are expressed as
//! ranges so that tables can answer containment and overlap questions.

use crate::core::address::Address;
use crate::error::{ModuleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open contiguous region of the firmware address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    /// The starting address of the range (inclusive)
    pub start: Address,
    /// The size of the range in bytes
    pub size: u64,
}

impl AddressRange {
    /// Create a new AddressRange.
    ///
    /// # Errors
    /// Returns `AddressOverflow` if the end address does not fit in 64 bits.
    pub fn new(start: Address, size: u64) -> Result<Self> {
        start.checked_add(size)?;
        Ok(AddressRange { start, size })
    }

    /// Build a range from explicit bounds.
    ///
    /// # Errors
    /// Returns `InvalidAddress` if `end` lies below `start`.
    pub fn from_bounds(start: Address, end: Address) -> Result<Self> {
        let size = start.distance_to(end).ok_or_else(|| {
            ModuleError::invalid_address(end, format!("end precedes start {start}"))
        })?;
        Ok(AddressRange { start, size })
    }

    /// The end address (exclusive).
    pub fn end(&self) -> Address {
        // Checked in the constructors.
        Address::new(self.start.value().saturating_add(self.size))
    }

    /// Check if the range is empty (size = 0).
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if this range contains the given address.
    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.end()
    }

    /// Check if this range completely contains another range.
    pub fn contains_range(&self, other: &AddressRange) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Check if this range overlaps another. Empty and adjacent ranges do not.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end()
            && other.start < self.end()
    }

    /// Check if `other` begins exactly where this range ends.
    pub fn is_adjacent_to(&self, other: &AddressRange) -> bool {
        self.end() == other.start
    }

    /// Get the intersection of this range with another range.
    pub fn intersection(&self, other: &AddressRange) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        let size = start.distance_to(end).filter(|&s| s > 0)?;
        Some(AddressRange { start, size })
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
