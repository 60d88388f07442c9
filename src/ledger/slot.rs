//! Slot keys and counters.

use std::fmt;

/// A crew or equipment class, e.g. `water_crew`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a resource type from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The resource name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a reservation against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Reservation {
    /// Tentative; held for decisions awaiting confirmation.
    Soft,
    /// Committed.
    Hard,
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soft => f.write_str("soft"),
            Self::Hard => f.write_str("hard"),
        }
    }
}

/// Ledger key. Orders by resource, then year, then week.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotKey {
    /// Resource class.
    pub resource: ResourceType,
    /// Calendar year.
    pub year: i32,
    /// Planning week number (1-based).
    pub week: u32,
}

impl SlotKey {
    /// Creates a key.
    pub fn new(resource: ResourceType, week: u32, year: i32) -> Self {
        Self {
            resource,
            year,
            week,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-W{}", self.resource, self.year, self.week)
    }
}

/// Capacity and reservation counters for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceSlot {
    /// Units available in the week.
    pub capacity: u32,
    /// Units held by soft reservations.
    pub soft_allocated: u32,
    /// Units held by hard reservations.
    pub hard_allocated: u32,
}

impl ResourceSlot {
    /// An empty slot with the given capacity.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            soft_allocated: 0,
            hard_allocated: 0,
        }
    }

    /// Soft plus hard units.
    pub fn total_allocated(&self) -> u32 {
        self.soft_allocated + self.hard_allocated
    }

    /// Free units. Saturates at zero so a corrupted slot reads as full.
    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.total_allocated())
    }

    /// Units held under the given reservation kind.
    pub fn held(&self, kind: Reservation) -> u32 {
        match kind {
            Reservation::Soft => self.soft_allocated,
            Reservation::Hard => self.hard_allocated,
        }
    }

    /// Whether `soft + hard <= capacity`.
    pub fn is_consistent(&self) -> bool {
        self.soft_allocated
            .checked_add(self.hard_allocated)
            .is_some_and(|total| total <= self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_counters() {
        let slot = ResourceSlot {
            capacity: 5,
            soft_allocated: 2,
            hard_allocated: 1,
        };
        assert_eq!(slot.total_allocated(), 3);
        assert_eq!(slot.available(), 2);
        assert_eq!(slot.held(Reservation::Soft), 2);
        assert_eq!(slot.held(Reservation::Hard), 1);
        assert!(slot.is_consistent());
    }

    #[test]
    fn test_inconsistent_slot_reads_full() {
        let slot = ResourceSlot {
            capacity: 2,
            soft_allocated: 2,
            hard_allocated: 1,
        };
        assert!(!slot.is_consistent());
        assert_eq!(slot.available(), 0);
    }

    #[test]
    fn test_key_ordering() {
        let a = SlotKey::new("a".into(), 9, 2025);
        let b = SlotKey::new("a".into(), 2, 2026);
        let c = SlotKey::new("b".into(), 1, 2024);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "a/2025-W9");
    }
}
