//! Weekly crew capacity ledger.
//!
//! Tracks capacity per `(resource_type, week, year)` slot with separate
//! soft (tentative) and hard (committed) reservation counters. Every
//! mutation is conditional on `soft + hard <= capacity`; a request that
//! would break it fails with no partial effect.
//!
//! # Concurrency
//!
//! The ledger itself is a plain value. Runs that share it go through
//! [`SharedLedger`], a `parking_lot` mutex: a scheduling run holds the lock
//! for its whole duration and confirmation/expiry sweeps take the same lock.

mod book;
mod slot;

pub use book::{shared, ResourceLedger, SharedLedger, Utilization};
pub use slot::{Reservation, ResourceSlot, ResourceType, SlotKey};
