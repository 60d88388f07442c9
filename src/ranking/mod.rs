//! Priority rule composition for deterministic rankings.
//!
//! Rules are evaluated in order; a later rule is only consulted when every
//! earlier rule ties within epsilon. A final [`TieBreaker`] makes the order
//! total, so two runs over the same input always rank identically.
//!
//! Governance ranks candidates by composite score and the scheduler ranks
//! jobs by effective priority, both breaking ties by lower project id.
//!
//! # References
//!
//! Dispatching rule composition: Pinedo (2016), "Scheduling: Theory,
//! Algorithms, and Systems"

mod engine;
mod types;

pub use engine::{RuleEngine, TieBreaker};
pub use types::PriorityRule;
