//! Deterministic capital-project planning core.
//!
//! Turns measured issue signals into a funded, scheduled portfolio:
//!
//! - **Scoring**: weighted composite of safety, mandate, benefit, urgency and
//!   feasibility, adjusted by a bounded district equity multiplier.
//! - **Equity**: per-district service ratios, multipliers and the fair-share
//!   budget rollup.
//! - **Governance**: three strict budget phases (mandate, urgent-critical,
//!   value-ranked) producing versioned portfolio decisions, plus the
//!   confirm / decline / expire workflow for conditional approvals.
//! - **Ledger**: weekly crew capacity with soft and hard reservations that
//!   never exceed capacity.
//! - **Scheduling**: greedy, greedy-with-repair or exact placement of
//!   approved projects into crew weeks, with deadline tracking.
//! - **CP**: the small constraint-programming layer and branch-and-bound
//!   solver behind exact scheduling.
//! - **Ranking**: priority-rule composition used for every ordering.
//!
//! # Architecture
//!
//! All computation is deterministic for identical inputs and configuration:
//! time is passed in explicitly, collections are ordered, and ties break on
//! ids. The only randomness lives in benches. [`pipeline::PlanningCycle`]
//! wires the stages in their fixed order against one shared ledger.

pub mod audit;
pub mod config;
pub mod cp;
pub mod equity;
pub mod error;
pub mod governance;
pub mod history;
pub mod ids;
pub mod ledger;
pub mod pipeline;
pub mod ranking;
pub mod scheduling;
pub mod scoring;
pub mod telemetry;

pub use error::{PlanningError, Result};
