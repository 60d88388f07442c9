//! Portfolio governance.
//!
//! [`GovernanceAllocator`] turns scored candidates into decisions by running
//! three budget phases in strict order. [`Portfolio`] keeps every decision
//! and schedule task as an append-only version history and drives the
//! confirmation workflow: confirm, decline, and the expiry sweep.

mod allocator;
mod config;
mod portfolio;
mod types;

pub use allocator::GovernanceAllocator;
pub use config::GovernanceConfig;
pub use portfolio::{ExpirySweep, Portfolio, PortfolioSummary};
pub use types::{
    AllocationOutcome, AllocationPhase, BudgetSummary, DecisionStatus, PortfolioDecision,
};
