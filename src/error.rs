//! Error types for the planning core.
//!
//! The variants follow the operational taxonomy: configuration errors are
//! fatal at startup, input validation and capacity conflicts are recovered
//! per item, solver infeasibility is reported distinctly from running out of
//! time, and invariant violations halt the run.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::governance::DecisionStatus;
use crate::ids::{DecisionId, IssueId, ProjectId};
use crate::ledger::{Reservation, SlotKey};

/// Errors produced by the planning core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    /// Configuration rejected at load time.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed issue signal.
    #[error("invalid signal for issue {issue_id}: {reason}")]
    InvalidSignal {
        /// Offending issue.
        issue_id: IssueId,
        /// What was wrong with it.
        reason: String,
    },

    /// Tier label outside the fixed tables.
    #[error("unknown {kind} tier `{value}`")]
    UnknownTier {
        /// Table name (`safety` or `mandate`).
        kind: &'static str,
        /// The rejected label.
        value: String,
    },

    /// Feasibility outside [0, 1].
    #[error("feasibility {0} outside [0, 1]")]
    InvalidFeasibility(f64),

    /// A reservation would push a slot over capacity.
    #[error("capacity exceeded at {key}: requested {requested}, available {available}")]
    CapacityExceeded {
        /// Slot that rejected the write.
        key: SlotKey,
        /// Units requested.
        requested: u32,
        /// Units still free.
        available: u32,
    },

    /// A release or promotion asked for more units than are held.
    #[error("cannot take {requested} {kind} units from {key}: only {held} held")]
    ReleaseUnderflow {
        /// Slot that rejected the write.
        key: SlotKey,
        /// Reservation kind being drawn down.
        kind: Reservation,
        /// Units requested.
        requested: u32,
        /// Units currently held.
        held: u32,
    },

    /// No capacity has been seeded for the slot.
    #[error("unknown resource slot {0}")]
    UnknownSlot(SlotKey),

    /// The exact solver proved that no valid assignment exists.
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// The exact solver exhausted its time budget without a solution.
    #[error("solver time budget exhausted without a solution")]
    SolverTimeout,

    /// Project has no scored candidate in the portfolio.
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    /// Decision id not present in the portfolio.
    #[error("decision {0} not found")]
    DecisionNotFound(DecisionId),

    /// Confirmation attempted after the window closed.
    #[error("confirmation window for decision {decision_id} closed at {deadline}")]
    ConfirmationExpired {
        /// Decision being confirmed.
        decision_id: DecisionId,
        /// When the window closed.
        deadline: DateTime<Utc>,
    },

    /// State machine rejected the transition.
    #[error("decision {decision_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Decision being changed.
        decision_id: DecisionId,
        /// Current status.
        from: DecisionStatus,
        /// Requested status.
        to: DecisionStatus,
    },

    /// A correctness invariant was found broken after the fact.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The scheduling run was cancelled before commit.
    #[error("scheduling run cancelled")]
    Cancelled,
}

impl PlanningError {
    /// Whether the error must halt the run rather than skip the item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvariantViolation(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlanningError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ResourceType;

    #[test]
    fn test_display_messages() {
        let err = PlanningError::Config("weights sum to 0.95".into());
        assert_eq!(err.to_string(), "invalid configuration: weights sum to 0.95");

        let key = SlotKey::new(ResourceType::new("water_crew"), 3, 2025);
        let err = PlanningError::CapacityExceeded {
            key,
            requested: 4,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "capacity exceeded at water_crew/2025-W3: requested 4, available 1"
        );

        assert_eq!(PlanningError::DecisionNotFound(7).to_string(), "decision 7 not found");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PlanningError::Config("x".into()).is_fatal());
        assert!(PlanningError::InvariantViolation("x".into()).is_fatal());
        assert!(!PlanningError::SolverTimeout.is_fatal());
        assert!(!PlanningError::Infeasible("x".into()).is_fatal());
        assert!(!PlanningError::DecisionNotFound(1).is_fatal());
    }

    #[test]
    fn test_expired_distinct_from_not_found() {
        let deadline = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let expired = PlanningError::ConfirmationExpired {
            decision_id: 1,
            deadline,
        };
        assert_ne!(expired, PlanningError::DecisionNotFound(1));
    }
}
