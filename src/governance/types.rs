//! Decision records and the decision state machine.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::equity::DistrictAllocation;
use crate::error::{PlanningError, Result};
use crate::ids::{DecisionId, DistrictId, ProjectId};

/// Lifecycle state of a portfolio decision.
///
/// ```text
/// Proposed ──► Approved
///          ├─► ApprovedWithConditions ──► Confirmed (locked)
///          │                          ├─► Expired
///          │                          └─► Rejected (declined)
///          ├─► Deferred
///          └─► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DecisionStatus {
    Proposed,
    Approved,
    ApprovedWithConditions,
    Deferred,
    Rejected,
    Expired,
    Confirmed,
}

impl DecisionStatus {
    /// Whether the state machine allows `self -> to`.
    pub fn can_transition_to(self, to: DecisionStatus) -> bool {
        use DecisionStatus::*;
        matches!(
            (self, to),
            (Proposed, Approved | ApprovedWithConditions | Deferred | Rejected)
                | (ApprovedWithConditions, Confirmed | Expired | Rejected)
        )
    }

    /// No further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Confirmed)
    }

    /// Holds budget: approved, pending confirmation or confirmed.
    pub fn is_funded(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::ApprovedWithConditions | Self::Confirmed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "PROPOSED",
            Self::Approved => "APPROVED",
            Self::ApprovedWithConditions => "APPROVED_WITH_CONDITIONS",
            Self::Deferred => "DEFERRED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
            Self::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget phase a decision was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AllocationPhase {
    Mandate,
    UrgentCritical,
    ValueRanked,
}

impl fmt::Display for AllocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mandate => "mandate",
            Self::UrgentCritical => "urgent_critical",
            Self::ValueRanked => "value_ranked",
        })
    }
}

/// Governance outcome for one candidate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioDecision {
    pub decision_id: DecisionId,
    pub project_id: ProjectId,
    pub district_id: Option<DistrictId>,
    pub status: DecisionStatus,
    /// Phase that decided the candidate.
    pub phase: AllocationPhase,
    /// Budget drawn; zero unless funded.
    pub allocated_budget: f64,
    /// Approval order within the cycle, 1 = best. `None` unless funded.
    pub priority_rank: Option<u32>,
    pub rationale: String,
    pub deadline_week: u32,
    pub requires_confirmation: bool,
    pub proposed_at: DateTime<Utc>,
    pub confirmation_deadline: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
}

impl PortfolioDecision {
    /// Next version of this decision in state `to`.
    ///
    /// Fails with `InvalidTransition` if the state machine forbids it.
    pub fn transition(&self, to: DecisionStatus, rationale: impl Into<String>) -> Result<Self> {
        if !self.status.can_transition_to(to) {
            return Err(PlanningError::InvalidTransition {
                decision_id: self.decision_id,
                from: self.status,
                to,
            });
        }
        let mut next = self.clone();
        next.status = to;
        next.rationale = rationale.into();
        Ok(next)
    }

    /// Whether a pending confirmation window has closed at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == DecisionStatus::ApprovedWithConditions
            && self.confirmation_deadline.is_some_and(|d| now > d)
    }
}

/// Budget usage of one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BudgetSummary {
    pub phase: AllocationPhase,
    /// Cap in currency, including rollover for the value-ranked phase.
    pub cap: f64,
    pub allocated: f64,
    pub remaining: f64,
    pub approved: usize,
}

/// Output of one allocation run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationOutcome {
    /// One decision per candidate, ordered by decision id.
    pub decisions: Vec<PortfolioDecision>,
    pub phase_summaries: Vec<BudgetSummary>,
    /// District rollup for the next cycle.
    pub allocations: Vec<DistrictAllocation>,
    pub total_allocated: f64,
}

impl AllocationOutcome {
    /// Decisions in the given status.
    pub fn with_status(&self, status: DecisionStatus) -> impl Iterator<Item = &PortfolioDecision> {
        self.decisions.iter().filter(move |d| d.status == status)
    }

    /// Decision for a project.
    pub fn for_project(&self, project_id: ProjectId) -> Option<&PortfolioDecision> {
        self.decisions.iter().find(|d| d.project_id == project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DecisionStatus::*;

    const ALL: [DecisionStatus; 7] = [
        Proposed,
        Approved,
        ApprovedWithConditions,
        Deferred,
        Rejected,
        Expired,
        Confirmed,
    ];

    #[test]
    fn test_transitions() {
        assert!(Proposed.can_transition_to(Approved));
        assert!(Proposed.can_transition_to(Deferred));
        assert!(ApprovedWithConditions.can_transition_to(Confirmed));
        assert!(ApprovedWithConditions.can_transition_to(Expired));
        assert!(ApprovedWithConditions.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Confirmed));
        assert!(!Deferred.can_transition_to(Approved));
        assert!(!Proposed.can_transition_to(Confirmed));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(ApprovedWithConditions.to_string(), "APPROVED_WITH_CONDITIONS");
        assert_eq!(AllocationPhase::UrgentCritical.to_string(), "urgent_critical");
        assert!(Confirmed.is_funded());
        assert!(!Deferred.is_funded());
    }
}
