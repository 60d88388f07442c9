//! Scheduling domain types.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use crate::cp::SolverStatus;
use crate::governance::{DecisionStatus, PortfolioDecision};
use crate::ids::{DecisionId, ProjectId, TaskId};
use crate::ledger::{Reservation, ResourceType};
use crate::scoring::ProjectCandidate;

/// A funded project waiting for crew weeks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulingJob {
    pub project_id: ProjectId,
    pub decision_id: DecisionId,
    pub resource_type: ResourceType,
    pub crew_size: u32,
    pub duration_weeks: u32,
    /// Last week the work should occupy.
    pub deadline_week: u32,
    /// Governance approval rank, 1 = best.
    pub priority_rank: u32,
    pub urgency_score: f64,
    /// Reservations stay soft until the decision is confirmed.
    pub requires_confirmation: bool,
}

impl SchedulingJob {
    /// Builds a job from an approved decision and its candidate.
    ///
    /// Pending approvals reserve soft; approved and confirmed decisions
    /// reserve hard. Returns `None` for unfunded decisions, or for a
    /// decision that belongs to another project.
    pub fn from_decision(decision: &PortfolioDecision, candidate: &ProjectCandidate) -> Option<Self> {
        if decision.project_id != candidate.project_id {
            return None;
        }
        let requires_confirmation = match decision.status {
            DecisionStatus::Approved | DecisionStatus::Confirmed => false,
            DecisionStatus::ApprovedWithConditions => true,
            _ => return None,
        };
        Some(Self {
            project_id: candidate.project_id,
            decision_id: decision.decision_id,
            resource_type: candidate.resource_type.clone(),
            crew_size: candidate.crew_size,
            duration_weeks: candidate.duration_weeks.max(1),
            deadline_week: decision.deadline_week,
            priority_rank: decision.priority_rank?,
            urgency_score: candidate.scores.urgency,
            requires_confirmation,
        })
    }

    /// Reservation kind this job places.
    pub fn reservation(&self) -> Reservation {
        if self.requires_confirmation {
            Reservation::Soft
        } else {
            Reservation::Hard
        }
    }

    /// Weeks occupied when starting at `start`.
    pub fn weeks_from(&self, start: u32) -> RangeInclusive<u32> {
        start..=start + self.duration_weeks - 1
    }
}

/// Scheduling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
    Greedy,
    GreedyWithRepair,
    Exact,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Greedy => "greedy",
            Self::GreedyWithRepair => "greedy_with_repair",
            Self::Exact => "exact",
        })
    }
}

/// Selected strategy and why.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrategyChoice {
    pub strategy: Strategy,
    pub reason: String,
}

/// Where a task stands against its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DeadlineStatus {
    OnTrack,
    AtRisk,
    Missed,
}

impl DeadlineStatus {
    /// Classifies a slack in days.
    ///
    /// ```
    /// use u_capital::scheduling::DeadlineStatus;
    ///
    /// assert_eq!(DeadlineStatus::classify(0, 0, 7), DeadlineStatus::OnTrack);
    /// assert_eq!(DeadlineStatus::classify(-7, 0, 7), DeadlineStatus::AtRisk);
    /// assert_eq!(DeadlineStatus::classify(-14, 0, 7), DeadlineStatus::Missed);
    /// ```
    pub fn classify(slack_days: i64, on_track_margin_days: i64, at_risk_tolerance_days: i64) -> Self {
        if slack_days >= on_track_margin_days {
            Self::OnTrack
        } else if slack_days >= -at_risk_tolerance_days {
            Self::AtRisk
        } else {
            Self::Missed
        }
    }
}

impl fmt::Display for DeadlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OnTrack => "ON_TRACK",
            Self::AtRisk => "AT_RISK",
            Self::Missed => "MISSED",
        })
    }
}

/// Slack in days between a deadline week and the last occupied week.
pub fn slack_days(deadline_week: u32, end_week: u32) -> i64 {
    (i64::from(deadline_week) - i64::from(end_week)) * 7
}

/// Lifecycle of a stored task version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TaskStatus {
    /// Holds reservations.
    Scheduled,
    /// Replaced by a later scheduling run.
    Superseded,
    /// Reservations given back after decline or expiry.
    Released,
}

/// A placed job.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleTask {
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub decision_id: DecisionId,
    pub year: i32,
    pub start_week: u32,
    /// Last occupied week, inclusive.
    pub end_week: u32,
    pub deadline_week: u32,
    pub slack_days: i64,
    pub deadline_status: DeadlineStatus,
    pub resource_type: ResourceType,
    pub crew_assigned: u32,
    pub reservation: Reservation,
    pub status: TaskStatus,
}

impl ScheduleTask {
    /// Occupied weeks.
    pub fn weeks(&self) -> RangeInclusive<u32> {
        self.start_week..=self.end_week
    }

    /// Whether the task still holds ledger units.
    pub fn holds_reservation(&self) -> bool {
        self.status == TaskStatus::Scheduled
    }
}

/// A job no window could hold.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnschedulableJob {
    pub project_id: ProjectId,
    pub decision_id: DecisionId,
    pub resource_type: ResourceType,
    pub reason: String,
}

/// Counts and utilization after a run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleSummary {
    pub scheduled: usize,
    pub unschedulable: usize,
    pub on_track: usize,
    pub at_risk: usize,
    pub missed: usize,
    pub total_lateness_days: i64,
    /// Share of seeded capacity in use per resource type after the run.
    pub utilization: BTreeMap<ResourceType, f64>,
}

/// Result of one scheduling run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulePlan {
    pub strategy: Strategy,
    pub reason: String,
    /// Status of the exact solver, when it ran.
    pub solver_status: Option<SolverStatus>,
    /// The exact solver gave no plan and greedy-with-repair was used instead.
    pub fell_back: bool,
    /// Placed tasks in priority order.
    pub tasks: Vec<ScheduleTask>,
    pub unschedulable: Vec<UnschedulableJob>,
    /// Prior tasks whose reservations this run released.
    pub superseded: Vec<TaskId>,
    pub summary: ScheduleSummary,
}

/// Input of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulingRequest {
    pub year: i32,
    pub jobs: Vec<SchedulingJob>,
    /// Active tasks from earlier runs; those of rescheduled projects are superseded.
    pub prior_tasks: Vec<ScheduleTask>,
    pub first_task_id: TaskId,
}

impl SchedulingRequest {
    pub fn new(year: i32, jobs: Vec<SchedulingJob>) -> Self {
        Self {
            year,
            jobs,
            prior_tasks: Vec::new(),
            first_task_id: 1,
        }
    }

    pub fn with_prior_tasks(mut self, tasks: Vec<ScheduleTask>) -> Self {
        self.prior_tasks = tasks;
        self
    }

    pub fn with_first_task_id(mut self, id: TaskId) -> Self {
        self.first_task_id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_bands() {
        assert_eq!(DeadlineStatus::classify(14, 0, 7), DeadlineStatus::OnTrack);
        assert_eq!(DeadlineStatus::classify(3, 7, 7), DeadlineStatus::AtRisk);
        assert_eq!(DeadlineStatus::classify(-8, 0, 7), DeadlineStatus::Missed);
    }

    #[test]
    fn test_slack_days() {
        assert_eq!(slack_days(10, 8), 14);
        assert_eq!(slack_days(4, 8), -28);
    }

    #[test]
    fn test_job_weeks_and_reservation() {
        let job = SchedulingJob {
            project_id: 1,
            decision_id: 1,
            resource_type: ResourceType::new("water_crew"),
            crew_size: 2,
            duration_weeks: 3,
            deadline_week: 6,
            priority_rank: 1,
            urgency_score: 0.5,
            requires_confirmation: true,
        };
        assert_eq!(job.weeks_from(4), 4..=6);
        assert_eq!(job.reservation(), Reservation::Soft);
    }
}
