//! Scheduling run against the shared ledger.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::config::SchedulerConfig;
use super::exact::solve_exact;
use super::greedy::{greedy, Assignment};
use super::priority::{effective_priorities, priority_order};
use super::repair::repair;
use super::selector::select_strategy;
use super::types::{
    slack_days, DeadlineStatus, SchedulePlan, ScheduleSummary, ScheduleTask, SchedulingJob,
    SchedulingRequest, Strategy, StrategyChoice, TaskStatus, UnschedulableJob,
};
use crate::cp::SolverStatus;
use crate::error::{PlanningError, Result};
use crate::ids::TaskId;
use crate::ledger::{ResourceLedger, SharedLedger};

/// Places approved projects into crew weeks.
///
/// A run holds the ledger lock for its whole duration and works on a staged
/// copy; the copy replaces the ledger only when the run succeeds. An error or
/// a cancellation leaves the ledger exactly as it was.
///
/// # Examples
///
/// ```
/// use u_capital::ledger::{shared, ResourceLedger, ResourceType};
/// use u_capital::scheduling::{SchedulerConfig, SchedulingEngine, SchedulingJob, SchedulingRequest};
///
/// let ledger = shared(ResourceLedger::new().with_weekly_capacity("water_crew", 2025, 1..=12, 3));
/// let job = SchedulingJob {
///     project_id: 7,
///     decision_id: 1,
///     resource_type: ResourceType::new("water_crew"),
///     crew_size: 2,
///     duration_weeks: 3,
///     deadline_week: 6,
///     priority_rank: 1,
///     urgency_score: 0.8,
///     requires_confirmation: false,
/// };
///
/// let engine = SchedulingEngine::new(SchedulerConfig::default());
/// let plan = engine.run(&SchedulingRequest::new(2025, vec![job]), &ledger).unwrap();
/// assert_eq!(plan.tasks[0].start_week, 1);
/// assert_eq!(plan.tasks[0].end_week, 3);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulingEngine {
    config: SchedulerConfig,
}

impl SchedulingEngine {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Runs to completion.
    pub fn run(&self, request: &SchedulingRequest, ledger: &SharedLedger) -> Result<SchedulePlan> {
        self.run_with_cancel(request, ledger, None)
    }

    /// Runs until done or until `cancel` is raised.
    pub fn run_with_cancel(
        &self,
        request: &SchedulingRequest,
        ledger: &SharedLedger,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SchedulePlan> {
        let cancelled = || cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed));
        let year = request.year;
        let jobs = &request.jobs;

        let mut guard = ledger.lock();
        let mut staged = guard.clone();

        let rescheduled: BTreeSet<_> = jobs.iter().map(|j| j.project_id).collect();
        let mut superseded = Vec::new();
        for task in &request.prior_tasks {
            if task.holds_reservation() && rescheduled.contains(&task.project_id) {
                staged.release_range(
                    task.reservation,
                    &task.resource_type,
                    task.year,
                    task.weeks(),
                    task.crew_assigned,
                )?;
                superseded.push(task.task_id);
            }
        }
        if cancelled() {
            return Err(PlanningError::Cancelled);
        }

        let priorities = effective_priorities(jobs, self.config.urgency_priority_weight);
        let order = priority_order(jobs, self.config.urgency_priority_weight);
        let choice = select_strategy(jobs, &staged, year, &self.config);
        tracing::info!(
            strategy = %choice.strategy,
            reason = %choice.reason,
            jobs = jobs.len(),
            year,
            "scheduling run started"
        );

        let greedy_with_repair = |base: &ResourceLedger| -> Result<Assignment> {
            let start = greedy(jobs, &order, base, year, self.config.horizon_weeks)?;
            Ok(repair(jobs, &order, start, year, &self.config))
        };

        let (assignment, solver_status, fell_back) = match choice.strategy {
            Strategy::Greedy => (
                greedy(jobs, &order, &staged, year, self.config.horizon_weeks)?,
                None,
                false,
            ),
            Strategy::GreedyWithRepair => (greedy_with_repair(&staged)?, None, false),
            Strategy::Exact => {
                let outcome = solve_exact(jobs, &priorities, &staged, year, &self.config, cancel.clone())?;
                if cancelled() {
                    return Err(PlanningError::Cancelled);
                }
                match outcome.assignment {
                    Some(a) => (a, Some(outcome.status), false),
                    None => {
                        tracing::warn!(
                            status = ?outcome.status,
                            "exact solver gave no plan, falling back to greedy with repair"
                        );
                        (greedy_with_repair(&staged)?, Some(outcome.status), true)
                    }
                }
            }
        };
        if cancelled() {
            return Err(PlanningError::Cancelled);
        }

        assignment.ledger.verify()?;
        let plan = self.build_plan(request, &order, &assignment, choice, solver_status, fell_back, superseded);
        *guard = assignment.ledger;

        tracing::info!(
            scheduled = plan.summary.scheduled,
            unschedulable = plan.summary.unschedulable,
            missed = plan.summary.missed,
            "scheduling run committed"
        );
        Ok(plan)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_plan(
        &self,
        request: &SchedulingRequest,
        order: &[usize],
        assignment: &Assignment,
        choice: StrategyChoice,
        solver_status: Option<SolverStatus>,
        fell_back: bool,
        superseded: Vec<TaskId>,
    ) -> SchedulePlan {
        let year = request.year;
        let mut tasks = Vec::new();
        let mut unschedulable = Vec::new();
        let mut summary = ScheduleSummary::default();
        let mut next_id = request.first_task_id;

        for &i in order {
            let job = &request.jobs[i];
            match assignment.starts[i] {
                Some(start) => {
                    let task = self.task_for(job, year, start, next_id);
                    next_id += 1;
                    match task.deadline_status {
                        DeadlineStatus::OnTrack => summary.on_track += 1,
                        DeadlineStatus::AtRisk => summary.at_risk += 1,
                        DeadlineStatus::Missed => summary.missed += 1,
                    }
                    summary.total_lateness_days += (-task.slack_days).max(0);
                    tasks.push(task);
                }
                None => unschedulable.push(unschedulable_job(job, self.config.horizon_weeks)),
            }
        }
        summary.scheduled = tasks.len();
        summary.unschedulable = unschedulable.len();
        summary.utilization = request
            .jobs
            .iter()
            .map(|j| &j.resource_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|r| (r.clone(), assignment.ledger.utilization(r).ratio()))
            .collect::<BTreeMap<_, _>>();

        SchedulePlan {
            strategy: choice.strategy,
            reason: choice.reason,
            solver_status,
            fell_back,
            tasks,
            unschedulable,
            superseded,
            summary,
        }
    }

    fn task_for(&self, job: &SchedulingJob, year: i32, start: u32, task_id: TaskId) -> ScheduleTask {
        let end = *job.weeks_from(start).end();
        let slack = slack_days(job.deadline_week, end);
        ScheduleTask {
            task_id,
            project_id: job.project_id,
            decision_id: job.decision_id,
            year,
            start_week: start,
            end_week: end,
            deadline_week: job.deadline_week,
            slack_days: slack,
            deadline_status: DeadlineStatus::classify(
                slack,
                self.config.on_track_margin_days,
                self.config.at_risk_tolerance_days,
            ),
            resource_type: job.resource_type.clone(),
            crew_assigned: job.crew_size,
            reservation: job.reservation(),
            status: TaskStatus::Scheduled,
        }
    }
}

fn unschedulable_job(job: &SchedulingJob, horizon: u32) -> UnschedulableJob {
    UnschedulableJob {
        project_id: job.project_id,
        decision_id: job.decision_id,
        resource_type: job.resource_type.clone(),
        reason: format!(
            "no {}-week window with {} free {} units in weeks 1..={horizon}",
            job.duration_weeks, job.crew_size, job.resource_type
        ),
    }
}
