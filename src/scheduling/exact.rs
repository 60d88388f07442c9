//! Exact scheduling through the CP layer.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::config::SchedulerConfig;
use super::greedy::{earliest_window, place, Assignment};
use super::types::SchedulingJob;
use crate::cp::{
    BranchAndBoundSolver, CapacityProfile, CpModel, CpSolver, IntervalVar, Objective,
    SolverConfig, SolverStatus,
};
use crate::error::Result;
use crate::ledger::{ResourceLedger, ResourceType};

pub(crate) struct ExactOutcome {
    pub status: SolverStatus,
    /// Present when the solver returned a plan.
    pub assignment: Option<Assignment>,
}

fn interval_name(index: usize) -> String {
    format!("job-{index:04}")
}

/// Builds the week-indexed model: interval `[start, start + duration)`,
/// start in `1..=horizon - duration + 1`, due one week after the deadline
/// week so that tardiness counts late weeks.
///
/// Jobs without any window against `base` are left out.
pub(crate) fn build_model(
    jobs: &[SchedulingJob],
    priorities: &[f64],
    base: &ResourceLedger,
    year: i32,
    config: &SchedulerConfig,
) -> (CpModel, Vec<usize>) {
    let horizon = i64::from(config.horizon_weeks);
    let mut model = CpModel::new(format!("schedule-{year}"), horizon);
    let mut included = Vec::new();
    let mut by_resource: BTreeMap<&ResourceType, (Vec<String>, Vec<i64>)> = BTreeMap::new();

    for (i, job) in jobs.iter().enumerate() {
        if earliest_window(base, job, year, config.horizon_weeks).is_none() {
            continue;
        }
        let duration = i64::from(job.duration_weeks);
        let deadline = i64::from(job.deadline_week);
        let end_max = if config.exact_hard_deadlines {
            (horizon + 1).min(deadline + config.at_risk_tolerance_days / 7 + 1)
        } else {
            horizon + 1
        };

        let name = interval_name(i);
        model.add_interval(
            IntervalVar::new(name.clone(), 1, horizon - duration + 1, duration, end_max)
                .with_weight(priorities[i])
                .with_due(deadline + 1),
        );
        let entry = by_resource.entry(&job.resource_type).or_default();
        entry.0.push(name);
        entry.1.push(i64::from(job.crew_size));
        included.push(i);
    }

    for (resource, (names, demands)) in by_resource {
        let levels = base
            .free_profile(resource, year, 1..=config.horizon_weeks)
            .into_iter()
            .map(i64::from)
            .collect();
        model.add_cumulative(names, demands, CapacityProfile::new(1, levels));
    }
    model.set_objective(Objective::Hierarchical {
        objectives: vec![Objective::WeightedTardiness, Objective::WeightedCompletion],
    });
    (model, included)
}

/// Solves the batch exactly and applies the solution to a copy of `base`.
pub(crate) fn solve_exact(
    jobs: &[SchedulingJob],
    priorities: &[f64],
    base: &ResourceLedger,
    year: i32,
    config: &SchedulerConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ExactOutcome> {
    let (model, included) = build_model(jobs, priorities, base, year, config);
    let solver_config = SolverConfig {
        time_limit_ms: config.exact_time_limit_ms,
        cancel,
    };
    let solution = BranchAndBoundSolver::new().solve(&model, &solver_config);
    tracing::info!(
        status = ?solution.status,
        jobs = included.len(),
        nodes = solution.nodes,
        ms = solution.solve_time_ms,
        "exact scheduling finished"
    );

    if !solution.is_solution_found() {
        return Ok(ExactOutcome {
            status: solution.status,
            assignment: None,
        });
    }

    let mut assignment = Assignment {
        starts: vec![None; jobs.len()],
        ledger: base.clone(),
    };
    for i in included {
        if let Some(iv) = solution.intervals.get(&interval_name(i)) {
            let start = u32::try_from(iv.start).unwrap_or(1);
            place(&mut assignment.ledger, &jobs[i], year, start)?;
            assignment.starts[i] = Some(start);
        }
    }
    Ok(ExactOutcome {
        status: solution.status,
        assignment: Some(assignment),
    })
}
