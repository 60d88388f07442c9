//! Strategy selection.

use std::collections::BTreeSet;

use super::config::SchedulerConfig;
use super::greedy::earliest_window;
use super::types::{SchedulingJob, Strategy, StrategyChoice};
use crate::ledger::ResourceLedger;

/// Picks the cheapest strategy the batch allows.
///
/// - Greedy for small batches over few resource types.
/// - Greedy-with-repair for mid-size batches where every job, placed alone
///   against the current ledger, would finish by its deadline.
/// - Exact otherwise.
///
/// # Examples
///
/// ```
/// use u_capital::ledger::ResourceLedger;
/// use u_capital::scheduling::{select_strategy, SchedulerConfig, Strategy};
///
/// let ledger = ResourceLedger::new();
/// let choice = select_strategy(&[], &ledger, 2025, &SchedulerConfig::default());
/// assert_eq!(choice.strategy, Strategy::Greedy);
/// ```
pub fn select_strategy(
    jobs: &[SchedulingJob],
    ledger: &ResourceLedger,
    year: i32,
    config: &SchedulerConfig,
) -> StrategyChoice {
    let n = jobs.len();
    let types = jobs
        .iter()
        .map(|j| &j.resource_type)
        .collect::<BTreeSet<_>>()
        .len();

    if n <= config.greedy_max_jobs && types <= config.greedy_max_resource_types {
        return StrategyChoice {
            strategy: Strategy::Greedy,
            reason: format!("{n} jobs across {types} resource types"),
        };
    }

    if n > config.repair_max_jobs {
        return StrategyChoice {
            strategy: Strategy::Exact,
            reason: format!("{n} jobs exceed the repair limit of {}", config.repair_max_jobs),
        };
    }

    let tight = jobs.iter().find(|job| {
        !earliest_window(ledger, job, year, config.horizon_weeks)
            .is_some_and(|start| *job.weeks_from(start).end() <= job.deadline_week)
    });
    match tight {
        None => StrategyChoice {
            strategy: Strategy::GreedyWithRepair,
            reason: format!("{n} jobs across {types} resource types, all deadlines have slack"),
        },
        Some(job) => StrategyChoice {
            strategy: Strategy::Exact,
            reason: format!(
                "{n} jobs across {types} resource types, project {} cannot meet week {} alone",
                job.project_id, job.deadline_week
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ResourceType;

    fn job(project_id: u64, resource: &str, deadline: u32) -> SchedulingJob {
        SchedulingJob {
            project_id,
            decision_id: project_id,
            resource_type: ResourceType::new(resource),
            crew_size: 1,
            duration_weeks: 2,
            deadline_week: deadline,
            priority_rank: project_id as u32,
            urgency_score: 0.5,
            requires_confirmation: false,
        }
    }

    fn ledger() -> ResourceLedger {
        ["water_crew", "electrical_crew", "construction_crew"]
            .into_iter()
            .fold(ResourceLedger::new(), |l, r| {
                l.with_weekly_capacity(r, 2025, 1..=12, 5)
            })
    }

    #[test]
    fn test_small_batch_is_greedy() {
        let jobs: Vec<_> = (1..=8)
            .map(|i| job(i, if i % 2 == 0 { "water_crew" } else { "electrical_crew" }, 12))
            .collect();
        let choice = select_strategy(&jobs, &ledger(), 2025, &SchedulerConfig::default());
        assert_eq!(choice.strategy, Strategy::Greedy);
        assert_eq!(choice.reason, "8 jobs across 2 resource types");
    }

    #[test]
    fn test_large_batch_is_exact() {
        let jobs: Vec<_> = (1..=25).map(|i| job(i, "water_crew", 12)).collect();
        let choice = select_strategy(&jobs, &ledger(), 2025, &SchedulerConfig::default());
        assert_eq!(choice.strategy, Strategy::Exact);
    }

    #[test]
    fn test_mid_batch_with_slack_is_repair() {
        let types = ["water_crew", "electrical_crew", "construction_crew"];
        let jobs: Vec<_> = (1..=15).map(|i| job(i, types[i as usize % 3], 12)).collect();
        let choice = select_strategy(&jobs, &ledger(), 2025, &SchedulerConfig::default());
        assert_eq!(choice.strategy, Strategy::GreedyWithRepair);
    }

    #[test]
    fn test_mid_batch_with_tight_deadline_is_exact() {
        let types = ["water_crew", "electrical_crew", "construction_crew"];
        let mut jobs: Vec<_> = (1..=15).map(|i| job(i, types[i as usize % 3], 12)).collect();
        jobs[4].deadline_week = 1;
        let choice = select_strategy(&jobs, &ledger(), 2025, &SchedulerConfig::default());
        assert_eq!(choice.strategy, Strategy::Exact);
        assert!(choice.reason.contains("project 5"));
    }
}
