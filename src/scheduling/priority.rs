//! Effective priority of jobs.

use super::types::SchedulingJob;
use crate::ranking::{PriorityRule, RuleEngine, TieBreaker};

struct PriorityContext {
    max_rank: u32,
    urgency_weight: f64,
}

/// Governance rank inverted so that rank 1 weighs most, scaled by urgency.
fn effective(job: &SchedulingJob, ctx: &PriorityContext) -> f64 {
    let inverted = ctx.max_rank.saturating_add(1).saturating_sub(job.priority_rank);
    f64::from(inverted) * (1.0 + ctx.urgency_weight * job.urgency_score)
}

struct HighestEffectivePriority;

impl PriorityRule<SchedulingJob, PriorityContext> for HighestEffectivePriority {
    fn name(&self) -> &str {
        "HighestEffectivePriority"
    }

    fn score(&self, job: &SchedulingJob, ctx: &PriorityContext) -> f64 {
        -effective(job, ctx)
    }
}

fn context(jobs: &[SchedulingJob], urgency_weight: f64) -> PriorityContext {
    PriorityContext {
        max_rank: jobs.iter().map(|j| j.priority_rank).max().unwrap_or(0),
        urgency_weight,
    }
}

/// `(max_rank + 1 - rank) · (1 + w · urgency)` for every job.
pub fn effective_priorities(jobs: &[SchedulingJob], urgency_weight: f64) -> Vec<f64> {
    let ctx = context(jobs, urgency_weight);
    jobs.iter().map(|j| effective(j, &ctx)).collect()
}

/// Job indices by effective priority descending, ties by lower project id.
pub fn priority_order(jobs: &[SchedulingJob], urgency_weight: f64) -> Vec<usize> {
    RuleEngine::new()
        .with_rule(HighestEffectivePriority)
        .with_tie_breaker(TieBreaker::ByKey(|j: &SchedulingJob| j.project_id))
        .sort_indices(jobs, &context(jobs, urgency_weight))
}
