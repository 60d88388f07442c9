//! Local repair of a greedy plan.

use super::config::SchedulerConfig;
use super::greedy::{earliest_window, latest_window_by, place, unplace, Assignment, Quality};
use super::types::{slack_days, DeadlineStatus, SchedulingJob};

fn needs_repair(job: &SchedulingJob, start: Option<u32>, config: &SchedulerConfig) -> bool {
    match start {
        None => true,
        Some(s) => {
            let slack = slack_days(job.deadline_week, *job.weeks_from(s).end());
            DeadlineStatus::classify(slack, config.on_track_margin_days, config.at_risk_tolerance_days)
                == DeadlineStatus::Missed
        }
    }
}

/// Frees `other`, puts `target` first, then re-places `other` wherever it
/// still fits. `other` may end up unplaced.
fn swap(
    current: &Assignment,
    jobs: &[SchedulingJob],
    target: usize,
    other: usize,
    year: i32,
    horizon: u32,
) -> Option<Assignment> {
    let mut next = current.clone();
    unplace(&mut next.ledger, &jobs[other], year, next.starts[other]?).ok()?;
    next.starts[other] = None;
    if let Some(s) = next.starts[target].take() {
        unplace(&mut next.ledger, &jobs[target], year, s).ok()?;
    }

    let start = earliest_window(&next.ledger, &jobs[target], year, horizon)?;
    place(&mut next.ledger, &jobs[target], year, start).ok()?;
    next.starts[target] = Some(start);

    if let Some(s) = earliest_window(&next.ledger, &jobs[other], year, horizon) {
        place(&mut next.ledger, &jobs[other], year, s).ok()?;
        next.starts[other] = Some(s);
    }
    Some(next)
}

/// Moves `other` to its latest window that keeps its deadline, then
/// re-places `target` at its earliest window.
fn shift(
    current: &Assignment,
    jobs: &[SchedulingJob],
    target: usize,
    other: usize,
    year: i32,
    horizon: u32,
) -> Option<Assignment> {
    let mut next = current.clone();
    let was = next.starts[other]?;
    unplace(&mut next.ledger, &jobs[other], year, was).ok()?;
    let moved = latest_window_by(&next.ledger, &jobs[other], year, horizon, jobs[other].deadline_week)?;
    if moved <= was {
        return None;
    }
    place(&mut next.ledger, &jobs[other], year, moved).ok()?;
    next.starts[other] = Some(moved);

    if let Some(s) = next.starts[target].take() {
        unplace(&mut next.ledger, &jobs[target], year, s).ok()?;
    }
    let start = earliest_window(&next.ledger, &jobs[target], year, horizon)?;
    place(&mut next.ledger, &jobs[target], year, start).ok()?;
    next.starts[target] = Some(start);
    Some(next)
}

/// Improves `assignment` with swap and shift moves for jobs that are
/// unplaced or past their at-risk tolerance.
///
/// Swaps only displace lower-priority jobs on the same resource. Shifts may
/// move any same-resource job, since they never push it past its own
/// deadline. A move is kept only if it strictly improves [`Quality`].
pub(crate) fn repair(
    jobs: &[SchedulingJob],
    order: &[usize],
    mut assignment: Assignment,
    year: i32,
    config: &SchedulerConfig,
) -> Assignment {
    let horizon = config.horizon_weeks;
    let mut quality = Quality::of(jobs, &assignment.starts, config);

    for pass in 0..config.max_repair_iterations {
        let mut improved = false;

        for (pos, &target) in order.iter().enumerate() {
            if !needs_repair(&jobs[target], assignment.starts[target], config) {
                continue;
            }
            for (other_pos, &other) in order.iter().enumerate() {
                if other == target
                    || jobs[other].resource_type != jobs[target].resource_type
                    || assignment.starts[other].is_none()
                {
                    continue;
                }

                let mut moves = Vec::with_capacity(2);
                if other_pos > pos {
                    moves.extend(swap(&assignment, jobs, target, other, year, horizon));
                }
                moves.extend(shift(&assignment, jobs, target, other, year, horizon));

                let best = moves
                    .into_iter()
                    .map(|a| (Quality::of(jobs, &a.starts, config), a))
                    .min_by_key(|(q, _)| *q);
                if let Some((q, next)) = best {
                    if q < quality {
                        tracing::debug!(
                            pass,
                            project_id = jobs[target].project_id,
                            displaced = jobs[other].project_id,
                            ?q,
                            "repair move accepted"
                        );
                        quality = q;
                        assignment = next;
                        improved = true;
                    }
                }
                if !needs_repair(&jobs[target], assignment.starts[target], config) {
                    break;
                }
            }
        }

        if !improved {
            break;
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ResourceLedger, ResourceType};
    use crate::scheduling::greedy::greedy;

    fn job(project_id: u64, rank: u32, weeks: u32, deadline: u32) -> SchedulingJob {
        SchedulingJob {
            project_id,
            decision_id: project_id,
            resource_type: ResourceType::new("water_crew"),
            crew_size: 1,
            duration_weeks: weeks,
            deadline_week: deadline,
            priority_rank: rank,
            urgency_score: 0.5,
            requires_confirmation: false,
        }
    }

    fn ledger() -> ResourceLedger {
        ResourceLedger::new().with_weekly_capacity("water_crew", 2025, 1..=12, 1)
    }

    #[test]
    fn test_shift_rescues_tight_job() {
        let jobs = vec![job(1, 1, 4, 12), job(2, 2, 4, 4)];
        let order = [0, 1];
        let cfg = SchedulerConfig::default();

        let start = greedy(&jobs, &order, &ledger(), 2025, 12).unwrap();
        assert_eq!(start.starts, vec![Some(1), Some(5)]);
        assert_eq!(Quality::of(&jobs, &start.starts, &cfg).missed, 1);

        let fixed = repair(&jobs, &order, start, 2025, &cfg);
        assert_eq!(fixed.starts, vec![Some(9), Some(1)]);
        assert_eq!(Quality::of(&jobs, &fixed.starts, &cfg).missed, 0);
        assert!(fixed.ledger.verify().is_ok());
    }

    #[test]
    fn test_swap_displaces_lower_priority_job() {
        let jobs = vec![job(1, 1, 4, 4), job(2, 2, 4, 12)];
        let order = [0, 1];
        let cfg = SchedulerConfig::default();

        // lower-priority job sits on the early weeks
        let mut l = ledger();
        place(&mut l, &jobs[1], 2025, 1).unwrap();
        place(&mut l, &jobs[0], 2025, 5).unwrap();
        let start = Assignment {
            starts: vec![Some(5), Some(1)],
            ledger: l,
        };

        let swapped = swap(&start, &jobs, 0, 1, 2025, 12).unwrap();
        assert_eq!(swapped.starts, vec![Some(1), Some(5)]);

        let fixed = repair(&jobs, &order, start, 2025, &cfg);
        assert_eq!(fixed.starts[0], Some(1));
        assert_eq!(Quality::of(&jobs, &fixed.starts, &cfg).missed, 0);
        assert!(fixed.ledger.verify().is_ok());
    }

    #[test]
    fn test_blocked_job_stays_unplaced() {
        let jobs = vec![job(1, 1, 10, 12), job(2, 2, 2, 12), job(3, 3, 2, 12)];
        let order = [0, 1, 2];
        let cfg = SchedulerConfig::default();
        let start = greedy(&jobs, &order, &ledger(), 2025, 12).unwrap();
        assert_eq!(start.starts, vec![Some(1), Some(11), None]);

        let fixed = repair(&jobs, &order, start.clone(), 2025, &cfg);
        assert_eq!(fixed, start);
    }

    #[test]
    fn test_no_move_without_improvement() {
        let jobs = vec![job(1, 1, 2, 12), job(2, 2, 2, 12)];
        let order = [0, 1];
        let cfg = SchedulerConfig::default();
        let start = greedy(&jobs, &order, &ledger(), 2025, 12).unwrap();
        let fixed = repair(&jobs, &order, start.clone(), 2025, &cfg);
        assert_eq!(fixed, start);
    }
}
