//! Window search and priority-ordered greedy placement.

use super::config::SchedulerConfig;
use super::types::{slack_days, DeadlineStatus, SchedulingJob};
use crate::error::Result;
use crate::ledger::ResourceLedger;

/// Start week per job (aligned with the job slice) and the ledger holding
/// their reservations.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assignment {
    pub starts: Vec<Option<u32>>,
    pub ledger: ResourceLedger,
}

/// Plan quality, compared lexicographically: fewer unschedulable jobs, then
/// fewer missed deadlines, then less total lateness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Quality {
    pub unschedulable: usize,
    pub missed: usize,
    pub lateness_days: i64,
}

impl Quality {
    pub fn of(jobs: &[SchedulingJob], starts: &[Option<u32>], config: &SchedulerConfig) -> Self {
        let mut q = Quality {
            unschedulable: 0,
            missed: 0,
            lateness_days: 0,
        };
        for (job, start) in jobs.iter().zip(starts) {
            let Some(start) = start else {
                q.unschedulable += 1;
                continue;
            };
            let slack = slack_days(job.deadline_week, *job.weeks_from(*start).end());
            let status = DeadlineStatus::classify(
                slack,
                config.on_track_margin_days,
                config.at_risk_tolerance_days,
            );
            if status == DeadlineStatus::Missed {
                q.missed += 1;
            }
            q.lateness_days += (-slack).max(0);
        }
        q
    }
}

fn fits(ledger: &ResourceLedger, job: &SchedulingJob, year: i32, start: u32) -> bool {
    job.weeks_from(start).all(|week| {
        ledger
            .check_availability(&job.resource_type, week, year)
            .is_ok_and(|slot| slot.available() >= job.crew_size)
    })
}

fn last_start(job: &SchedulingJob, last_week: u32) -> Option<u32> {
    (last_week + 1).checked_sub(job.duration_weeks).filter(|s| *s >= 1)
}

/// Earliest start whose whole window lies in `1..=horizon` with enough free crew.
pub(crate) fn earliest_window(
    ledger: &ResourceLedger,
    job: &SchedulingJob,
    year: i32,
    horizon: u32,
) -> Option<u32> {
    let last = last_start(job, horizon)?;
    (1..=last).find(|s| fits(ledger, job, year, *s))
}

/// Latest start whose window ends by `last_week` (capped at the horizon).
pub(crate) fn latest_window_by(
    ledger: &ResourceLedger,
    job: &SchedulingJob,
    year: i32,
    horizon: u32,
    last_week: u32,
) -> Option<u32> {
    let last = last_start(job, last_week.min(horizon))?;
    (1..=last).rev().find(|s| fits(ledger, job, year, *s))
}

pub(crate) fn place(ledger: &mut ResourceLedger, job: &SchedulingJob, year: i32, start: u32) -> Result<()> {
    ledger.reserve_range(
        job.reservation(),
        &job.resource_type,
        year,
        job.weeks_from(start),
        job.crew_size,
    )
}

pub(crate) fn unplace(ledger: &mut ResourceLedger, job: &SchedulingJob, year: i32, start: u32) -> Result<()> {
    ledger.release_range(
        job.reservation(),
        &job.resource_type,
        year,
        job.weeks_from(start),
        job.crew_size,
    )
}

/// Places jobs in `order`, each at its earliest window in what is left.
pub(crate) fn greedy(
    jobs: &[SchedulingJob],
    order: &[usize],
    base: &ResourceLedger,
    year: i32,
    horizon: u32,
) -> Result<Assignment> {
    let mut assignment = Assignment {
        starts: vec![None; jobs.len()],
        ledger: base.clone(),
    };
    for &i in order {
        let job = &jobs[i];
        match earliest_window(&assignment.ledger, job, year, horizon) {
            Some(start) => {
                place(&mut assignment.ledger, job, year, start)?;
                assignment.starts[i] = Some(start);
            }
            None => {
                tracing::debug!(project_id = job.project_id, "no window for job");
            }
        }
    }
    Ok(assignment)
}
