//! Crew scheduling.
//!
//! Approved projects become [`SchedulingJob`]s ordered by effective priority:
//!
//! ```text
//! effective = (max_rank + 1 - rank) · (1 + 0.5 · urgency)
//! ```
//!
//! [`select_strategy`] picks one of three strategies per batch:
//!
//! - **Greedy**: each job at its earliest window with enough free crew.
//! - **Greedy with repair**: greedy, then swap/shift moves that strictly
//!   reduce unschedulable jobs, missed deadlines and lateness, in that order.
//! - **Exact**: a cumulative CP model per resource type solved by
//!   [`BranchAndBoundSolver`](crate::cp::BranchAndBoundSolver), with a
//!   greedy-with-repair fallback when it returns no plan.
//!
//! Weeks are 1-based and a task occupies `start_week..=end_week`.

mod config;
mod engine;
mod exact;
mod greedy;
mod priority;
mod repair;
mod selector;
mod types;

pub use config::SchedulerConfig;
pub use engine::SchedulingEngine;
pub use priority::{effective_priorities, priority_order};
pub use selector::select_strategy;
pub use types::{
    slack_days, DeadlineStatus, SchedulePlan, ScheduleSummary, ScheduleTask, SchedulingJob,
    SchedulingRequest, Strategy, StrategyChoice, TaskStatus, UnschedulableJob,
};
