//! Identifier aliases shared across the planning stages.

/// Identifier of a raw issue reported to intake.
pub type IssueId = u64;

/// Identifier of a project candidate. Lower ids win ranking ties.
pub type ProjectId = u64;

/// Identifier of a portfolio decision.
pub type DecisionId = u64;

/// Identifier of a schedule task record.
pub type TaskId = u64;

/// Identifier of a geographic district.
pub type DistrictId = u32;
