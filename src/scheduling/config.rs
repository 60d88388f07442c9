//! Scheduler configuration.

/// Strategy thresholds, repair budget, exact-solver budget and deadline bands.
///
/// # Examples
///
/// ```
/// use u_capital::scheduling::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .with_horizon_weeks(26)
///     .with_exact_time_limit_ms(500)
///     .with_hard_deadlines(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Planning weeks `1..=horizon_weeks`.
    pub horizon_weeks: u32,

    /// Greedy is used up to this many jobs...
    pub greedy_max_jobs: usize,

    /// ...when they span at most this many resource types.
    pub greedy_max_resource_types: usize,

    /// Greedy-with-repair is used up to this many jobs when deadlines have slack.
    pub repair_max_jobs: usize,

    /// Weight of urgency in `effective = inverted_rank · (1 + w · urgency)`.
    pub urgency_priority_weight: f64,

    /// Repair passes after the greedy pass.
    pub max_repair_iterations: usize,

    /// Wall-clock budget of the exact solver.
    pub exact_time_limit_ms: u64,

    /// Treat `end <= deadline + at-risk tolerance` as a hard constraint in the
    /// exact model instead of minimizing tardiness.
    pub exact_hard_deadlines: bool,

    /// Slack (days) at or above which a task is on track.
    pub on_track_margin_days: i64,

    /// Lateness (days) up to which a task is at risk rather than missed.
    pub at_risk_tolerance_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_weeks: 12,
            greedy_max_jobs: 10,
            greedy_max_resource_types: 2,
            repair_max_jobs: 20,
            urgency_priority_weight: 0.5,
            max_repair_iterations: 3,
            exact_time_limit_ms: 2_000,
            exact_hard_deadlines: false,
            on_track_margin_days: 0,
            at_risk_tolerance_days: 7,
        }
    }
}

impl SchedulerConfig {
    pub fn with_horizon_weeks(mut self, weeks: u32) -> Self {
        self.horizon_weeks = weeks;
        self
    }

    pub fn with_strategy_thresholds(
        mut self,
        greedy_jobs: usize,
        greedy_types: usize,
        repair_jobs: usize,
    ) -> Self {
        self.greedy_max_jobs = greedy_jobs;
        self.greedy_max_resource_types = greedy_types;
        self.repair_max_jobs = repair_jobs;
        self
    }

    pub fn with_urgency_priority_weight(mut self, weight: f64) -> Self {
        self.urgency_priority_weight = weight;
        self
    }

    pub fn with_max_repair_iterations(mut self, n: usize) -> Self {
        self.max_repair_iterations = n;
        self
    }

    pub fn with_exact_time_limit_ms(mut self, ms: u64) -> Self {
        self.exact_time_limit_ms = ms;
        self
    }

    pub fn with_hard_deadlines(mut self, hard: bool) -> Self {
        self.exact_hard_deadlines = hard;
        self
    }

    pub fn with_deadline_bands(mut self, on_track_margin_days: i64, at_risk_tolerance_days: i64) -> Self {
        self.on_track_margin_days = on_track_margin_days;
        self.at_risk_tolerance_days = at_risk_tolerance_days;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.horizon_weeks == 0 || self.horizon_weeks > 53 {
            return Err("horizon_weeks must lie in 1..=53".into());
        }
        if self.greedy_max_jobs > self.repair_max_jobs {
            return Err("greedy_max_jobs must not exceed repair_max_jobs".into());
        }
        if !(self.urgency_priority_weight >= 0.0 && self.urgency_priority_weight.is_finite()) {
            return Err("urgency_priority_weight must be non-negative".into());
        }
        if self.max_repair_iterations == 0 {
            return Err("max_repair_iterations must be at least 1".into());
        }
        if self.exact_time_limit_ms == 0 {
            return Err("exact_time_limit_ms must be positive".into());
        }
        if self.at_risk_tolerance_days < 0 || self.on_track_margin_days < 0 {
            return Err("deadline bands must be non-negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        assert!(SchedulerConfig::default().with_horizon_weeks(0).validate().is_err());
        assert!(SchedulerConfig::default().with_max_repair_iterations(0).validate().is_err());
        assert!(SchedulerConfig::default().with_exact_time_limit_ms(0).validate().is_err());
        assert!(SchedulerConfig::default()
            .with_strategy_thresholds(30, 2, 20)
            .validate()
            .is_err());
        assert!(SchedulerConfig::default()
            .with_deadline_bands(0, -1)
            .validate()
            .is_err());
    }
}
