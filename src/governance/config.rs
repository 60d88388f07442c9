//! Governance configuration.

/// Phase caps, confirmation triggers and the equity escalation threshold.
///
/// # Examples
///
/// ```
/// use u_capital::governance::GovernanceConfig;
///
/// let config = GovernanceConfig::default()
///     .with_phase_caps(0.25, 0.25)
///     .with_confirmation_timeout_days(7);
/// assert!(config.validate().is_ok());
/// assert!(GovernanceConfig::default().with_phase_caps(0.8, 0.3).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GovernanceConfig {
    /// Share of the quarterly budget available to mandates.
    pub mandate_cap: f64,

    /// Share available to urgent-critical candidates.
    pub urgent_critical_cap: f64,

    /// Whether unused phase 1-2 budget rolls into the value-ranked phase.
    pub rollover: bool,

    /// Urgency score above which a serious-safety candidate is urgent-critical.
    pub urgent_threshold: f64,

    /// Urgency score below which an over-allocated district's candidate is rejected.
    pub low_urgency_threshold: f64,

    /// Costs strictly above this require human confirmation.
    pub confirmation_cost_threshold: f64,

    /// Whether severe or critical safety tiers require human confirmation.
    pub confirm_serious_safety: bool,

    /// Days a conditional approval stays open.
    pub confirmation_timeout_days: u32,

    /// Planning week in which decisions are proposed.
    pub proposal_week: u32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            mandate_cap: 0.30,
            urgent_critical_cap: 0.20,
            rollover: true,
            urgent_threshold: 0.7,
            low_urgency_threshold: 0.3,
            confirmation_cost_threshold: 10_000_000.0,
            confirm_serious_safety: true,
            confirmation_timeout_days: 14,
            proposal_week: 0,
        }
    }
}

impl GovernanceConfig {
    pub fn with_phase_caps(mut self, mandate: f64, urgent_critical: f64) -> Self {
        self.mandate_cap = mandate;
        self.urgent_critical_cap = urgent_critical;
        self
    }

    pub fn with_rollover(mut self, rollover: bool) -> Self {
        self.rollover = rollover;
        self
    }

    pub fn with_urgency_thresholds(mut self, urgent: f64, low: f64) -> Self {
        self.urgent_threshold = urgent;
        self.low_urgency_threshold = low;
        self
    }

    pub fn with_confirmation_cost_threshold(mut self, cost: f64) -> Self {
        self.confirmation_cost_threshold = cost;
        self
    }

    pub fn with_confirmation_timeout_days(mut self, days: u32) -> Self {
        self.confirmation_timeout_days = days;
        self
    }

    pub fn with_proposal_week(mut self, week: u32) -> Self {
        self.proposal_week = week;
        self
    }

    /// Share of the budget reserved for the value-ranked phase before rollover.
    pub fn value_ranked_cap(&self) -> f64 {
        1.0 - self.mandate_cap - self.urgent_critical_cap
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        for (name, cap) in [
            ("mandate_cap", self.mandate_cap),
            ("urgent_critical_cap", self.urgent_critical_cap),
        ] {
            if !(0.0..=1.0).contains(&cap) {
                return Err(format!("{name} = {cap} outside [0, 1]"));
            }
        }
        if self.mandate_cap + self.urgent_critical_cap > 1.0 + 1e-9 {
            return Err("phase caps exceed the quarterly budget".into());
        }
        for (name, t) in [
            ("urgent_threshold", self.urgent_threshold),
            ("low_urgency_threshold", self.low_urgency_threshold),
        ] {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("{name} = {t} outside [0, 1]"));
            }
        }
        if !(self.confirmation_cost_threshold >= 0.0) {
            return Err("confirmation_cost_threshold must be non-negative".into());
        }
        if self.confirmation_timeout_days == 0 {
            return Err("confirmation_timeout_days must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GovernanceConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.value_ranked_cap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(GovernanceConfig::default()
            .with_phase_caps(-0.1, 0.2)
            .validate()
            .is_err());
        assert!(GovernanceConfig::default()
            .with_confirmation_timeout_days(0)
            .validate()
            .is_err());
        assert!(GovernanceConfig::default()
            .with_urgency_thresholds(1.2, 0.3)
            .validate()
            .is_err());
        assert!(GovernanceConfig::default()
            .with_confirmation_cost_threshold(-1.0)
            .validate()
            .is_err());
    }
}
