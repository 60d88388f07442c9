//! Equity configuration.

/// Thresholds and strength of the equity adjustment.
///
/// # Examples
///
/// ```
/// use u_capital::equity::EquityConfig;
///
/// let config = EquityConfig::default().with_multiplier_strength(0.2);
/// assert!(config.validate().is_ok());
/// assert!(EquityConfig::default().with_thresholds(1.4, 0.6).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquityConfig {
    /// Ratios below this are underserved.
    pub underserved_threshold: f64,

    /// Ratios above this are well served.
    pub well_served_threshold: f64,

    /// Scale applied to the clamped equity score.
    pub multiplier_strength: f64,

    /// Clamp applied to `1 - ratio`, as `(low, high)`.
    pub clamp_bounds: (f64, f64),

    /// Projected allocation over fair share above which candidates are deferred.
    pub defer_threshold: f64,
}

impl Default for EquityConfig {
    fn default() -> Self {
        Self {
            underserved_threshold: 0.6,
            well_served_threshold: 1.4,
            multiplier_strength: 0.25,
            clamp_bounds: (-0.5, 0.5),
            defer_threshold: 2.0,
        }
    }
}

impl EquityConfig {
    pub fn with_thresholds(mut self, underserved: f64, well_served: f64) -> Self {
        self.underserved_threshold = underserved;
        self.well_served_threshold = well_served;
        self
    }

    pub fn with_multiplier_strength(mut self, strength: f64) -> Self {
        self.multiplier_strength = strength;
        self
    }

    pub fn with_clamp_bounds(mut self, low: f64, high: f64) -> Self {
        self.clamp_bounds = (low, high);
        self
    }

    pub fn with_defer_threshold(mut self, threshold: f64) -> Self {
        self.defer_threshold = threshold;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0 <= self.underserved_threshold
            && self.underserved_threshold < self.well_served_threshold)
        {
            return Err("equity thresholds must satisfy 0 <= underserved < well_served".into());
        }
        let (low, high) = self.clamp_bounds;
        if !(low <= 0.0 && 0.0 <= high && low.is_finite() && high.is_finite()) {
            return Err("clamp bounds must bracket zero".into());
        }
        if !(0.0..=1.0).contains(&self.multiplier_strength) {
            return Err("multiplier_strength must lie in [0, 1]".into());
        }
        // Keeps the multiplier positive for every ratio.
        if self.multiplier_strength * low <= -1.0 {
            return Err("multiplier_strength and clamp bounds allow a non-positive multiplier".into());
        }
        if !(self.defer_threshold > 0.0) {
            return Err("defer_threshold must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EquityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        assert!(EquityConfig::default()
            .with_clamp_bounds(0.1, 0.5)
            .validate()
            .is_err());
        assert!(EquityConfig::default()
            .with_multiplier_strength(1.5)
            .validate()
            .is_err());
        assert!(EquityConfig::default()
            .with_defer_threshold(0.0)
            .validate()
            .is_err());
        assert!(EquityConfig::default()
            .with_multiplier_strength(1.0)
            .with_clamp_bounds(-1.0, 0.5)
            .validate()
            .is_err());
    }
}
