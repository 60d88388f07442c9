//! Scoring and normalizer configuration.

/// Weights of the five score components.
///
/// They must sum to 1.0; the equity multiplier is applied afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringWeights {
    pub safety: f64,
    pub mandate: f64,
    pub benefit: f64,
    pub urgency: f64,
    pub feasibility: f64,
}

impl ScoringWeights {
    /// Sum of all five weights.
    pub fn sum(&self) -> f64 {
        self.safety + self.mandate + self.benefit + self.urgency + self.feasibility
    }

    fn as_array(&self) -> [(&'static str, f64); 5] {
        [
            ("safety", self.safety),
            ("mandate", self.mandate),
            ("benefit", self.benefit),
            ("urgency", self.urgency),
            ("feasibility", self.feasibility),
        ]
    }
}

impl Default for ScoringWeights {
    /// The municipal 15/15/25/20/15 split, rescaled to sum to exactly 1.0.
    fn default() -> Self {
        Self {
            safety: 1.0 / 6.0,
            mandate: 1.0 / 6.0,
            benefit: 5.0 / 18.0,
            urgency: 2.0 / 9.0,
            feasibility: 1.0 / 6.0,
        }
    }
}

/// Configuration for the composite value score.
///
/// # Examples
///
/// ```
/// use u_capital::scoring::{ScoringConfig, ScoringWeights};
///
/// let config = ScoringConfig::default().with_urgency(0.03, 0.05);
/// assert!(config.validate().is_ok());
///
/// let skewed = ScoringConfig::default().with_weights(ScoringWeights {
///     safety: 0.15,
///     mandate: 0.15,
///     benefit: 0.25,
///     urgency: 0.25,
///     feasibility: 0.15,
/// });
/// assert!(skewed.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringConfig {
    /// Component weights.
    pub weights: ScoringWeights,

    /// Safety tier values for none, moderate, severe and critical.
    pub safety_values: [f64; 4],

    /// Mandate tier values for none, advisory, required and court ordered.
    pub mandate_values: [f64; 4],

    /// Urgency decay rate per day.
    pub urgency_lambda: f64,

    /// Lowest urgency score any candidate can get.
    pub urgency_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            safety_values: [0.0, 0.4, 0.7, 1.0],
            mandate_values: [0.0, 0.3, 0.7, 1.0],
            urgency_lambda: 0.02,
            urgency_floor: 0.10,
        }
    }
}

impl ScoringConfig {
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_safety_values(mut self, values: [f64; 4]) -> Self {
        self.safety_values = values;
        self
    }

    pub fn with_mandate_values(mut self, values: [f64; 4]) -> Self {
        self.mandate_values = values;
        self
    }

    pub fn with_urgency(mut self, lambda: f64, floor: f64) -> Self {
        self.urgency_lambda = lambda;
        self.urgency_floor = floor;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        for (name, w) in self.weights.as_array() {
            if !(0.0..=1.0).contains(&w) {
                return Err(format!("weight `{name}` = {w} outside [0, 1]"));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(format!("weights sum to {sum}, expected 1.0"));
        }
        for (name, table) in [
            ("safety", &self.safety_values),
            ("mandate", &self.mandate_values),
        ] {
            if table.iter().any(|v| !(0.0..=1.0).contains(v)) {
                return Err(format!("{name} tier values must lie in [0, 1]"));
            }
            if table.windows(2).any(|w| w[0] > w[1]) {
                return Err(format!("{name} tier values must be non-decreasing"));
            }
        }
        if !(self.urgency_lambda > 0.0 && self.urgency_lambda.is_finite()) {
            return Err("urgency_lambda must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.urgency_floor) {
            return Err("urgency_floor must lie in [0, 1]".into());
        }
        Ok(())
    }
}

/// Configuration for the benefit-per-dollar normalizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizerConfig {
    /// Pseudo-observations backing the prior median.
    pub prior_strength: f64,

    /// Lower winsorization percentile.
    pub winsorize_low: f64,

    /// Upper winsorization percentile.
    pub winsorize_high: f64,

    /// Typical number of projects per quarter, used to derive the prior.
    pub avg_project_count: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            prior_strength: 20.0,
            winsorize_low: 0.10,
            winsorize_high: 0.90,
            avg_project_count: 50,
        }
    }
}

impl NormalizerConfig {
    pub fn with_prior_strength(mut self, strength: f64) -> Self {
        self.prior_strength = strength;
        self
    }

    pub fn with_winsorize(mut self, low: f64, high: f64) -> Self {
        self.winsorize_low = low;
        self.winsorize_high = high;
        self
    }

    pub fn with_avg_project_count(mut self, count: u32) -> Self {
        self.avg_project_count = count;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.prior_strength >= 0.0 && self.prior_strength.is_finite()) {
            return Err("prior_strength must be non-negative".into());
        }
        if !(0.0 <= self.winsorize_low
            && self.winsorize_low < self.winsorize_high
            && self.winsorize_high <= 1.0)
        {
            return Err("winsorize percentiles must satisfy 0 <= low < high <= 1".into());
        }
        if self.avg_project_count == 0 {
            return Err("avg_project_count must be at least 1".into());
        }
        Ok(())
    }
}
