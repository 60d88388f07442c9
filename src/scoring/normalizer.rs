//! Benefit-per-dollar normalization with Bayesian shrinkage.
//!
//! A cold-start prior derived from the city profile is blended with the
//! winsorized empirical median of observed benefit ratios. With little data
//! the prior dominates; as observations accumulate the blend converges to
//! the empirical median.
//!
//! ```text
//! w       = n / (n + prior_strength)
//! blended = w · empirical_median + (1 - w) · prior_median
//! ```

use super::config::NormalizerConfig;
use crate::config::CityProfile;

/// Running benefit-ratio median used to scale the benefit score.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BenefitNormalizer {
    prior_median: f64,
    prior_strength: f64,
    winsorize_low: f64,
    winsorize_high: f64,
    /// Every finite ratio seen so far, sorted ascending.
    observations: Vec<f64>,
    empirical_median: Option<f64>,
    n: usize,
}

impl BenefitNormalizer {
    /// Normalizer with an explicit prior and no observations.
    pub fn new(prior_median: f64, config: &NormalizerConfig) -> Self {
        Self {
            prior_median,
            prior_strength: config.prior_strength,
            winsorize_low: config.winsorize_low,
            winsorize_high: config.winsorize_high,
            observations: Vec::new(),
            empirical_median: None,
            n: 0,
        }
    }

    /// Prior from the city: population per dollar of a typical project.
    pub fn from_city(city: &CityProfile, config: &NormalizerConfig) -> Self {
        let avg_project_cost = city.quarterly_budget / f64::from(config.avg_project_count.max(1));
        let prior_median = if avg_project_cost > 0.0 {
            city.population as f64 / avg_project_cost
        } else {
            0.0
        };
        Self::new(prior_median, config)
    }

    /// Adds `ratios` to the observed pool and recomputes the running median.
    ///
    /// The sorted pool is trimmed to the configured percentile band before
    /// taking the median; `n` counts the whole pool. Non-finite ratios are
    /// dropped. While the band keeps nothing the new ratios are stored but
    /// the median and `n` stay as they were.
    pub fn recalibrate(&mut self, ratios: &[f64]) {
        let before = self.observations.len();
        self.observations
            .extend(ratios.iter().copied().filter(|r| r.is_finite()));
        if self.observations.len() == before {
            return;
        }
        self.observations.sort_by(f64::total_cmp);

        let n = self.observations.len();
        let low = (n as f64 * self.winsorize_low) as usize;
        let high = ((n as f64 * self.winsorize_high) as usize).min(n);
        if high <= low {
            return;
        }
        let kept = &self.observations[low..high];
        let median = kept[kept.len() / 2];
        self.empirical_median = Some(median);
        self.n = n;
        tracing::debug!(
            n,
            added = n - before,
            kept = kept.len(),
            median,
            "benefit normalizer recalibrated"
        );
    }

    /// Weight given to the empirical median.
    pub fn shrinkage_weight(&self) -> f64 {
        let n = self.n as f64;
        if n + self.prior_strength <= 0.0 {
            return 0.0;
        }
        n / (n + self.prior_strength)
    }

    /// Median used to scale benefit ratios.
    pub fn blended_median(&self) -> f64 {
        match self.empirical_median {
            Some(empirical) if self.n > 0 => {
                let w = self.shrinkage_weight();
                w * empirical + (1.0 - w) * self.prior_median
            }
            _ => self.prior_median,
        }
    }

    pub fn prior_median(&self) -> f64 {
        self.prior_median
    }

    pub fn empirical_median(&self) -> Option<f64> {
        self.empirical_median
    }

    /// Observations behind the empirical median.
    pub fn sample_size(&self) -> usize {
        self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> BenefitNormalizer {
        BenefitNormalizer::from_city(&CityProfile::default(), &NormalizerConfig::default())
    }

    #[test]
    fn test_prior_from_city() {
        // 2.5M people / (75M / 50)
        let n = normalizer();
        assert!((n.prior_median() - 2_500_000.0 / 1_500_000.0).abs() < 1e-12);
        assert!((n.blended_median() - n.prior_median()).abs() < 1e-12);
        assert!(n.shrinkage_weight().abs() < 1e-12);
    }

    #[test]
    fn test_empty_recalibration_is_noop() {
        let mut n = normalizer();
        let before = n.clone();
        n.recalibrate(&[]);
        assert_eq!(n, before);
    }

    #[test]
    fn test_winsorized_median() {
        let mut n = normalizer();
        // 10 values: sorted indices 1..=8 kept, median = kept[4]
        let ratios = [100.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 0.0];
        n.recalibrate(&ratios);
        assert_eq!(n.sample_size(), 10);
        assert!((n.empirical_median().unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_does_not_move_median() {
        let mut a = normalizer();
        let mut b = normalizer();
        let base: Vec<f64> = (1..=20).map(f64::from).collect();
        let mut spiked = base.clone();
        spiked[19] = 1e9;
        a.recalibrate(&base);
        b.recalibrate(&spiked);
        assert!((a.blended_median() - b.blended_median()).abs() < 1e-12);
    }

    #[test]
    fn test_shrinkage_blend() {
        let mut n = BenefitNormalizer::new(1.0, &NormalizerConfig::default());
        n.recalibrate(&vec![3.0; 20]);
        // w = 20 / 40
        assert!((n.shrinkage_weight() - 0.5).abs() < 1e-12);
        assert!((n.blended_median() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_batches_do_not_reset_the_pool() {
        let mut n = BenefitNormalizer::new(1.0, &NormalizerConfig::default());
        n.recalibrate(&vec![5.0; 200]);
        let w = n.shrinkage_weight();
        for _ in 0..5 {
            n.recalibrate(&[50.0]);
            assert!(n.shrinkage_weight() >= w);
            assert!((n.empirical_median().unwrap() - 5.0).abs() < 1e-12);
        }
        assert_eq!(n.sample_size(), 205);
        assert!((n.blended_median() - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_band_fills_across_calls() {
        let mut n = normalizer();
        // one ratio alone is trimmed away
        n.recalibrate(&[2.0]);
        assert!(n.empirical_median().is_none());
        assert_eq!(n.sample_size(), 0);
        n.recalibrate(&[3.0, 4.0, 5.0, f64::NAN]);
        // pool [2, 3, 4, 5]: band keeps indices 0..3
        assert_eq!(n.sample_size(), 4);
        assert!((n.empirical_median().unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_converges_to_empirical() {
        let mut n = BenefitNormalizer::new(1.0, &NormalizerConfig::default());
        let mut last_gap = f64::INFINITY;
        for size in [10usize, 100, 1_000, 10_000] {
            n.recalibrate(&vec![5.0; size]);
            let gap = (n.blended_median() - 5.0).abs();
            assert!(gap < last_gap);
            last_gap = gap;
        }
        assert!(last_gap < 0.01);
    }
}
