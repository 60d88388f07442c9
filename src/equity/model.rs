//! Service ratios, multipliers and fair-share rollups.

use std::collections::BTreeMap;

use super::config::EquityConfig;
use super::types::{
    District, DistrictActivity, DistrictAllocation, DistrictEquity, EquityProfile, EquityTier,
};
use crate::ids::DistrictId;

/// Computes district equity figures from an immutable configuration.
///
/// # Examples
///
/// ```
/// use u_capital::equity::{EquityConfig, EquityModel, EquityTier};
///
/// let model = EquityModel::new(EquityConfig::default());
/// let ratio = EquityModel::service_ratio(2, 100_000, 100, 2_500_000);
/// assert!((ratio - 0.5).abs() < 1e-12);
/// assert_eq!(model.tier(ratio), EquityTier::Underserved);
/// assert!((model.multiplier(ratio) - 1.125).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EquityModel {
    config: EquityConfig,
}

impl EquityModel {
    pub fn new(config: EquityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EquityConfig {
        &self.config
    }

    /// District per-capita project rate relative to the city rate.
    ///
    /// Degenerate inputs (no city projects, no city population, or a district
    /// without population) yield the neutral ratio 1.0.
    pub fn service_ratio(
        district_projects: u32,
        district_population: u64,
        city_projects: u32,
        city_population: u64,
    ) -> f64 {
        if city_projects == 0 || city_population == 0 || district_population == 0 {
            return 1.0;
        }
        let city_rate = f64::from(city_projects) / city_population as f64;
        let district_rate = f64::from(district_projects) / district_population as f64;
        district_rate / city_rate
    }

    /// Advisory tier for a ratio.
    pub fn tier(&self, ratio: f64) -> EquityTier {
        if ratio < self.config.underserved_threshold {
            EquityTier::Underserved
        } else if ratio > self.config.well_served_threshold {
            EquityTier::WellServed
        } else {
            EquityTier::Average
        }
    }

    /// Continuous score multiplier for a ratio.
    pub fn multiplier(&self, ratio: f64) -> f64 {
        let (low, high) = self.config.clamp_bounds;
        let score = if ratio.is_nan() {
            0.0
        } else {
            (1.0 - ratio).clamp(low, high)
        };
        1.0 + self.config.multiplier_strength * score
    }

    /// Equity figures for every district.
    ///
    /// City totals are the sums over `districts` and `activity`; districts
    /// without an activity record count as zero projects.
    pub fn profile(&self, districts: &[District], activity: &[DistrictActivity]) -> EquityProfile {
        let projects: BTreeMap<DistrictId, u32> = activity
            .iter()
            .map(|a| (a.district_id, a.projects_last_year))
            .collect();
        let city_population: u64 = districts.iter().map(|d| d.population).sum();
        let city_projects: u32 = districts
            .iter()
            .map(|d| projects.get(&d.id).copied().unwrap_or(0))
            .sum();

        let districts = districts
            .iter()
            .map(|d| {
                let ratio = Self::service_ratio(
                    projects.get(&d.id).copied().unwrap_or(0),
                    d.population,
                    city_projects,
                    city_population,
                );
                let equity = DistrictEquity {
                    service_ratio: ratio,
                    tier: self.tier(ratio),
                    multiplier: self.multiplier(ratio),
                };
                (d.id, equity)
            })
            .collect();

        EquityProfile { districts }
    }

    /// Fresh allocations for a quarter: each district's fair share is its
    /// population share of `quarterly_budget`.
    pub fn fair_shares(
        &self,
        districts: &[District],
        quarterly_budget: f64,
        quarter: u8,
        year: i32,
    ) -> Vec<DistrictAllocation> {
        let total: u64 = districts.iter().map(|d| d.population).sum();
        districts
            .iter()
            .map(|d| DistrictAllocation {
                district_id: d.id,
                quarter,
                year,
                population: d.population,
                fair_share_budget: if total > 0 {
                    quarterly_budget * d.population as f64 / total as f64
                } else {
                    0.0
                },
                allocated_budget: 0.0,
                project_count: 0,
                equity_ratio: 0.0,
            })
            .collect()
    }

    /// Next-cycle allocations with `approvals` (district, amount) added.
    ///
    /// `previous` is not modified. Approvals for districts not in `previous`
    /// are ignored.
    pub fn rollup<I>(&self, previous: &[DistrictAllocation], approvals: I) -> Vec<DistrictAllocation>
    where
        I: IntoIterator<Item = (DistrictId, f64)>,
    {
        let mut next = previous.to_vec();
        for (district_id, amount) in approvals {
            if let Some(a) = next.iter_mut().find(|a| a.district_id == district_id) {
                a.allocated_budget += amount;
                a.project_count += 1;
            }
        }
        for a in &mut next {
            a.equity_ratio = a.projected_ratio(0.0);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn model() -> EquityModel {
        EquityModel::new(EquityConfig::default())
    }

    fn districts() -> Vec<District> {
        vec![
            District::new(1, "North", 500_000),
            District::new(2, "South", 1_500_000),
            District::new(3, "Harbor", 0),
        ]
    }

    #[test]
    fn test_service_ratio_degenerate_inputs() {
        assert!((EquityModel::service_ratio(5, 1000, 0, 10_000) - 1.0).abs() < 1e-12);
        assert!((EquityModel::service_ratio(5, 1000, 10, 0) - 1.0).abs() < 1e-12);
        assert!((EquityModel::service_ratio(5, 0, 10, 10_000) - 1.0).abs() < 1e-12);
        assert!(EquityModel::service_ratio(0, 1000, 10, 10_000).abs() < 1e-12);
    }

    #[test]
    fn test_tier_boundaries() {
        let m = model();
        assert_eq!(m.tier(0.59), EquityTier::Underserved);
        assert_eq!(m.tier(0.6), EquityTier::Average);
        assert_eq!(m.tier(1.4), EquityTier::Average);
        assert_eq!(m.tier(1.41), EquityTier::WellServed);
    }

    #[test]
    fn test_multiplier_is_continuous() {
        let m = model();
        assert!((m.multiplier(1.0) - 1.0).abs() < 1e-12);
        assert!((m.multiplier(0.8) - 1.05).abs() < 1e-12);
        assert!((m.multiplier(1.2) - 0.95).abs() < 1e-12);
        assert!((m.multiplier(0.0) - 1.125).abs() < 1e-12);
        assert!((m.multiplier(f64::INFINITY) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_profile() {
        let activity = vec![
            DistrictActivity {
                district_id: 1,
                projects_last_year: 30,
            },
            DistrictActivity {
                district_id: 2,
                projects_last_year: 10,
            },
        ];
        let profile = model().profile(&districts(), &activity);
        // city rate = 40 / 2M; North = 30 / 0.5M -> 3.0, South = 10 / 1.5M -> 1/3
        let north = profile.get(1).unwrap();
        assert!((north.service_ratio - 3.0).abs() < 1e-9);
        assert_eq!(north.tier, EquityTier::WellServed);
        assert!((north.multiplier - 0.875).abs() < 1e-12);

        let south = profile.get(2).unwrap();
        assert!((south.service_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(south.tier, EquityTier::Underserved);

        let harbor = profile.get(3).unwrap();
        assert!((harbor.service_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fair_shares_and_rollup() {
        let m = model();
        let shares = m.fair_shares(&districts(), 75_000_000.0, 2, 2025);
        assert!((shares[0].fair_share_budget - 18_750_000.0).abs() < 1e-6);
        assert!((shares[1].fair_share_budget - 56_250_000.0).abs() < 1e-6);
        assert!(shares[2].fair_share_budget.abs() < 1e-12);

        let next = m.rollup(&shares, vec![(1, 10_000_000.0), (1, 5_000_000.0), (9, 1.0)]);
        assert!((next[0].allocated_budget - 15_000_000.0).abs() < 1e-6);
        assert_eq!(next[0].project_count, 2);
        assert!((next[0].equity_ratio - 0.8).abs() < 1e-12);
        // input snapshot untouched
        assert!(shares[0].allocated_budget.abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_multiplier_bounded(ratio in 0.0f64..1e6) {
            let m = model().multiplier(ratio);
            prop_assert!((0.875 - 1e-12..=1.125 + 1e-12).contains(&m));
        }

        #[test]
        fn prop_multiplier_non_increasing(a in 0.0f64..10.0, b in 0.0f64..10.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(model().multiplier(lo) >= model().multiplier(hi) - 1e-12);
        }
    }
}
