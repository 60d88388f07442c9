//! Equity records.

use std::collections::BTreeMap;
use std::fmt;

use crate::ids::DistrictId;

/// A city district.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    pub population: u64,
}

impl District {
    pub fn new(id: DistrictId, name: impl Into<String>, population: u64) -> Self {
        Self {
            id,
            name: name.into(),
            population,
        }
    }
}

/// Projects delivered in a district over the previous year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistrictActivity {
    pub district_id: DistrictId,
    pub projects_last_year: u32,
}

/// Advisory service classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EquityTier {
    Underserved,
    Average,
    WellServed,
}

impl fmt::Display for EquityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Underserved => "underserved",
            Self::Average => "average",
            Self::WellServed => "well_served",
        })
    }
}

/// Equity figures for one district.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistrictEquity {
    pub service_ratio: f64,
    pub tier: EquityTier,
    pub multiplier: f64,
}

impl DistrictEquity {
    /// Figures for a district with no data.
    pub fn neutral() -> Self {
        Self {
            service_ratio: 1.0,
            tier: EquityTier::Average,
            multiplier: 1.0,
        }
    }
}

/// Equity figures for every known district.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquityProfile {
    pub districts: BTreeMap<DistrictId, DistrictEquity>,
}

impl EquityProfile {
    pub fn get(&self, district_id: DistrictId) -> Option<&DistrictEquity> {
        self.districts.get(&district_id)
    }

    /// Figures for an optional district; unknown or absent districts are neutral.
    pub fn for_district(&self, district_id: Option<DistrictId>) -> DistrictEquity {
        district_id
            .and_then(|id| self.get(id).copied())
            .unwrap_or_else(DistrictEquity::neutral)
    }
}

/// Per-district, per-quarter budget rollup.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistrictAllocation {
    pub district_id: DistrictId,
    pub quarter: u8,
    pub year: i32,
    pub population: u64,
    pub fair_share_budget: f64,
    pub allocated_budget: f64,
    pub project_count: u32,
    /// `allocated_budget / fair_share_budget`.
    pub equity_ratio: f64,
}

impl DistrictAllocation {
    /// Ratio of allocation to fair share if `extra` were added.
    ///
    /// A district with no fair share reads as infinitely over-allocated once
    /// anything is allocated to it.
    pub fn projected_ratio(&self, extra: f64) -> f64 {
        let total = self.allocated_budget + extra;
        if self.fair_share_budget > 0.0 {
            total / self.fair_share_budget
        } else if total > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(fair: f64, allocated: f64) -> DistrictAllocation {
        DistrictAllocation {
            district_id: 1,
            quarter: 1,
            year: 2025,
            population: 1000,
            fair_share_budget: fair,
            allocated_budget: allocated,
            project_count: 0,
            equity_ratio: 0.0,
        }
    }

    #[test]
    fn test_projected_ratio() {
        let a = allocation(1_000_000.0, 1_500_000.0);
        assert!((a.projected_ratio(0.0) - 1.5).abs() < 1e-12);
        assert!((a.projected_ratio(1_000_000.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_projected_ratio_without_fair_share() {
        let a = allocation(0.0, 0.0);
        assert!(a.projected_ratio(0.0).abs() < 1e-12);
        assert!(a.projected_ratio(1.0).is_infinite());
    }

    #[test]
    fn test_profile_defaults_to_neutral() {
        let mut profile = EquityProfile::default();
        profile.districts.insert(
            2,
            DistrictEquity {
                service_ratio: 0.2,
                tier: EquityTier::Underserved,
                multiplier: 1.125,
            },
        );
        assert_eq!(profile.for_district(None), DistrictEquity::neutral());
        assert_eq!(profile.for_district(Some(9)), DistrictEquity::neutral());
        assert_eq!(profile.for_district(Some(2)).tier, EquityTier::Underserved);
    }
}
