//! Planning configuration.
//!
//! Every component takes an immutable config at construction. The aggregate
//! [`PlanningConfig`] is validated once, up front; a bad value fails there
//! and never on a later call.

use crate::equity::EquityConfig;
use crate::error::{PlanningError, Result};
use crate::governance::GovernanceConfig;
use crate::ledger::{ResourceLedger, ResourceType};
use crate::scheduling::SchedulerConfig;
use crate::scoring::{NormalizerConfig, ScoringConfig};

/// Weekly crew capacity of one resource class.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrewCapacity {
    pub resource_type: ResourceType,
    pub weekly_capacity: u32,
}

impl CrewCapacity {
    pub fn new(resource_type: impl Into<ResourceType>, weekly_capacity: u32) -> Self {
        Self {
            resource_type: resource_type.into(),
            weekly_capacity,
        }
    }
}

/// City-wide facts the planner works against.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CityProfile {
    pub name: String,
    pub population: u64,
    /// Capital budget of one planning quarter.
    pub quarterly_budget: f64,
    pub crew_capacities: Vec<CrewCapacity>,
}

impl Default for CityProfile {
    fn default() -> Self {
        Self {
            name: "Metroville".into(),
            population: 2_500_000,
            quarterly_budget: 75_000_000.0,
            crew_capacities: vec![
                CrewCapacity::new("water_crew", 3),
                CrewCapacity::new("electrical_crew", 2),
                CrewCapacity::new("construction_crew", 5),
                CrewCapacity::new("general_crew", 4),
            ],
        }
    }
}

impl CityProfile {
    pub fn with_budget(mut self, quarterly_budget: f64) -> Self {
        self.quarterly_budget = quarterly_budget;
        self
    }

    pub fn with_crew(mut self, resource_type: impl Into<ResourceType>, weekly_capacity: u32) -> Self {
        let resource_type = resource_type.into();
        match self
            .crew_capacities
            .iter_mut()
            .find(|c| c.resource_type == resource_type)
        {
            Some(c) => c.weekly_capacity = weekly_capacity,
            None => self
                .crew_capacities
                .push(CrewCapacity::new(resource_type, weekly_capacity)),
        }
        self
    }

    /// Seeds weekly capacity for every crew over `1..=weeks` of `year`.
    /// Existing slots keep their counters.
    pub fn seed_ledger(&self, ledger: ResourceLedger, year: i32, weeks: u32) -> ResourceLedger {
        self.crew_capacities.iter().fold(ledger, |l, c| {
            l.with_weekly_capacity(c.resource_type.clone(), year, 1..=weeks, c.weekly_capacity)
        })
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.population == 0 {
            return Err("population must be positive".into());
        }
        if !(self.quarterly_budget > 0.0 && self.quarterly_budget.is_finite()) {
            return Err("quarterly_budget must be positive".into());
        }
        for (i, c) in self.crew_capacities.iter().enumerate() {
            if self.crew_capacities[..i]
                .iter()
                .any(|o| o.resource_type == c.resource_type)
            {
                return Err(format!("crew {} listed twice", c.resource_type));
            }
        }
        Ok(())
    }
}

/// All planning parameters.
///
/// # Examples
///
/// ```
/// use u_capital::config::PlanningConfig;
/// use u_capital::scoring::{ScoringConfig, ScoringWeights};
///
/// let config = PlanningConfig::default();
/// assert!(config.validate().is_ok());
///
/// let mut bad = PlanningConfig::default();
/// bad.scoring = ScoringConfig::default().with_weights(ScoringWeights {
///     safety: 0.15,
///     mandate: 0.15,
///     benefit: 0.25,
///     urgency: 0.20,
///     feasibility: 0.15,
/// });
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlanningConfig {
    pub city: CityProfile,
    pub scoring: ScoringConfig,
    pub normalizer: NormalizerConfig,
    pub equity: EquityConfig,
    pub governance: GovernanceConfig,
    pub scheduler: SchedulerConfig,
}

impl PlanningConfig {
    pub fn with_city(mut self, city: CityProfile) -> Self {
        self.city = city;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_equity(mut self, equity: EquityConfig) -> Self {
        self.equity = equity;
        self
    }

    pub fn with_governance(mut self, governance: GovernanceConfig) -> Self {
        self.governance = governance;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Validates every section, naming the first one that fails.
    pub fn validate(&self) -> Result<()> {
        let sections: [(&str, std::result::Result<(), String>); 6] = [
            ("city", self.city.validate()),
            ("scoring", self.scoring.validate()),
            ("normalizer", self.normalizer.validate()),
            ("equity", self.equity.validate()),
            ("governance", self.governance.validate()),
            ("scheduler", self.scheduler.validate()),
        ];
        for (name, result) in sections {
            if let Err(reason) = result {
                return Err(PlanningError::Config(format!("{name}: {reason}")));
            }
        }
        Ok(())
    }

    /// Returns the config if it validates.
    pub fn load_validated(self) -> Result<Self> {
        self.validate()?;
        tracing::debug!(city = %self.city.name, "planning configuration accepted");
        Ok(self)
    }

    /// Parses and validates JSON. Missing sections take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PlanningError::Config(format!("json: {e}")))?;
        config.load_validated()
    }
}
