//! Scoring inputs and outputs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::equity::EquityTier;
use crate::error::{PlanningError, Result};
use crate::ids::{DistrictId, IssueId, ProjectId};
use crate::ledger::ResourceType;

/// Life-safety severity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SafetyTier {
    None,
    Moderate,
    Severe,
    Critical,
}

impl SafetyTier {
    /// Position in the tier value table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Severe or critical.
    pub fn is_serious(self) -> bool {
        matches!(self, Self::Severe | Self::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for SafetyTier {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            "critical" => Ok(Self::Critical),
            other => Err(PlanningError::UnknownTier {
                kind: "safety",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal or regulatory obligation behind an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MandateTier {
    None,
    Advisory,
    Required,
    CourtOrdered,
}

impl MandateTier {
    /// Position in the tier value table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Required or court ordered; these enter the mandate phase.
    pub fn is_binding(self) -> bool {
        matches!(self, Self::Required | Self::CourtOrdered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Advisory => "advisory",
            Self::Required => "required",
            Self::CourtOrdered => "court_ordered",
        }
    }
}

impl FromStr for MandateTier {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "advisory" => Ok(Self::Advisory),
            "required" => Ok(Self::Required),
            "court_ordered" => Ok(Self::CourtOrdered),
            other => Err(PlanningError::UnknownTier {
                kind: "mandate",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MandateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measured signals for one issue, as delivered by intake.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IssueSignal {
    pub issue_id: IssueId,
    pub district_id: Option<DistrictId>,
    pub population_affected: i64,
    pub complaint_count: i64,
    pub safety_tier: SafetyTier,
    pub mandate_tier: MandateTier,
    /// Currency amount; must be positive.
    pub estimated_cost: f64,
    /// Days remaining before harm or a legal deadline.
    pub urgency_days: i64,
}

impl IssueSignal {
    /// Rejects negative counts, non-positive cost and negative urgency.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| PlanningError::InvalidSignal {
            issue_id: self.issue_id,
            reason: reason.to_string(),
        };
        if self.population_affected < 0 {
            return Err(invalid("negative population affected"));
        }
        if self.complaint_count < 0 {
            return Err(invalid("negative complaint count"));
        }
        if !(self.estimated_cost.is_finite() && self.estimated_cost > 0.0) {
            return Err(invalid("estimated cost must be positive"));
        }
        if self.urgency_days < 0 {
            return Err(invalid("negative urgency days"));
        }
        Ok(())
    }

    /// People served per currency unit; `None` for non-positive cost.
    pub fn benefit_ratio(&self) -> Option<f64> {
        (self.estimated_cost > 0.0).then(|| self.population_affected as f64 / self.estimated_cost)
    }
}

/// Feasibility estimate with an optional human-confirmed value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feasibility {
    pub estimate: f64,
    pub confirmed: Option<f64>,
}

impl Feasibility {
    pub fn estimated(estimate: f64) -> Self {
        Self {
            estimate,
            confirmed: None,
        }
    }

    /// Confirmed value if present, else the estimate.
    pub fn value(&self) -> f64 {
        self.confirmed.unwrap_or(self.estimate)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.is_some()
    }
}

/// Full breakdown of a composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreComponents {
    pub safety: f64,
    pub mandate: f64,
    pub benefit: f64,
    pub urgency: f64,
    pub feasibility: f64,
    /// Weighted sum before the equity multiplier.
    pub base_score: f64,
    pub equity_multiplier: f64,
    pub composite: f64,
}

/// Crew needed to deliver a project.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrewRequirement {
    pub resource_type: ResourceType,
    pub crew_size: u32,
    pub duration_weeks: u32,
}

/// Intake output handed to the scorer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateRequest {
    pub project_id: ProjectId,
    pub title: String,
    pub signal: IssueSignal,
    /// Feasibility estimate in [0, 1].
    pub feasibility: f64,
    pub crew: CrewRequirement,
    pub cost_override: Option<f64>,
    pub duration_override: Option<u32>,
}

impl CandidateRequest {
    pub fn new(
        project_id: ProjectId,
        title: impl Into<String>,
        signal: IssueSignal,
        feasibility: f64,
        crew: CrewRequirement,
    ) -> Self {
        Self {
            project_id,
            title: title.into(),
            signal,
            feasibility,
            crew,
            cost_override: None,
            duration_override: None,
        }
    }

    pub fn with_cost_override(mut self, cost: f64) -> Self {
        self.cost_override = Some(cost);
        self
    }

    pub fn with_duration_override(mut self, weeks: u32) -> Self {
        self.duration_override = Some(weeks);
        self
    }
}

/// A scored project proposal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectCandidate {
    pub project_id: ProjectId,
    pub issue_id: IssueId,
    pub district_id: Option<DistrictId>,
    pub title: String,
    pub estimated_cost: f64,
    pub duration_weeks: u32,
    pub resource_type: ResourceType,
    pub crew_size: u32,
    pub safety_tier: SafetyTier,
    pub mandate_tier: MandateTier,
    pub urgency_days: u32,
    pub scores: ScoreComponents,
    pub equity_tier: EquityTier,
    pub feasibility: Feasibility,
    pub created_at: DateTime<Utc>,
}

/// A request the scorer refused.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRequest {
    pub project_id: ProjectId,
    pub issue_id: IssueId,
    pub error: PlanningError,
}

/// Result of scoring a batch; invalid requests do not abort the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchScoring {
    /// Scored candidates, in input order.
    pub candidates: Vec<ProjectCandidate>,
    pub rejected: Vec<RejectedRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> IssueSignal {
        IssueSignal {
            issue_id: 1,
            district_id: Some(3),
            population_affected: 10_000,
            complaint_count: 4,
            safety_tier: SafetyTier::None,
            mandate_tier: MandateTier::None,
            estimated_cost: 1_000_000.0,
            urgency_days: 30,
        }
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("critical".parse::<SafetyTier>().unwrap(), SafetyTier::Critical);
        assert_eq!(
            "court_ordered".parse::<MandateTier>().unwrap(),
            MandateTier::CourtOrdered
        );
        let err = "urgent".parse::<SafetyTier>().unwrap_err();
        assert!(matches!(err, PlanningError::UnknownTier { kind: "safety", .. }));
        assert!("Required".parse::<MandateTier>().is_err());
    }

    #[test]
    fn test_tier_round_trip_labels() {
        for tier in [
            MandateTier::None,
            MandateTier::Advisory,
            MandateTier::Required,
            MandateTier::CourtOrdered,
        ] {
            assert_eq!(tier.as_str().parse::<MandateTier>().unwrap(), tier);
        }
        assert!(SafetyTier::Severe.is_serious());
        assert!(!SafetyTier::Moderate.is_serious());
        assert!(MandateTier::Required.is_binding());
        assert!(!MandateTier::Advisory.is_binding());
    }

    #[test]
    fn test_signal_validation() {
        assert!(signal().validate().is_ok());

        let mut s = signal();
        s.population_affected = -1;
        assert!(s.validate().is_err());

        let mut s = signal();
        s.estimated_cost = 0.0;
        assert!(matches!(
            s.validate(),
            Err(PlanningError::InvalidSignal { issue_id: 1, .. })
        ));

        let mut s = signal();
        s.estimated_cost = f64::NAN;
        assert!(s.validate().is_err());

        let mut s = signal();
        s.urgency_days = -3;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_benefit_ratio() {
        assert!((signal().benefit_ratio().unwrap() - 0.01).abs() < 1e-12);
        let mut s = signal();
        s.estimated_cost = 0.0;
        assert!(s.benefit_ratio().is_none());
    }

    #[test]
    fn test_feasibility_prefers_confirmed() {
        let mut f = Feasibility::estimated(0.6);
        assert!((f.value() - 0.6).abs() < 1e-12);
        assert!(!f.is_confirmed());
        f.confirmed = Some(0.9);
        assert!((f.value() - 0.9).abs() < 1e-12);
        assert!(f.is_confirmed());
    }
}
