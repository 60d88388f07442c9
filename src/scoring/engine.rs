//! The scorer.

use chrono::{DateTime, Utc};

use super::config::ScoringConfig;
use super::normalizer::BenefitNormalizer;
use super::types::{
    BatchScoring, CandidateRequest, Feasibility, IssueSignal, MandateTier, ProjectCandidate,
    RejectedRequest, SafetyTier, ScoreComponents,
};
use crate::audit::ProvenanceRecord;
use crate::equity::EquityProfile;
use crate::error::{PlanningError, Result};

/// Pure composite scorer.
///
/// Holds an immutable configuration, a normalizer snapshot and the equity
/// profile of the current cycle; scoring never mutates any of them.
///
/// # Examples
///
/// ```
/// use u_capital::scoring::{
///     BenefitNormalizer, IssueSignal, MandateTier, NormalizerConfig, SafetyTier, Scorer,
///     ScoringConfig,
/// };
///
/// let normalizer = BenefitNormalizer::new(0.01, &NormalizerConfig::default());
/// let scorer = Scorer::new(ScoringConfig::default(), normalizer);
///
/// let signal = IssueSignal {
///     issue_id: 1,
///     district_id: None,
///     population_affected: 10_000,
///     complaint_count: 12,
///     safety_tier: SafetyTier::Critical,
///     mandate_tier: MandateTier::None,
///     estimated_cost: 1_000_000.0,
///     urgency_days: 0,
/// };
/// let c = scorer.compute_composite(&signal, 0.8, 1.0);
/// assert!((c.benefit - 1.0).abs() < 1e-12);
/// assert!((c.urgency - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    normalizer: BenefitNormalizer,
    equity: EquityProfile,
}

impl Scorer {
    /// Scorer with a neutral equity profile.
    pub fn new(config: ScoringConfig, normalizer: BenefitNormalizer) -> Self {
        Self {
            config,
            normalizer,
            equity: EquityProfile::default(),
        }
    }

    /// Sets the district equity profile used by [`score`](Self::score).
    pub fn with_equity(mut self, equity: EquityProfile) -> Self {
        self.equity = equity;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &BenefitNormalizer {
        &self.normalizer
    }

    pub fn safety_score(&self, tier: SafetyTier) -> f64 {
        self.config.safety_values[tier.index()]
    }

    pub fn mandate_score(&self, tier: MandateTier) -> f64 {
        self.config.mandate_values[tier.index()]
    }

    /// Benefit per dollar relative to the blended median, clamped to [0, 1].
    pub fn benefit_score(&self, population_affected: i64, estimated_cost: f64) -> f64 {
        if estimated_cost <= 0.0 {
            return 0.0;
        }
        let median = self.normalizer.blended_median();
        if median <= 0.0 {
            return 0.0;
        }
        let ratio = population_affected as f64 / estimated_cost;
        (ratio / median).clamp(0.0, 1.0)
    }

    /// Exponential urgency decay with a floor.
    pub fn urgency_score(&self, days_remaining: i64) -> f64 {
        let days = days_remaining.max(0) as f64;
        (-self.config.urgency_lambda * days)
            .exp()
            .max(self.config.urgency_floor)
    }

    /// Scores a signal.
    pub fn compute_composite(
        &self,
        signal: &IssueSignal,
        feasibility: f64,
        equity_multiplier: f64,
    ) -> ScoreComponents {
        self.combine(
            self.safety_score(signal.safety_tier),
            self.mandate_score(signal.mandate_tier),
            self.benefit_score(signal.population_affected, signal.estimated_cost),
            self.urgency_score(signal.urgency_days),
            feasibility,
            equity_multiplier,
        )
    }

    fn combine(
        &self,
        safety: f64,
        mandate: f64,
        benefit: f64,
        urgency: f64,
        feasibility: f64,
        equity_multiplier: f64,
    ) -> ScoreComponents {
        let w = &self.config.weights;
        let base_score = w.safety * safety
            + w.mandate * mandate
            + w.benefit * benefit
            + w.urgency * urgency
            + w.feasibility * feasibility;
        ScoreComponents {
            safety,
            mandate,
            benefit,
            urgency,
            feasibility,
            base_score,
            equity_multiplier,
            composite: base_score * equity_multiplier,
        }
    }

    /// Validates a request and scores it into a candidate.
    pub fn score(&self, request: &CandidateRequest, now: DateTime<Utc>) -> Result<ProjectCandidate> {
        let mut signal = request.signal.clone();
        if let Some(cost) = request.cost_override {
            signal.estimated_cost = cost;
        }
        signal.validate()?;
        check_feasibility(request.feasibility)?;

        let duration_weeks = request
            .duration_override
            .unwrap_or(request.crew.duration_weeks);
        if duration_weeks == 0 {
            return Err(PlanningError::InvalidSignal {
                issue_id: signal.issue_id,
                reason: "duration must be at least one week".into(),
            });
        }
        if request.crew.crew_size == 0 {
            return Err(PlanningError::InvalidSignal {
                issue_id: signal.issue_id,
                reason: "crew size must be at least one".into(),
            });
        }

        let equity = self.equity.for_district(signal.district_id);
        let scores = self.compute_composite(&signal, request.feasibility, equity.multiplier);

        Ok(ProjectCandidate {
            project_id: request.project_id,
            issue_id: signal.issue_id,
            district_id: signal.district_id,
            title: request.title.clone(),
            estimated_cost: signal.estimated_cost,
            duration_weeks,
            resource_type: request.crew.resource_type.clone(),
            crew_size: request.crew.crew_size,
            safety_tier: signal.safety_tier,
            mandate_tier: signal.mandate_tier,
            urgency_days: u32::try_from(signal.urgency_days).unwrap_or(u32::MAX),
            scores,
            equity_tier: equity.tier,
            feasibility: Feasibility::estimated(request.feasibility),
            created_at: now,
        })
    }

    /// Scores every request, keeping input order. Invalid requests are
    /// logged and reported in `rejected`.
    pub fn score_batch(&self, requests: &[CandidateRequest], now: DateTime<Utc>) -> BatchScoring {
        #[cfg(feature = "parallel")]
        let results: Vec<Result<ProjectCandidate>> = {
            use rayon::prelude::*;
            requests.par_iter().map(|r| self.score(r, now)).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<ProjectCandidate>> =
            requests.iter().map(|r| self.score(r, now)).collect();

        let mut batch = BatchScoring::default();
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(candidate) => batch.candidates.push(candidate),
                Err(error) => {
                    tracing::warn!(
                        project_id = request.project_id,
                        issue_id = request.signal.issue_id,
                        %error,
                        "candidate rejected at scoring"
                    );
                    batch.rejected.push(RejectedRequest {
                        project_id: request.project_id,
                        issue_id: request.signal.issue_id,
                        error,
                    });
                }
            }
        }
        tracing::info!(
            scored = batch.candidates.len(),
            rejected = batch.rejected.len(),
            "scoring batch complete"
        );
        batch
    }

    /// Records a human-confirmed feasibility value.
    ///
    /// Returns a new candidate version with the composite recomputed, plus
    /// the provenance of the change. The input candidate is not modified.
    pub fn apply_feasibility_override(
        &self,
        candidate: &ProjectCandidate,
        value: f64,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(ProjectCandidate, ProvenanceRecord)> {
        check_feasibility(value)?;

        let s = &candidate.scores;
        let mut next = candidate.clone();
        next.feasibility.confirmed = Some(value);
        next.scores = self.combine(
            s.safety,
            s.mandate,
            s.benefit,
            s.urgency,
            value,
            s.equity_multiplier,
        );

        let provenance = ProvenanceRecord {
            project_id: candidate.project_id,
            field: "feasibility".into(),
            original_value: candidate.feasibility.value(),
            final_value: value,
            actor: actor.to_string(),
            reason: reason.to_string(),
            at: now,
        };
        tracing::info!(
            project_id = candidate.project_id,
            from = provenance.original_value,
            to = value,
            actor,
            "feasibility overridden"
        );
        Ok((next, provenance))
    }

    /// Human-readable score breakdown.
    pub fn explain(&self, c: &ScoreComponents) -> String {
        let w = &self.config.weights;
        let line = |name: &str, score: f64, weight: f64| {
            format!(
                "  {name:<12} {score:.2} x {:>4.1}% = {:.3}",
                weight * 100.0,
                score * weight
            )
        };
        [
            "Composite score breakdown:".to_string(),
            line("Safety:", c.safety, w.safety),
            line("Mandate:", c.mandate, w.mandate),
            line("Benefit:", c.benefit, w.benefit),
            line("Urgency:", c.urgency, w.urgency),
            line("Feasibility:", c.feasibility, w.feasibility),
            format!("  Base score:  {:.3}", c.base_score),
            format!("  Equity x:    {:.3}", c.equity_multiplier),
            format!("  COMPOSITE:   {:.3}", c.composite),
        ]
        .join("\n")
    }
}

fn check_feasibility(value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PlanningError::InvalidFeasibility(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equity::{DistrictEquity, EquityTier};
    use crate::ledger::ResourceType;
    use crate::scoring::{CrewRequirement, NormalizerConfig};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    fn scorer() -> Scorer {
        Scorer::new(
            ScoringConfig::default(),
            BenefitNormalizer::new(0.01, &NormalizerConfig::default()),
        )
    }

    fn signal() -> IssueSignal {
        IssueSignal {
            issue_id: 11,
            district_id: Some(4),
            population_affected: 5_000,
            complaint_count: 3,
            safety_tier: SafetyTier::Moderate,
            mandate_tier: MandateTier::Advisory,
            estimated_cost: 1_000_000.0,
            urgency_days: 35,
        }
    }

    fn request() -> CandidateRequest {
        CandidateRequest::new(
            101,
            "Replace water main",
            signal(),
            0.8,
            CrewRequirement {
                resource_type: ResourceType::new("water_crew"),
                crew_size: 2,
                duration_weeks: 3,
            },
        )
    }

    #[test]
    fn test_tier_tables() {
        let s = scorer();
        let safety: Vec<f64> = [
            SafetyTier::None,
            SafetyTier::Moderate,
            SafetyTier::Severe,
            SafetyTier::Critical,
        ]
        .iter()
        .map(|t| s.safety_score(*t))
        .collect();
        assert_eq!(safety, vec![0.0, 0.4, 0.7, 1.0]);
        assert!((s.mandate_score(MandateTier::Advisory) - 0.3).abs() < 1e-12);
        assert!((s.mandate_score(MandateTier::CourtOrdered) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_urgency_reference_points() {
        let s = scorer();
        assert!((s.urgency_score(0) - 1.0).abs() < 1e-12);
        assert!((s.urgency_score(35) - 0.5).abs() < 0.01);
        assert!((s.urgency_score(7) - 0.87).abs() < 0.005);
        assert!((s.urgency_score(10_000) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_benefit_clamps_to_one() {
        // 10,000 people / $1M = 0.01 per dollar, median 0.01
        let s = scorer();
        assert!((s.benefit_score(10_000, 1_000_000.0) - 1.0).abs() < 1e-12);
        assert!((s.benefit_score(50_000, 1_000_000.0) - 1.0).abs() < 1e-12);
        assert!((s.benefit_score(5_000, 1_000_000.0) - 0.5).abs() < 1e-12);
        assert!(s.benefit_score(5_000, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_composite_is_weighted_sum_times_multiplier() {
        let s = scorer();
        let c = s.compute_composite(&signal(), 0.8, 1.1);
        let w = ScoringConfig::default().weights;
        let base = w.safety * 0.4
            + w.mandate * 0.3
            + w.benefit * 0.5
            + w.urgency * c.urgency
            + w.feasibility * 0.8;
        assert!((c.base_score - base).abs() < 1e-12);
        assert!((c.composite - base * 1.1).abs() < 1e-12);
        assert!((c.equity_multiplier - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_score_uses_equity_profile() {
        let mut profile = EquityProfile::default();
        profile.districts.insert(
            4,
            DistrictEquity {
                service_ratio: 0.4,
                tier: EquityTier::Underserved,
                multiplier: 1.125,
            },
        );
        let candidate = scorer().with_equity(profile).score(&request(), now()).unwrap();
        assert_eq!(candidate.equity_tier, EquityTier::Underserved);
        assert!((candidate.scores.equity_multiplier - 1.125).abs() < 1e-12);
        assert_eq!(candidate.duration_weeks, 3);
        assert_eq!(candidate.urgency_days, 35);
        assert!(!candidate.feasibility.is_confirmed());
    }

    #[test]
    fn test_overrides_applied() {
        let r = request()
            .with_cost_override(2_000_000.0)
            .with_duration_override(5);
        let candidate = scorer().score(&r, now()).unwrap();
        assert!((candidate.estimated_cost - 2_000_000.0).abs() < 1e-6);
        assert_eq!(candidate.duration_weeks, 5);
        assert!((candidate.scores.benefit - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_score_rejects_invalid_requests() {
        let s = scorer();
        let mut r = request();
        r.feasibility = 1.2;
        assert!(matches!(
            s.score(&r, now()),
            Err(PlanningError::InvalidFeasibility(_))
        ));

        let mut r = request();
        r.crew.crew_size = 0;
        assert!(s.score(&r, now()).is_err());

        let r = request().with_duration_override(0);
        assert!(s.score(&r, now()).is_err());
    }

    #[test]
    fn test_batch_continues_past_invalid() {
        let mut bad = request();
        bad.project_id = 102;
        bad.signal.estimated_cost = 0.0;
        let mut good = request();
        good.project_id = 103;

        let batch = scorer().score_batch(&[request(), bad, good], now());
        let ids: Vec<u64> = batch.candidates.iter().map(|c| c.project_id).collect();
        assert_eq!(ids, vec![101, 103]);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].project_id, 102);
    }

    #[test]
    fn test_feasibility_override_recomputes() {
        let s = scorer();
        let original = s.score(&request(), now()).unwrap();
        let (next, provenance) = s
            .apply_feasibility_override(&original, 0.4, "engineer-7", "site survey", now())
            .unwrap();

        assert!(next.feasibility.is_confirmed());
        assert!((next.feasibility.value() - 0.4).abs() < 1e-12);
        let delta = ScoringConfig::default().weights.feasibility * 0.4;
        assert!((next.scores.base_score - (original.scores.base_score - delta)).abs() < 1e-12);
        assert!((provenance.original_value - 0.8).abs() < 1e-12);
        assert!((provenance.final_value - 0.4).abs() < 1e-12);
        assert_eq!(provenance.actor, "engineer-7");
        // original untouched
        assert!(!original.feasibility.is_confirmed());

        assert!(s
            .apply_feasibility_override(&original, -0.1, "x", "y", now())
            .is_err());
    }

    #[test]
    fn test_explain_lists_components() {
        let s = scorer();
        let text = s.explain(&s.compute_composite(&signal(), 0.8, 1.0));
        assert!(text.contains("Safety:"));
        assert!(text.contains("Feasibility:"));
        assert!(text.contains("COMPOSITE:"));
    }

    proptest! {
        #[test]
        fn prop_urgency_monotone(a in 0i64..2000, b in 0i64..2000) {
            let s = scorer();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(s.urgency_score(lo) >= s.urgency_score(hi));
            prop_assert!(s.urgency_score(hi) >= 0.1);
        }

        #[test]
        fn prop_components_bounded(pop in 0i64..10_000_000, cost in 1.0f64..1e9, days in 0i64..1000, f in 0.0f64..=1.0) {
            let s = scorer();
            let mut sig = signal();
            sig.population_affected = pop;
            sig.estimated_cost = cost;
            sig.urgency_days = days;
            let c = s.compute_composite(&sig, f, 1.0);
            prop_assert!((0.0..=1.0).contains(&c.benefit));
            prop_assert!((0.0..=1.0 + 1e-12).contains(&c.base_score));
        }
    }
}
