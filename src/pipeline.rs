//! End-to-end planning cycle.
//!
//! ```text
//! requests ─► Scorer ─► GovernanceAllocator ─► SchedulingEngine ─► Portfolio
//!               ▲               ▲                     │
//!          EquityProfile   fair shares          ResourceLedger
//! ```
//!
//! Stages run strictly in order; nothing is scheduled before governance
//! has decided, and every intermediate record lands in the [`Portfolio`].

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use crate::audit::{AuditSink, InMemoryAuditSink};
use crate::config::PlanningConfig;
use crate::equity::{District, DistrictActivity, DistrictAllocation, EquityModel};
use crate::error::{PlanningError, Result};
use crate::governance::{
    AllocationOutcome, DecisionStatus, ExpirySweep, GovernanceAllocator, Portfolio,
    PortfolioDecision,
};
use crate::ids::{DecisionId, ProjectId};
use crate::ledger::{shared, ResourceLedger, SharedLedger};
use crate::scheduling::{SchedulePlan, SchedulingEngine, SchedulingJob, SchedulingRequest};
use crate::scoring::{BatchScoring, BenefitNormalizer, CandidateRequest, ProjectCandidate, Scorer};

/// Everything one cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub year: i32,
    pub quarter: u8,
    pub scoring: BatchScoring,
    pub allocation: AllocationOutcome,
    pub plan: SchedulePlan,
}

impl CycleReport {
    /// Approved or pending decisions the scheduler placed.
    pub fn scheduled_projects(&self) -> Vec<ProjectId> {
        self.plan.tasks.iter().map(|t| t.project_id).collect()
    }
}

/// Quarter (1-4) of a timestamp.
pub fn quarter_of(now: DateTime<Utc>) -> u8 {
    (now.month0() / 3 + 1) as u8
}

/// Scorer, allocator and scheduler wired to one ledger and one portfolio.
///
/// # Examples
///
/// ```
/// use u_capital::config::PlanningConfig;
/// use u_capital::pipeline::PlanningCycle;
///
/// let cycle = PlanningCycle::new(PlanningConfig::default()).unwrap();
/// assert!(cycle.portfolio().audit_sink().is_empty());
/// ```
pub struct PlanningCycle<S: AuditSink = InMemoryAuditSink> {
    config: PlanningConfig,
    normalizer: BenefitNormalizer,
    scorer: Scorer,
    equity: EquityModel,
    scheduler: SchedulingEngine,
    ledger: SharedLedger,
    portfolio: Portfolio<S>,
    /// District rollup of the current quarter.
    allocations: Vec<DistrictAllocation>,
    /// `(year, quarter)` the committed total belongs to.
    budget_period: Option<(i32, u8)>,
    /// Budget held by funded decisions of the current quarter, whatever
    /// their district.
    committed_budget: f64,
}

impl PlanningCycle<InMemoryAuditSink> {
    /// Validates `config` and builds a cycle with an empty ledger.
    pub fn new(config: PlanningConfig) -> Result<Self> {
        Self::with_parts(config, shared(ResourceLedger::new()), Portfolio::new())
    }
}

impl<S: AuditSink> PlanningCycle<S> {
    /// Validates `config` and builds a cycle around an existing ledger and
    /// portfolio.
    pub fn with_parts(config: PlanningConfig, ledger: SharedLedger, portfolio: Portfolio<S>) -> Result<Self> {
        let config = config.load_validated()?;
        let normalizer = BenefitNormalizer::from_city(&config.city, &config.normalizer);
        Ok(Self {
            scorer: Scorer::new(config.scoring.clone(), normalizer.clone()),
            normalizer,
            equity: EquityModel::new(config.equity.clone()),
            scheduler: SchedulingEngine::new(config.scheduler.clone()),
            ledger,
            portfolio,
            allocations: Vec::new(),
            budget_period: None,
            committed_budget: 0.0,
            config,
        })
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    pub fn portfolio(&self) -> &Portfolio<S> {
        &self.portfolio
    }

    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }

    pub fn normalizer(&self) -> &BenefitNormalizer {
        &self.normalizer
    }

    pub fn allocations(&self) -> &[DistrictAllocation] {
        &self.allocations
    }

    /// Budget committed so far in the current quarter.
    pub fn committed_budget(&self) -> f64 {
        self.committed_budget
    }

    /// Quarterly budget not yet committed.
    pub fn remaining_budget(&self) -> f64 {
        (self.config.city.quarterly_budget - self.committed_budget).max(0.0)
    }

    /// Runs one planning cycle at `now`.
    ///
    /// Invalid requests are reported in the scoring result and skipped. The
    /// ledger is seeded for the horizon of `now`'s year if needed. The
    /// quarterly budget shrinks by what earlier cycles of the same quarter
    /// already committed, including decisions with no district. A new
    /// quarter starts from the full budget.
    pub fn run(
        &mut self,
        requests: &[CandidateRequest],
        districts: &[District],
        activity: &[DistrictActivity],
        now: DateTime<Utc>,
    ) -> Result<CycleReport> {
        let year = now.year();
        let quarter = quarter_of(now);
        tracing::info!(year, quarter, requests = requests.len(), "planning cycle started");

        {
            let mut ledger = self.ledger.lock();
            let seeded = self.config.city.seed_ledger(
                std::mem::take(&mut *ledger),
                year,
                self.config.scheduler.horizon_weeks,
            );
            *ledger = seeded;
        }

        // Scoring.
        let profile = self.equity.profile(districts, activity);
        self.scorer = Scorer::new(self.config.scoring.clone(), self.normalizer.clone()).with_equity(profile);
        let scoring = self.scorer.score_batch(requests, now);
        for rejected in &scoring.rejected {
            tracing::warn!(
                project_id = rejected.project_id,
                issue_id = rejected.issue_id,
                error = %rejected.error,
                "request rejected at scoring"
            );
        }
        self.portfolio.record_candidates(&scoring.candidates);

        let scored: Vec<ProjectId> = scoring.candidates.iter().map(|c| c.project_id).collect();
        let ratios: Vec<f64> = requests
            .iter()
            .filter(|r| scored.contains(&r.project_id))
            .filter_map(|r| r.signal.benefit_ratio())
            .collect();
        self.normalizer.recalibrate(&ratios);

        // Governance.
        if self.budget_period != Some((year, quarter)) {
            self.allocations =
                self.equity
                    .fair_shares(districts, self.config.city.quarterly_budget, quarter, year);
            self.budget_period = Some((year, quarter));
            self.committed_budget = 0.0;
        }
        let budget = self.remaining_budget();

        let allocator = GovernanceAllocator::new(
            self.config.governance.clone(),
            self.config.equity.clone(),
            budget,
        )
        .with_first_decision_id(self.portfolio.next_decision_id());
        let allocation = allocator.allocate(&scoring.candidates, &self.allocations, now);
        self.portfolio.record_decisions(&allocation.decisions);
        self.allocations = allocation.allocations.clone();
        self.committed_budget += allocation.total_allocated;

        // Scheduling.
        let by_project: BTreeMap<ProjectId, &ProjectCandidate> =
            scoring.candidates.iter().map(|c| (c.project_id, c)).collect();
        let jobs: Vec<SchedulingJob> = allocation
            .decisions
            .iter()
            .filter_map(|d| {
                by_project
                    .get(&d.project_id)
                    .and_then(|c| SchedulingJob::from_decision(d, c))
            })
            .collect();
        let request = SchedulingRequest::new(year, jobs)
            .with_prior_tasks(self.portfolio.active_tasks())
            .with_first_task_id(self.portfolio.next_task_id());
        let plan = self.scheduler.run(&request, &self.ledger)?;
        self.portfolio.record_schedule(&plan, now);

        self.ledger.lock().verify()?;
        tracing::info!(
            scored = scoring.candidates.len(),
            approved = allocation.decisions.iter().filter(|d| d.status.is_funded()).count(),
            scheduled = plan.tasks.len(),
            strategy = %plan.strategy,
            "planning cycle finished"
        );

        Ok(CycleReport {
            year,
            quarter,
            scoring,
            allocation,
            plan,
        })
    }

    /// Records a human feasibility value for a scored project.
    pub fn override_feasibility(
        &mut self,
        project_id: ProjectId,
        value: f64,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ProjectCandidate> {
        let current = self
            .portfolio
            .candidate(project_id)
            .ok_or(PlanningError::ProjectNotFound(project_id))?;
        let (next, provenance) = self
            .scorer
            .apply_feasibility_override(current, value, actor, reason, now)?;
        self.portfolio.record_override(next.clone(), provenance);
        Ok(next)
    }

    /// Gives a declined or expired decision's budget back to its quarter.
    ///
    /// Decisions proposed in an earlier quarter are left alone; that
    /// quarter's budget is closed.
    fn release_budget(&mut self, decision: &PortfolioDecision) {
        let period = (decision.proposed_at.year(), quarter_of(decision.proposed_at));
        if self.budget_period != Some(period) || decision.allocated_budget <= 0.0 {
            return;
        }
        self.committed_budget = (self.committed_budget - decision.allocated_budget).max(0.0);
        if let Some(a) = decision
            .district_id
            .and_then(|id| self.allocations.iter_mut().find(|a| a.district_id == id))
        {
            a.allocated_budget = (a.allocated_budget - decision.allocated_budget).max(0.0);
            a.project_count = a.project_count.saturating_sub(1);
            a.equity_ratio = a.projected_ratio(0.0);
        }
        tracing::info!(
            decision_id = decision.decision_id,
            amount = decision.allocated_budget,
            committed = self.committed_budget,
            "budget returned to quarter"
        );
    }

    /// Confirms a pending approval.
    ///
    /// Its soft reservations become hard. A decision that found no crew
    /// weeks when it was proposed is scheduled now, with hard reservations.
    pub fn confirm(&mut self, decision_id: DecisionId, actor: &str, now: DateTime<Utc>) -> Result<PortfolioDecision> {
        let confirmed = self.portfolio.confirm(decision_id, actor, now, &self.ledger)?;
        if self.portfolio.active_task(confirmed.project_id).is_none() {
            self.schedule_confirmed(&confirmed, now)?;
        }
        Ok(confirmed)
    }

    fn schedule_confirmed(&mut self, decision: &PortfolioDecision, now: DateTime<Utc>) -> Result<()> {
        let Some(job) = self
            .portfolio
            .candidate(decision.project_id)
            .and_then(|c| SchedulingJob::from_decision(decision, c))
        else {
            return Ok(());
        };
        let request = SchedulingRequest::new(decision.proposed_at.year(), vec![job])
            .with_first_task_id(self.portfolio.next_task_id());
        let plan = self.scheduler.run(&request, &self.ledger)?;
        if plan.tasks.is_empty() {
            tracing::warn!(
                decision_id = decision.decision_id,
                project_id = decision.project_id,
                "confirmed decision still has no crew window"
            );
        }
        self.portfolio.record_schedule(&plan, now);
        Ok(())
    }

    /// Declines a pending approval and returns its budget to the quarter.
    pub fn decline(
        &mut self,
        decision_id: DecisionId,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<PortfolioDecision> {
        let declined = self.portfolio.decline(decision_id, actor, reason, now, &self.ledger)?;
        self.release_budget(&declined);
        Ok(declined)
    }

    /// Expires overdue conditional approvals and returns their budget to
    /// the current quarter.
    pub fn expire_overdue(&mut self, now: DateTime<Utc>) -> Result<ExpirySweep> {
        let sweep = self.portfolio.expire_overdue(now, &self.ledger)?;
        let expired: Vec<PortfolioDecision> = sweep
            .expired
            .iter()
            .filter_map(|id| self.portfolio.get(*id).cloned())
            .collect();
        for decision in &expired {
            self.release_budget(decision);
        }
        Ok(sweep)
    }

    /// Decisions awaiting confirmation, earliest deadline first.
    pub fn pending_confirmations(&self, now: DateTime<Utc>) -> Vec<&PortfolioDecision> {
        self.portfolio.pending_confirmations(now)
    }

    pub fn decisions_with_status(&self, status: DecisionStatus) -> Vec<&PortfolioDecision> {
        self.portfolio.list_by_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ResourceType;
    use crate::scoring::{CrewRequirement, IssueSignal, MandateTier, SafetyTier};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 7, 9, 0, 0).unwrap()
    }

    fn request(project_id: u64, district: u32, cost: f64, safety: SafetyTier) -> CandidateRequest {
        CandidateRequest::new(
            project_id,
            format!("project {project_id}"),
            IssueSignal {
                issue_id: project_id + 1000,
                district_id: Some(district),
                population_affected: 20_000,
                complaint_count: 12,
                safety_tier: safety,
                mandate_tier: MandateTier::None,
                estimated_cost: cost,
                urgency_days: 42,
            },
            0.8,
            CrewRequirement {
                resource_type: ResourceType::new("water_crew"),
                crew_size: 1,
                duration_weeks: 2,
            },
        )
    }

    fn districts() -> Vec<District> {
        vec![
            District::new(1, "North", 1_200_000),
            District::new(2, "South", 1_300_000),
        ]
    }

    #[test]
    fn test_quarter_of() {
        assert_eq!(quarter_of(now()), 2);
        assert_eq!(quarter_of(Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap()), 4);
    }

    #[test]
    fn test_cycle_runs_end_to_end() {
        let mut cycle = PlanningCycle::new(PlanningConfig::default()).unwrap();
        let requests = vec![
            request(1, 1, 2_000_000.0, SafetyTier::Moderate),
            request(2, 2, 3_000_000.0, SafetyTier::Severe),
        ];
        let report = cycle.run(&requests, &districts(), &[], now()).unwrap();

        assert_eq!(report.quarter, 2);
        assert_eq!(report.scoring.candidates.len(), 2);
        assert_eq!(report.allocation.decisions.len(), 2);
        assert_eq!(report.plan.tasks.len(), 2);

        // severe safety needs confirmation and books soft
        let pending = cycle.pending_confirmations(now());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].project_id, 2);

        let water = ResourceType::new("water_crew");
        let util = cycle.ledger().lock().utilization(&water);
        assert_eq!((util.soft, util.hard), (2, 2));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = PlanningConfig::default();
        config.scheduler.exact_time_limit_ms = 0;
        assert!(matches!(PlanningCycle::new(config), Err(PlanningError::Config(_))));
    }

    #[test]
    fn test_override_unknown_project() {
        let mut cycle = PlanningCycle::new(PlanningConfig::default()).unwrap();
        assert_eq!(
            cycle.override_feasibility(5, 0.9, "engineer", "site visit", now()),
            Err(PlanningError::ProjectNotFound(5))
        );
    }
}
