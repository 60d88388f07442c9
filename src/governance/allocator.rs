//! Three-phase budget allocation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use super::config::GovernanceConfig;
use super::types::{
    AllocationOutcome, AllocationPhase, BudgetSummary, DecisionStatus, PortfolioDecision,
};
use crate::equity::{DistrictAllocation, EquityConfig, EquityModel};
use crate::ids::{DecisionId, DistrictId};
use crate::ranking::{PriorityRule, RuleEngine, TieBreaker};
use crate::scoring::{MandateTier, ProjectCandidate, SafetyTier};

/// Slack for floating-point budget comparisons, in currency units.
const BUDGET_EPS: f64 = 1e-6;

struct HighestComposite;

impl PriorityRule<ProjectCandidate, ()> for HighestComposite {
    fn name(&self) -> &str {
        "HighestComposite"
    }

    fn score(&self, candidate: &ProjectCandidate, _: &()) -> f64 {
        -candidate.scores.composite
    }
}

/// Turns scored candidates into portfolio decisions.
///
/// Phases run strictly in order against one quarterly pool:
///
/// 1. **Mandate** (default 30%): required or court-ordered mandates.
/// 2. **Urgent-critical** (default 20%): urgency above 0.7 with a severe or
///    critical safety tier.
/// 3. **Value-ranked** (default 50% plus unused phase 1-2 budget): everything
///    else, subject to equity enforcement.
///
/// Within a phase candidates are taken by composite score descending, ties
/// by lower project id, and approved greedily while the phase cap allows.
#[derive(Debug, Clone)]
pub struct GovernanceAllocator {
    config: GovernanceConfig,
    equity: EquityModel,
    quarterly_budget: f64,
    first_decision_id: DecisionId,
}

#[derive(Clone, Copy)]
enum Verdict {
    Approve,
    Defer,
    Reject,
}

struct Tally<'a> {
    candidates: &'a [ProjectCandidate],
    decisions: Vec<Option<PortfolioDecision>>,
    district_spend: BTreeMap<DistrictId, f64>,
    next_rank: u32,
}

impl GovernanceAllocator {
    pub fn new(config: GovernanceConfig, equity: EquityConfig, quarterly_budget: f64) -> Self {
        Self {
            config,
            equity: EquityModel::new(equity),
            quarterly_budget,
            first_decision_id: 1,
        }
    }

    /// Decision ids are assigned from `id` upward, in candidate input order.
    pub fn with_first_decision_id(mut self, id: DecisionId) -> Self {
        self.first_decision_id = id;
        self
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn quarterly_budget(&self) -> f64 {
        self.quarterly_budget
    }

    /// Runs the three phases.
    ///
    /// `allocations` is the district rollup going into this cycle; it is not
    /// modified. The outcome carries the rollup for the next cycle.
    pub fn allocate(
        &self,
        candidates: &[ProjectCandidate],
        allocations: &[DistrictAllocation],
        now: DateTime<Utc>,
    ) -> AllocationOutcome {
        let budget = self.quarterly_budget;
        let order = RuleEngine::new()
            .with_rule(HighestComposite)
            .with_tie_breaker(TieBreaker::ByKey(|c: &ProjectCandidate| c.project_id))
            .sort_indices(candidates, &());
        let by_district: BTreeMap<DistrictId, &DistrictAllocation> =
            allocations.iter().map(|a| (a.district_id, a)).collect();

        let mut book = Tally {
            candidates,
            decisions: vec![None; candidates.len()],
            district_spend: BTreeMap::new(),
            next_rank: 1,
        };

        // Phase 1: mandates.
        let cap1 = self.config.mandate_cap * budget;
        let mut used1 = 0.0;
        let mut fall_through = vec![false; candidates.len()];
        for &i in &order {
            let c = &candidates[i];
            if !c.mandate_tier.is_binding() {
                continue;
            }
            if used1 + c.estimated_cost <= cap1 + BUDGET_EPS {
                used1 += c.estimated_cost;
                let why = format!(
                    "{} mandate funded in mandate phase ({:.0} of {:.0} used)",
                    c.mandate_tier, used1, cap1
                );
                self.decide(&mut book, i, Verdict::Approve, AllocationPhase::Mandate, why, now);
            } else if c.estimated_cost <= budget - used1 + BUDGET_EPS {
                fall_through[i] = true;
            } else {
                let why = format!(
                    "{} mandate cost {:.0} exceeds the uncommitted quarterly budget",
                    c.mandate_tier, c.estimated_cost
                );
                self.decide(&mut book, i, Verdict::Defer, AllocationPhase::Mandate, why, now);
            }
        }

        // Phase 2: urgent and critical.
        let cap2 = self.config.urgent_critical_cap * budget;
        let mut used2 = 0.0;
        for &i in &order {
            let c = &candidates[i];
            if book.decisions[i].is_some() || fall_through[i] || !self.is_urgent_critical(c) {
                continue;
            }
            if used2 + c.estimated_cost <= cap2 + BUDGET_EPS {
                used2 += c.estimated_cost;
                let why = format!(
                    "urgent {} safety issue (urgency {:.2}) funded in urgent-critical phase",
                    c.safety_tier, c.scores.urgency
                );
                self.decide(&mut book, i, Verdict::Approve, AllocationPhase::UrgentCritical, why, now);
            } else {
                let why = format!(
                    "urgent-critical cap exhausted ({:.0} of {:.0} used)",
                    used2, cap2
                );
                self.decide(&mut book, i, Verdict::Defer, AllocationPhase::UrgentCritical, why, now);
            }
        }

        // Phase 3: value-ranked with equity enforcement.
        let rollover = if self.config.rollover {
            (cap1 - used1).max(0.0) + (cap2 - used2).max(0.0)
        } else {
            0.0
        };
        let cap3 = self.config.value_ranked_cap() * budget + rollover;
        let mut used3 = 0.0;
        for &i in &order {
            if book.decisions[i].is_some() {
                continue;
            }
            let c = &candidates[i];
            if !fall_through[i] {
                if let Some(verdict) = self.equity_check(&book, &by_district, c) {
                    let (verdict, why) = verdict;
                    tracing::warn!(project_id = c.project_id, district = ?c.district_id, %why, "equity enforcement");
                    self.decide(&mut book, i, verdict, AllocationPhase::ValueRanked, why, now);
                    continue;
                }
            }
            if used3 + c.estimated_cost <= cap3 + BUDGET_EPS {
                used3 += c.estimated_cost;
                let why = if fall_through[i] {
                    format!(
                        "{} mandate over the mandate cap, funded from value-ranked pool",
                        c.mandate_tier
                    )
                } else {
                    format!("ranked by composite score {:.3}", c.scores.composite)
                };
                self.decide(&mut book, i, Verdict::Approve, AllocationPhase::ValueRanked, why, now);
            } else {
                let why = format!(
                    "value-ranked budget exhausted ({:.0} of {:.0} used)",
                    used3, cap3
                );
                self.decide(&mut book, i, Verdict::Defer, AllocationPhase::ValueRanked, why, now);
            }
        }

        let decisions: Vec<PortfolioDecision> = book.decisions.into_iter().flatten().collect();
        let phase_summaries = vec![
            summary(AllocationPhase::Mandate, cap1, used1, &decisions),
            summary(AllocationPhase::UrgentCritical, cap2, used2, &decisions),
            summary(AllocationPhase::ValueRanked, cap3, used3, &decisions),
        ];
        for s in &phase_summaries {
            tracing::info!(
                phase = %s.phase,
                cap = s.cap,
                allocated = s.allocated,
                approved = s.approved,
                "allocation phase complete"
            );
        }

        let approvals = decisions.iter().filter(|d| d.status.is_funded()).filter_map(|d| {
            d.district_id.map(|id| (id, d.allocated_budget))
        });
        let allocations = self.equity.rollup(allocations, approvals);

        AllocationOutcome {
            total_allocated: used1 + used2 + used3,
            decisions,
            phase_summaries,
            allocations,
        }
    }

    fn is_urgent_critical(&self, c: &ProjectCandidate) -> bool {
        c.scores.urgency > self.config.urgent_threshold && c.safety_tier.is_serious()
    }

    /// Defer or reject a candidate whose district would exceed the fair-share
    /// threshold; `None` when equity allows it.
    fn equity_check(
        &self,
        book: &Tally<'_>,
        allocations: &BTreeMap<DistrictId, &DistrictAllocation>,
        c: &ProjectCandidate,
    ) -> Option<(Verdict, String)> {
        let district = c.district_id?;
        let allocation = allocations.get(&district)?;
        let this_cycle = book.district_spend.get(&district).copied().unwrap_or(0.0);
        let ratio = allocation.projected_ratio(this_cycle + c.estimated_cost);
        let threshold = self.equity.config().defer_threshold;
        if ratio <= threshold {
            return None;
        }
        let low_value = c.scores.urgency < self.config.low_urgency_threshold
            && c.mandate_tier == MandateTier::None
            && c.safety_tier == SafetyTier::None;
        if low_value {
            Some((
                Verdict::Reject,
                format!(
                    "district {district} at {ratio:.2}x fair share with low urgency {:.2} and no mandate or safety need",
                    c.scores.urgency
                ),
            ))
        } else {
            Some((
                Verdict::Defer,
                format!("district {district} would reach {ratio:.2}x fair share (limit {threshold:.1}x)"),
            ))
        }
    }

    fn decide(
        &self,
        book: &mut Tally<'_>,
        index: usize,
        verdict: Verdict,
        phase: AllocationPhase,
        rationale: String,
        now: DateTime<Utc>,
    ) {
        let c = &book.candidates[index];
        let deadline_week = (self.config.proposal_week + c.urgency_days / 7).max(1);
        let mut decision = PortfolioDecision {
            decision_id: self.first_decision_id + index as DecisionId,
            project_id: c.project_id,
            district_id: c.district_id,
            status: DecisionStatus::Proposed,
            phase,
            allocated_budget: 0.0,
            priority_rank: None,
            rationale,
            deadline_week,
            requires_confirmation: false,
            proposed_at: now,
            confirmation_deadline: None,
            confirmed_at: None,
            confirmed_by: None,
        };

        decision.status = match verdict {
            Verdict::Approve => {
                decision.allocated_budget = c.estimated_cost;
                decision.priority_rank = Some(book.next_rank);
                book.next_rank += 1;
                if let Some(district) = c.district_id {
                    *book.district_spend.entry(district).or_insert(0.0) += c.estimated_cost;
                }
                let needs_confirmation = c.estimated_cost > self.config.confirmation_cost_threshold
                    || (self.config.confirm_serious_safety && c.safety_tier.is_serious());
                if needs_confirmation {
                    decision.requires_confirmation = true;
                    decision.confirmation_deadline = Some(
                        now + Duration::days(i64::from(self.config.confirmation_timeout_days)),
                    );
                    DecisionStatus::ApprovedWithConditions
                } else {
                    DecisionStatus::Approved
                }
            }
            Verdict::Defer => DecisionStatus::Deferred,
            Verdict::Reject => DecisionStatus::Rejected,
        };
        tracing::debug!(
            project_id = c.project_id,
            status = %decision.status,
            %phase,
            "decision taken"
        );
        book.decisions[index] = Some(decision);
    }
}

fn summary(
    phase: AllocationPhase,
    cap: f64,
    allocated: f64,
    decisions: &[PortfolioDecision],
) -> BudgetSummary {
    BudgetSummary {
        phase,
        cap,
        allocated,
        remaining: (cap - allocated).max(0.0),
        approved: decisions
            .iter()
            .filter(|d| d.phase == phase && d.status.is_funded())
            .count(),
    }
}
