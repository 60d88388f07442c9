//! Versioned portfolio store with the confirmation workflow.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::{DecisionStatus, PortfolioDecision};
use crate::audit::{AuditEvent, AuditEventType, AuditSink, InMemoryAuditSink, ProvenanceRecord};
use crate::error::{PlanningError, Result};
use crate::history::History;
use crate::ids::{DecisionId, ProjectId, TaskId};
use crate::ledger::{Reservation, SharedLedger};
use crate::scheduling::{SchedulePlan, ScheduleTask, TaskStatus};
use crate::scoring::ProjectCandidate;

/// Outcome of an expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpirySweep {
    /// Decisions moved to `Expired`, ascending.
    pub expired: Vec<DecisionId>,
    /// Crew-weeks of soft reservation given back.
    pub units_released: u64,
}

/// Decision counts by status plus committed budget.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSummary {
    pub by_status: BTreeMap<String, usize>,
    /// Budget held by approved, pending and confirmed decisions.
    pub committed_budget: f64,
    pub pending_confirmations: usize,
    pub active_tasks: usize,
}

/// Append-only store of candidates, decisions and schedule tasks.
///
/// Decisions are versioned by decision id, tasks and candidates by project
/// id. Every state change appends a new version and an audit event.
///
/// # Examples
///
/// ```
/// use u_capital::governance::Portfolio;
///
/// let portfolio = Portfolio::new();
/// assert_eq!(portfolio.next_decision_id(), 1);
/// assert!(portfolio.audit_sink().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Portfolio<S: AuditSink = InMemoryAuditSink> {
    decisions: History<PortfolioDecision>,
    tasks: History<ScheduleTask>,
    candidates: History<ProjectCandidate>,
    provenance: Vec<ProvenanceRecord>,
    audit: S,
}

impl Portfolio<InMemoryAuditSink> {
    pub fn new() -> Self {
        Self::with_sink(InMemoryAuditSink::default())
    }
}

impl Default for Portfolio<InMemoryAuditSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AuditSink> Portfolio<S> {
    /// Creates a portfolio writing audit events to `sink`.
    pub fn with_sink(sink: S) -> Self {
        Self {
            decisions: History::new(),
            tasks: History::new(),
            candidates: History::new(),
            provenance: Vec::new(),
            audit: sink,
        }
    }

    pub fn audit_sink(&self) -> &S {
        &self.audit
    }

    pub fn provenance(&self) -> &[ProvenanceRecord] {
        &self.provenance
    }

    // ---- candidates ----

    pub fn record_candidates(&mut self, candidates: &[ProjectCandidate]) {
        for c in candidates {
            self.candidates.append(c.project_id, c.clone());
            self.audit.record(AuditEvent::system(
                AuditEventType::ProjectScored,
                c.project_id,
                format!("composite {:.4} (base {:.4})", c.scores.composite, c.scores.base_score),
                c.created_at,
            ));
        }
    }

    /// Stores an overridden candidate with its provenance.
    pub fn record_override(&mut self, candidate: ProjectCandidate, provenance: ProvenanceRecord) {
        self.audit.record(AuditEvent::by(
            AuditEventType::FeasibilityOverridden,
            candidate.project_id,
            provenance.actor.clone(),
            format!(
                "{} {:.2} -> {:.2}: {}",
                provenance.field, provenance.original_value, provenance.final_value, provenance.reason
            ),
            provenance.at,
        ));
        self.candidates.append(candidate.project_id, candidate);
        self.provenance.push(provenance);
    }

    pub fn candidate(&self, project_id: ProjectId) -> Option<&ProjectCandidate> {
        self.candidates.latest(project_id)
    }

    // ---- decisions ----

    pub fn record_decisions(&mut self, decisions: &[PortfolioDecision]) {
        for d in decisions {
            let event_type = match d.status {
                DecisionStatus::Approved | DecisionStatus::ApprovedWithConditions => {
                    AuditEventType::ProjectApproved
                }
                DecisionStatus::Rejected => AuditEventType::ProjectRejected,
                _ => AuditEventType::ProjectDeferred,
            };
            self.audit.record(AuditEvent::system(
                event_type,
                d.project_id,
                format!("decision {} {}: {}", d.decision_id, d.status, d.rationale),
                d.proposed_at,
            ));
            self.decisions.append(d.decision_id, d.clone());
        }
    }

    /// Current version of a decision.
    pub fn get(&self, decision_id: DecisionId) -> Option<&PortfolioDecision> {
        self.decisions.latest(decision_id)
    }

    /// Every version of a decision, oldest first.
    pub fn history(&self, decision_id: DecisionId) -> Vec<&PortfolioDecision> {
        self.decisions.versions(decision_id)
    }

    pub fn list_by_status(&self, status: DecisionStatus) -> Vec<&PortfolioDecision> {
        self.decisions
            .latest_all()
            .into_iter()
            .map(|(_, d)| d)
            .filter(|d| d.status == status)
            .collect()
    }

    /// Decisions still awaiting confirmation at `now`, earliest deadline first.
    pub fn pending_confirmations(&self, now: DateTime<Utc>) -> Vec<&PortfolioDecision> {
        let mut pending: Vec<_> = self
            .list_by_status(DecisionStatus::ApprovedWithConditions)
            .into_iter()
            .filter(|d| !d.is_overdue(now))
            .collect();
        pending.sort_by_key(|d| (d.confirmation_deadline, d.decision_id));
        pending
    }

    pub fn summary(&self, now: DateTime<Utc>) -> PortfolioSummary {
        let mut summary = PortfolioSummary::default();
        for (_, d) in self.decisions.latest_all() {
            *summary.by_status.entry(d.status.to_string()).or_insert(0) += 1;
            if d.status.is_funded() {
                summary.committed_budget += d.allocated_budget;
            }
        }
        summary.pending_confirmations = self.pending_confirmations(now).len();
        summary.active_tasks = self.active_tasks().len();
        summary
    }

    /// One past the highest decision id seen.
    pub fn next_decision_id(&self) -> DecisionId {
        self.decisions
            .latest_all()
            .last()
            .map_or(1, |(id, _)| id + 1)
    }

    // ---- tasks ----

    /// Current task of a project, if it still holds reservations.
    pub fn active_task(&self, project_id: ProjectId) -> Option<&ScheduleTask> {
        self.tasks
            .latest(project_id)
            .filter(|t| t.holds_reservation())
    }

    /// Every task still holding reservations, by project id.
    pub fn active_tasks(&self) -> Vec<ScheduleTask> {
        self.tasks
            .latest_all()
            .into_iter()
            .map(|(_, t)| t)
            .filter(|t| t.holds_reservation())
            .cloned()
            .collect()
    }

    /// Every version of a project's task, oldest first.
    pub fn task_history(&self, project_id: ProjectId) -> Vec<&ScheduleTask> {
        self.tasks.versions(project_id)
    }

    /// One past the highest task id seen.
    pub fn next_task_id(&self) -> TaskId {
        self.tasks
            .latest_all()
            .into_iter()
            .flat_map(|(project, _)| self.tasks.versions(project))
            .map(|t| t.task_id)
            .max()
            .map_or(1, |id| id + 1)
    }

    /// Stores a committed plan: superseded tasks get a final version, new
    /// tasks become the current version of their project.
    pub fn record_schedule(&mut self, plan: &SchedulePlan, now: DateTime<Utc>) {
        let superseded: Vec<ScheduleTask> = self
            .tasks
            .latest_all()
            .into_iter()
            .map(|(_, t)| t)
            .filter(|t| t.holds_reservation() && plan.superseded.contains(&t.task_id))
            .cloned()
            .collect();
        for mut task in superseded {
            task.status = TaskStatus::Superseded;
            self.audit.record(AuditEvent::system(
                AuditEventType::ReservationReleased,
                task.project_id,
                format!("task {} superseded", task.task_id),
                now,
            ));
            self.tasks.append(task.project_id, task);
        }

        for task in &plan.tasks {
            self.audit.record(AuditEvent::system(
                AuditEventType::TaskScheduled,
                task.project_id,
                format!(
                    "task {} weeks {}..={} {} x{} ({}), {}",
                    task.task_id,
                    task.start_week,
                    task.end_week,
                    task.resource_type,
                    task.crew_assigned,
                    task.reservation,
                    task.deadline_status
                ),
                now,
            ));
            self.tasks.append(task.project_id, task.clone());
        }
    }

    // ---- confirmation workflow ----

    fn pending(&self, decision_id: DecisionId, to: DecisionStatus, now: DateTime<Utc>) -> Result<&PortfolioDecision> {
        let decision = self
            .get(decision_id)
            .ok_or(PlanningError::DecisionNotFound(decision_id))?;
        if decision.status != DecisionStatus::ApprovedWithConditions {
            return Err(PlanningError::InvalidTransition {
                decision_id,
                from: decision.status,
                to,
            });
        }
        if let Some(deadline) = decision.confirmation_deadline {
            if now > deadline {
                return Err(PlanningError::ConfirmationExpired {
                    decision_id,
                    deadline,
                });
            }
        }
        Ok(decision)
    }

    fn soft_task(&self, decision: &PortfolioDecision) -> Option<&ScheduleTask> {
        self.active_task(decision.project_id)
            .filter(|t| t.decision_id == decision.decision_id && t.reservation == Reservation::Soft)
    }

    /// Confirms a pending approval, promoting its soft reservations to hard.
    pub fn confirm(
        &mut self,
        decision_id: DecisionId,
        actor: &str,
        now: DateTime<Utc>,
        ledger: &SharedLedger,
    ) -> Result<PortfolioDecision> {
        let decision = self.pending(decision_id, DecisionStatus::Confirmed, now)?;
        let mut next = decision.transition(DecisionStatus::Confirmed, format!("confirmed by {actor}"))?;
        next.confirmed_at = Some(now);
        next.confirmed_by = Some(actor.to_string());

        let task = self.soft_task(decision).cloned();
        if let Some(task) = &task {
            ledger
                .lock()
                .promote_range(&task.resource_type, task.year, task.weeks(), task.crew_assigned)?;
        }

        if let Some(mut task) = task {
            task.reservation = Reservation::Hard;
            self.tasks.append(task.project_id, task);
        }
        tracing::info!(decision_id, actor, "approval confirmed");
        self.audit.record(AuditEvent::by(
            AuditEventType::ApprovalConfirmed,
            next.project_id,
            actor,
            format!("decision {decision_id} confirmed"),
            now,
        ));
        self.decisions.append(decision_id, next.clone());
        Ok(next)
    }

    /// Declines a pending approval, releasing its soft reservations.
    pub fn decline(
        &mut self,
        decision_id: DecisionId,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
        ledger: &SharedLedger,
    ) -> Result<PortfolioDecision> {
        let decision = self.pending(decision_id, DecisionStatus::Rejected, now)?;
        let next = decision.transition(
            DecisionStatus::Rejected,
            format!("declined by {actor}: {reason}"),
        )?;

        let task = self.soft_task(decision).cloned();
        if let Some(task) = &task {
            ledger.lock().release_range(
                Reservation::Soft,
                &task.resource_type,
                task.year,
                task.weeks(),
                task.crew_assigned,
            )?;
        }

        if let Some(mut task) = task {
            task.status = TaskStatus::Released;
            self.audit.record(AuditEvent::by(
                AuditEventType::ReservationReleased,
                task.project_id,
                actor,
                format!("task {} released", task.task_id),
                now,
            ));
            self.tasks.append(task.project_id, task);
        }
        tracing::info!(decision_id, actor, "approval declined");
        self.audit.record(AuditEvent::by(
            AuditEventType::ApprovalDeclined,
            next.project_id,
            actor,
            format!("decision {decision_id} declined: {reason}"),
            now,
        ));
        self.decisions.append(decision_id, next.clone());
        Ok(next)
    }

    /// Expires every pending approval whose window closed before `now`.
    ///
    /// Soft reservations of the expired decisions are released in one step
    /// under the ledger lock. Expired decisions are terminal, so a second
    /// sweep finds nothing.
    pub fn expire_overdue(&mut self, now: DateTime<Utc>, ledger: &SharedLedger) -> Result<ExpirySweep> {
        let overdue: Vec<PortfolioDecision> = self
            .list_by_status(DecisionStatus::ApprovedWithConditions)
            .into_iter()
            .filter(|d| d.is_overdue(now))
            .cloned()
            .collect();
        if overdue.is_empty() {
            return Ok(ExpirySweep::default());
        }

        let mut updates = Vec::with_capacity(overdue.len());
        let mut sweep = ExpirySweep::default();
        {
            let mut guard = ledger.lock();
            let mut staged = guard.clone();
            for decision in &overdue {
                let next = decision.transition(
                    DecisionStatus::Expired,
                    "confirmation window closed without confirmation",
                )?;
                let task = self.soft_task(decision).cloned();
                if let Some(task) = &task {
                    staged.release_range(
                        Reservation::Soft,
                        &task.resource_type,
                        task.year,
                        task.weeks(),
                        task.crew_assigned,
                    )?;
                    sweep.units_released +=
                        u64::from(task.crew_assigned) * u64::from(task.end_week - task.start_week + 1);
                }
                sweep.expired.push(decision.decision_id);
                updates.push((next, task));
            }
            *guard = staged;
        }

        for (next, task) in updates {
            if let Some(mut task) = task {
                task.status = TaskStatus::Released;
                self.audit.record(AuditEvent::system(
                    AuditEventType::ReservationReleased,
                    task.project_id,
                    format!("task {} released on expiry", task.task_id),
                    now,
                ));
                self.tasks.append(task.project_id, task);
            }
            self.audit.record(AuditEvent::system(
                AuditEventType::ApprovalExpired,
                next.project_id,
                format!("decision {} expired", next.decision_id),
                now,
            ));
            self.decisions.append(next.decision_id, next);
        }
        sweep.expired.sort_unstable();
        tracing::info!(
            expired = sweep.expired.len(),
            units = sweep.units_released,
            "expiry sweep finished"
        );
        Ok(sweep)
    }
}
