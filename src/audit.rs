//! Audit trail and provenance records.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

/// Kind of auditable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuditEventType {
    ProjectScored,
    ProjectApproved,
    ProjectDeferred,
    ProjectRejected,
    FeasibilityOverridden,
    TaskScheduled,
    ApprovalConfirmed,
    ApprovalDeclined,
    ApprovalExpired,
    ReservationReleased,
}

impl AuditEventType {
    /// Upper snake case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectScored => "PROJECT_SCORED",
            Self::ProjectApproved => "PROJECT_APPROVED",
            Self::ProjectDeferred => "PROJECT_DEFERRED",
            Self::ProjectRejected => "PROJECT_REJECTED",
            Self::FeasibilityOverridden => "FEASIBILITY_OVERRIDDEN",
            Self::TaskScheduled => "TASK_SCHEDULED",
            Self::ApprovalConfirmed => "APPROVAL_CONFIRMED",
            Self::ApprovalDeclined => "APPROVAL_DECLINED",
            Self::ApprovalExpired => "APPROVAL_EXPIRED",
            Self::ReservationReleased => "RESERVATION_RELEASED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditEvent {
    /// What happened.
    pub event_type: AuditEventType,
    /// Project or decision the event concerns.
    pub entity_id: u64,
    /// Who did it (`system` for automatic actions).
    pub actor: String,
    /// Free-form context.
    pub detail: String,
    /// When it happened.
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    /// Event attributed to the system actor.
    pub fn system(
        event_type: AuditEventType,
        entity_id: u64,
        detail: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            entity_id,
            actor: SYSTEM_ACTOR.to_string(),
            detail: detail.into(),
            at,
        }
    }

    /// Event attributed to a named actor.
    pub fn by(
        event_type: AuditEventType,
        entity_id: u64,
        actor: impl Into<String>,
        detail: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            entity_id,
            actor: actor.into(),
            detail: detail.into(),
            at,
        }
    }
}

/// Actor name for automatic actions.
pub const SYSTEM_ACTOR: &str = "system";

/// Destination for audit events.
pub trait AuditSink: Send {
    /// Records an event.
    fn record(&mut self, event: AuditEvent);
}

/// Bounded in-memory sink; the oldest events are dropped first.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Creates a sink holding at most `max_events`.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Events of one type.
    pub fn of_type(&self, event_type: AuditEventType) -> Vec<&AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the sink is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Provenance of a human override of a scored field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProvenanceRecord {
    /// Project whose candidate was overridden.
    pub project_id: u64,
    /// Overridden field.
    pub field: String,
    /// Value before the override.
    pub original_value: f64,
    /// Value after the override.
    pub final_value: f64,
    /// Who made the change.
    pub actor: String,
    /// Stated reason.
    pub reason: String,
    /// When it was made.
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_bounded_sink_drops_oldest() {
        let mut sink = InMemoryAuditSink::new(2);
        for id in 1..=3 {
            sink.record(AuditEvent::system(AuditEventType::ProjectScored, id, "", at()));
        }
        let ids: Vec<u64> = sink.events().iter().map(|e| e.entity_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_zero_capacity_sink_stores_nothing() {
        let mut sink = InMemoryAuditSink::new(0);
        sink.record(AuditEvent::system(AuditEventType::TaskScheduled, 1, "", at()));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_filter_and_labels() {
        let mut sink = InMemoryAuditSink::default();
        sink.record(AuditEvent::by(
            AuditEventType::ApprovalConfirmed,
            4,
            "alice",
            "confirmed",
            at(),
        ));
        sink.record(AuditEvent::system(AuditEventType::ApprovalExpired, 5, "", at()));
        assert_eq!(sink.of_type(AuditEventType::ApprovalExpired).len(), 1);
        assert_eq!(sink.events()[0].actor, "alice");
        assert_eq!(AuditEventType::ApprovalExpired.to_string(), "APPROVAL_EXPIRED");
    }
}
