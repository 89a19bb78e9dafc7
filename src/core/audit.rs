//! Audit trail of scheduler decisions.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

/// Scheduler decision recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Unit declared.
    Register,
    /// Unit admitted straight into the running set.
    Admit,
    /// Unit queued for capacity.
    Enqueue,
    /// Unit left pending on unmet dependencies.
    Block,
    /// Launch refused by the budget gate.
    SplitRequired,
    /// Queued unit promoted into a freed slot.
    Promote,
    /// Unit suspended with a checkpoint.
    Suspend,
    /// Unit finished.
    Complete,
    /// Failed unit re-queued for another attempt.
    Retry,
    /// Unit failed with the retry budget exhausted.
    Fail,
    /// Running unit expired for lack of progress.
    Expire,
    /// Unit replaced by a split plan.
    Split,
    /// Unit removed by the operator.
    Archive,
    /// Terminally failed unit re-armed by the operator.
    Reset,
}

impl AuditAction {
    /// Lowercase action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Admit => "admit",
            Self::Enqueue => "enqueue",
            Self::Block => "block",
            Self::SplitRequired => "split_required",
            Self::Promote => "promote",
            Self::Suspend => "suspend",
            Self::Complete => "complete",
            Self::Retry => "retry",
            Self::Fail => "fail",
            Self::Expire => "expire",
            Self::Split => "split",
            Self::Archive => "archive",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Unit the decision concerned.
    pub unit_id: String,
    /// Decision taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
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

/// Sink that forwards to a shared in-memory buffer, so callers can inspect
/// events after handing the sink to a scheduler.
#[derive(Clone)]
pub struct SharedAuditSink {
    inner: std::sync::Arc<parking_lot::Mutex<InMemoryAuditSink>>,
}

impl SharedAuditSink {
    /// Create a shared sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            inner: std::sync::Arc::new(parking_lot::Mutex::new(InMemoryAuditSink::new(
                max_events,
            ))),
        }
    }

    /// Snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.inner.lock().events()
    }

    /// Actions recorded for one unit, oldest first.
    #[must_use]
    pub fn actions_for(&self, unit_id: &str) -> Vec<AuditAction> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| e.unit_id == unit_id)
            .map(|e| e.action)
            .collect()
    }
}

impl AuditSink for SharedAuditSink {
    fn record(&mut self, event: AuditEvent) {
        self.inner.lock().record(event);
    }
}

/// Build an audit event with a fresh id and the current time.
pub fn build_audit_event(
    unit_id: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        unit_id: unit_id.into(),
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
