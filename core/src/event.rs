//! Audit events written alongside assignment state changes.
//!
//! Variants are added over time — never removed or reordered.
//! Each event is stored as a JSON payload in the audit_event table.

use crate::{
    matcher::NoCandidatesCause,
    recommendation::AgentMethod,
    types::{AssignmentId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    RecommendationIssued {
        subcategory: String,
        priority: String,
        agent_method: AgentMethod,
        ranked_user_ids: Vec<UserId>,
    },
    NoCandidates {
        subcategory: String,
        cause: NoCandidatesCause,
    },
    AssignmentOpened {
        assignment_id: AssignmentId,
        user_id: UserId,
        action: String,
        open_after: u32,
        max_concurrent: u32,
    },
    CapacityRejected {
        user_id: UserId,
        open: u32,
        max_concurrent: u32,
    },
    AssignmentClosed {
        assignment_id: AssignmentId,
    },
}

impl DeskEvent {
    /// Stable name for the event_type column.
    pub fn event_type(&self) -> &'static str {
        match self {
            DeskEvent::RecommendationIssued { .. } => "recommendation_issued",
            DeskEvent::NoCandidates { .. } => "no_candidates",
            DeskEvent::AssignmentOpened { .. } => "assignment_opened",
            DeskEvent::CapacityRejected { .. } => "capacity_rejected",
            DeskEvent::AssignmentClosed { .. } => "assignment_closed",
        }
    }

    /// The assignment this event belongs to, when there is one.
    pub fn assignment_id(&self) -> Option<&str> {
        match self {
            DeskEvent::AssignmentOpened { assignment_id, .. }
            | DeskEvent::AssignmentClosed { assignment_id } => Some(assignment_id),
            _ => None,
        }
    }
}

/// A row in the audit_event table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub event_type: String,
    pub assignment_id: Option<AssignmentId>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl EventLogEntry {
    pub fn new(event: &DeskEvent, at: DateTime<Utc>) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            event_type: event.event_type().to_string(),
            assignment_id: event.assignment_id().map(String::from),
            payload: serde_json::to_string(event)?,
            created_at: at,
        })
    }

    pub fn decode(&self) -> serde_json::Result<DeskEvent> {
        serde_json::from_str(&self.payload)
    }
}
