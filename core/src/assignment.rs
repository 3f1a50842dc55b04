//! Assignment records: the audit trail of human decisions.
//!
//! An assignment is written when a human accepts or overrides a
//! recommendation. Status moves OPEN → CLOSED exactly once.

use crate::{
    recommendation::AgentMethod,
    ticket::Ticket,
    types::{AssignmentId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentAction {
    Accept,
    Override,
}

impl AssignmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentAction::Accept => "Accept",
            AssignmentAction::Override => "Override",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Accept" => Some(AssignmentAction::Accept),
            "Override" => Some(AssignmentAction::Override),
            _ => None,
        }
    }

    /// Estimated triage minutes saved versus manual routing.
    pub fn time_saved_minutes(&self) -> f64 {
        match self {
            AssignmentAction::Accept => 10.0,
            AssignmentAction::Override => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssignmentStatus {
    Open,
    Closed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Open => "OPEN",
            AssignmentStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "OPEN" => Some(AssignmentStatus::Open),
            "CLOSED" => Some(AssignmentStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub assignment_id: AssignmentId,
    pub short_description: String,
    pub category: String,
    pub subcategory: String,
    pub priority: String,
    pub opened_at: Option<String>,
    pub top1_user_id: Option<UserId>,
    pub top1_score: u32,
    pub selected_user_id: UserId,
    pub action: AssignmentAction,
    pub status: AssignmentStatus,
    pub explanation: String,
    pub agent_method: AgentMethod,
    pub time_saved_minutes: f64,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Short descriptions are cut at this many characters in the audit trail.
pub const SHORT_DESCRIPTION_LIMIT: usize = 100;

impl AssignmentRecord {
    /// Build an OPEN record for a decision taken at `now`.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        ticket: &Ticket,
        top1_user_id: Option<UserId>,
        top1_score: u32,
        selected_user_id: &str,
        action: AssignmentAction,
        explanation: String,
        agent_method: AgentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            assignment_id: new_assignment_id(now, selected_user_id),
            short_description: ticket
                .short_description
                .chars()
                .take(SHORT_DESCRIPTION_LIMIT)
                .collect(),
            category: ticket.category.clone(),
            subcategory: ticket.subcategory.clone(),
            priority: ticket.priority.label().to_string(),
            opened_at: ticket.opened_at.clone(),
            top1_user_id,
            top1_score,
            selected_user_id: selected_user_id.to_string(),
            action,
            status: AssignmentStatus::Open,
            explanation,
            agent_method,
            time_saved_minutes: action.time_saved_minutes(),
            created_at: now,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == AssignmentStatus::Open
    }
}

/// `ASSIGN_{YYYYmmdd_HHMMSS}_{user_id}_{8 hex}`. The random tail keeps two
/// decisions for the same person within one second distinct.
pub fn new_assignment_id(now: DateTime<Utc>, user_id: &str) -> AssignmentId {
    let tail = uuid::Uuid::new_v4().simple().to_string();
    format!("ASSIGN_{}_{}_{}", now.format("%Y%m%d_%H%M%S"), user_id, &tail[..8])
}

/// Aggregate audit numbers for the assignment history view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStats {
    pub total_assignments: usize,
    /// Percentage of decisions that accepted the top recommendation.
    pub acceptance_rate: f64,
    pub total_time_saved_minutes: f64,
    pub open_assignments: usize,
    pub closed_assignments: usize,
}

impl AssignmentStats {
    pub fn from_records(records: &[AssignmentRecord]) -> Self {
        let total = records.len();
        if total == 0 {
            return Self::default();
        }
        let accepts = records
            .iter()
            .filter(|r| r.action == AssignmentAction::Accept)
            .count();
        Self {
            total_assignments: total,
            acceptance_rate: accepts as f64 / total as f64 * 100.0,
            total_time_saved_minutes: records.iter().map(|r| r.time_saved_minutes).sum(),
            open_assignments: records.iter().filter(|r| r.is_open()).count(),
            closed_assignments: records.iter().filter(|r| !r.is_open()).count(),
        }
    }
}
