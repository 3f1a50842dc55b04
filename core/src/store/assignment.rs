//! Assignment table queries.

use super::CommitOutcome;
use crate::{
    assignment::{AssignmentAction, AssignmentRecord, AssignmentStatus},
    error::{AssignError, AssignResult},
    recommendation::AgentMethod,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const SELECT_COLUMNS: &str = "SELECT assignment_id, short_description, category, subcategory,
        priority, opened_at, top1_user_id, top1_score, selected_user_id,
        action, status, explanation, agent_method, time_saved_minutes,
        created_at, closed_at
 FROM assignment";

/// Row from the `assignment` table, before enum columns are validated.
struct AssignmentRow {
    assignment_id: String,
    short_description: String,
    category: String,
    subcategory: String,
    priority: String,
    opened_at: Option<String>,
    top1_user_id: Option<String>,
    top1_score: i64,
    selected_user_id: String,
    action: String,
    status: String,
    explanation: String,
    agent_method: String,
    time_saved_minutes: f64,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl AssignmentRow {
    fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            assignment_id: r.get(0)?,
            short_description: r.get(1)?,
            category: r.get(2)?,
            subcategory: r.get(3)?,
            priority: r.get(4)?,
            opened_at: r.get(5)?,
            top1_user_id: r.get(6)?,
            top1_score: r.get(7)?,
            selected_user_id: r.get(8)?,
            action: r.get(9)?,
            status: r.get(10)?,
            explanation: r.get(11)?,
            agent_method: r.get(12)?,
            time_saved_minutes: r.get(13)?,
            created_at: r.get(14)?,
            closed_at: r.get(15)?,
        })
    }

    fn into_record(self) -> AssignResult<AssignmentRecord> {
        let invalid = |column: &str, value: &str| AssignError::InvalidRecord {
            reason: format!("assignment {}: bad {column} '{value}'", self.assignment_id),
        };
        let action = AssignmentAction::parse(&self.action)
            .ok_or_else(|| invalid("action", &self.action))?;
        let status = AssignmentStatus::parse(&self.status)
            .ok_or_else(|| invalid("status", &self.status))?;
        let agent_method = AgentMethod::parse(&self.agent_method)
            .ok_or_else(|| invalid("agent_method", &self.agent_method))?;
        Ok(AssignmentRecord {
            assignment_id: self.assignment_id,
            short_description: self.short_description,
            category: self.category,
            subcategory: self.subcategory,
            priority: self.priority,
            opened_at: self.opened_at,
            top1_user_id: self.top1_user_id,
            top1_score: u32::try_from(self.top1_score).unwrap_or(0),
            selected_user_id: self.selected_user_id,
            action,
            status,
            explanation: self.explanation,
            agent_method,
            time_saved_minutes: self.time_saved_minutes,
            created_at: self.created_at,
            closed_at: self.closed_at,
        })
    }
}

pub(super) fn open_count(conn: &Connection, user_id: &str) -> AssignResult<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM assignment WHERE selected_user_id=?1 AND status='OPEN'",
        params![user_id],
        |r| r.get(0),
    )?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Count and insert inside one IMMEDIATE transaction. The write lock is
/// taken before the count, so no other connection can slip an insert in
/// between.
pub(super) fn open_with_ceiling(
    conn: &mut Connection,
    record: &AssignmentRecord,
    max_concurrent: u32,
) -> AssignResult<CommitOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let open = open_count(&tx, &record.selected_user_id)?;
    if open >= max_concurrent {
        tx.rollback()?;
        return Ok(CommitOutcome::AtCapacity { open });
    }
    insert(&tx, record)?;
    tx.commit()?;
    Ok(CommitOutcome::Committed { open_after: open + 1 })
}

fn insert(conn: &Connection, a: &AssignmentRecord) -> AssignResult<()> {
    conn.execute(
        "INSERT INTO assignment (
            assignment_id, short_description, category, subcategory, priority,
            opened_at, top1_user_id, top1_score, selected_user_id, action,
            status, explanation, agent_method, time_saved_minutes, created_at, closed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            &a.assignment_id,
            &a.short_description,
            &a.category,
            &a.subcategory,
            &a.priority,
            &a.opened_at,
            &a.top1_user_id,
            a.top1_score as i64,
            &a.selected_user_id,
            a.action.as_str(),
            a.status.as_str(),
            &a.explanation,
            a.agent_method.as_str(),
            a.time_saved_minutes,
            a.created_at,
            a.closed_at,
        ],
    )?;
    Ok(())
}

/// The status guard in the WHERE clause makes a second close a no-op.
pub(super) fn close(
    conn: &Connection,
    assignment_id: &str,
    closed_at: DateTime<Utc>,
) -> AssignResult<bool> {
    let changed = conn.execute(
        "UPDATE assignment SET status='CLOSED', closed_at=?2
         WHERE assignment_id=?1 AND status='OPEN'",
        params![assignment_id, closed_at],
    )?;
    Ok(changed == 1)
}

pub(super) fn get(conn: &Connection, assignment_id: &str) -> AssignResult<Option<AssignmentRecord>> {
    let row = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE assignment_id=?1"),
            params![assignment_id],
            AssignmentRow::from_row,
        )
        .optional()?;
    row.map(AssignmentRow::into_record).transpose()
}

pub(super) fn list(conn: &Connection, status: Option<&str>) -> AssignResult<Vec<AssignmentRecord>> {
    let rows = match status {
        Some(status) => {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE status=?1 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt
                .query_map(params![status], AssignmentRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC, rowid ASC"))?;
            let rows = stmt
                .query_map([], AssignmentRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    rows.into_iter().map(AssignmentRow::into_record).collect()
}
