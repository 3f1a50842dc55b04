//! Audit event log queries.

use crate::{error::AssignResult, event::EventLogEntry};
use rusqlite::{params, Connection};

pub(super) fn append_event(conn: &Connection, entry: &EventLogEntry) -> AssignResult<()> {
    conn.execute(
        "INSERT INTO audit_event (event_type, assignment_id, payload, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.event_type,
            entry.assignment_id,
            entry.payload,
            entry.created_at,
        ],
    )?;
    Ok(())
}

pub(super) fn events(conn: &Connection) -> AssignResult<Vec<EventLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, event_type, assignment_id, payload, created_at
         FROM audit_event ORDER BY id ASC",
    )?;
    let entries = stmt
        .query_map([], |row| {
            Ok(EventLogEntry {
                id: Some(row.get(0)?),
                event_type: row.get(1)?,
                assignment_id: row.get(2)?,
                payload: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}
