//! Assignment persistence.
//!
//! RULE: Only store/ talks to the database.
//! The workload tracker and the agent call AssignmentStore methods —
//! they never execute SQL directly.
//!
//! The capacity ceiling is enforced here: `open_with_ceiling` counts and
//! inserts as one atomic unit, so two callers racing for a person's last
//! slot cannot both commit.

mod assignment;
mod audit;
mod memory;

pub use memory::MemoryStore;

use crate::{
    assignment::{AssignmentRecord, AssignmentStats},
    error::{AssignError, AssignResult},
    event::EventLogEntry,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Result of an attempt to open an assignment under a capacity ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written. `open_after` includes the new assignment.
    Committed { open_after: u32 },
    /// Nothing written; the person already holds `open` assignments.
    AtCapacity { open: u32 },
}

/// Audit and workload storage. Backends are interchangeable.
pub trait AssignmentStore: Send + Sync {
    /// Number of OPEN assignments held by `user_id`. Unknown ids have 0.
    fn open_count(&self, user_id: &str) -> AssignResult<u32>;

    /// Insert `record` only if its selectee holds fewer than
    /// `max_concurrent` OPEN assignments. Check and insert are atomic.
    fn open_with_ceiling(
        &self,
        record: &AssignmentRecord,
        max_concurrent: u32,
    ) -> AssignResult<CommitOutcome>;

    /// OPEN → CLOSED. Returns false for unknown or already-closed ids.
    fn close(&self, assignment_id: &str, closed_at: DateTime<Utc>) -> AssignResult<bool>;

    fn get(&self, assignment_id: &str) -> AssignResult<Option<AssignmentRecord>>;

    /// Full history, oldest first.
    fn all_assignments(&self) -> AssignResult<Vec<AssignmentRecord>>;

    fn append_event(&self, entry: &EventLogEntry) -> AssignResult<()>;

    /// Full audit log, in insertion order.
    fn events(&self) -> AssignResult<Vec<EventLogEntry>>;

    fn open_assignments(&self) -> AssignResult<Vec<AssignmentRecord>> {
        Ok(self
            .all_assignments()?
            .into_iter()
            .filter(|r| r.is_open())
            .collect())
    }

    fn statistics(&self) -> AssignResult<AssignmentStats> {
        Ok(AssignmentStats::from_records(&self.all_assignments()?))
    }
}

// ── SQLite backend ──────────────────────────────────────────────────

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SqliteStore {
    pub fn open(path: &str) -> AssignResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AssignResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Open and migrate in one step.
    pub fn open_migrated(path: &str) -> AssignResult<Self> {
        let store = if path == ":memory:" {
            Self::in_memory()?
        } else {
            Self::open(path)?
        };
        store.migrate()?;
        Ok(store)
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    pub fn reopen(&self) -> AssignResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AssignResult<()> {
        self.conn()?
            .execute_batch(include_str!("../../../migrations/001_assignments.sql"))?;
        Ok(())
    }

    fn conn(&self) -> AssignResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AssignError::Other(anyhow::anyhow!("store connection mutex poisoned")))
    }
}

impl AssignmentStore for SqliteStore {
    fn open_count(&self, user_id: &str) -> AssignResult<u32> {
        let conn = self.conn()?;
        assignment::open_count(&conn, user_id)
    }

    fn open_with_ceiling(
        &self,
        record: &AssignmentRecord,
        max_concurrent: u32,
    ) -> AssignResult<CommitOutcome> {
        let mut conn = self.conn()?;
        assignment::open_with_ceiling(&mut conn, record, max_concurrent)
    }

    fn close(&self, assignment_id: &str, closed_at: DateTime<Utc>) -> AssignResult<bool> {
        let conn = self.conn()?;
        assignment::close(&conn, assignment_id, closed_at)
    }

    fn get(&self, assignment_id: &str) -> AssignResult<Option<AssignmentRecord>> {
        let conn = self.conn()?;
        assignment::get(&conn, assignment_id)
    }

    fn all_assignments(&self) -> AssignResult<Vec<AssignmentRecord>> {
        let conn = self.conn()?;
        assignment::list(&conn, None)
    }

    fn open_assignments(&self) -> AssignResult<Vec<AssignmentRecord>> {
        let conn = self.conn()?;
        assignment::list(&conn, Some("OPEN"))
    }

    fn append_event(&self, entry: &EventLogEntry) -> AssignResult<()> {
        let conn = self.conn()?;
        audit::append_event(&conn, entry)
    }

    fn events(&self) -> AssignResult<Vec<EventLogEntry>> {
        let conn = self.conn()?;
        audit::events(&conn)
    }
}
