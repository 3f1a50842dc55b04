//! In-process backend. One mutex guards all state, which makes
//! `open_with_ceiling` atomic by construction.

use super::{AssignmentStore, CommitOutcome};
use crate::{
    assignment::{AssignmentRecord, AssignmentStatus},
    error::{AssignError, AssignResult},
    event::EventLogEntry,
};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    assignments: Vec<AssignmentRecord>,
    events: Vec<EventLogEntry>,
}

impl MemoryState {
    fn open_count(&self, user_id: &str) -> u32 {
        let n = self
            .assignments
            .iter()
            .filter(|a| a.selected_user_id == user_id && a.is_open())
            .count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> AssignResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AssignError::Other(anyhow::anyhow!("memory store mutex poisoned")))
    }
}

impl AssignmentStore for MemoryStore {
    fn open_count(&self, user_id: &str) -> AssignResult<u32> {
        Ok(self.state()?.open_count(user_id))
    }

    fn open_with_ceiling(
        &self,
        record: &AssignmentRecord,
        max_concurrent: u32,
    ) -> AssignResult<CommitOutcome> {
        let mut state = self.state()?;
        if state
            .assignments
            .iter()
            .any(|a| a.assignment_id == record.assignment_id)
        {
            return Err(AssignError::InvalidRecord {
                reason: format!("duplicate assignment id {}", record.assignment_id),
            });
        }
        let open = state.open_count(&record.selected_user_id);
        if open >= max_concurrent {
            return Ok(CommitOutcome::AtCapacity { open });
        }
        state.assignments.push(record.clone());
        Ok(CommitOutcome::Committed { open_after: open + 1 })
    }

    fn close(&self, assignment_id: &str, closed_at: DateTime<Utc>) -> AssignResult<bool> {
        let mut state = self.state()?;
        match state
            .assignments
            .iter_mut()
            .find(|a| a.assignment_id == assignment_id && a.is_open())
        {
            Some(a) => {
                a.status = AssignmentStatus::Closed;
                a.closed_at = Some(closed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get(&self, assignment_id: &str) -> AssignResult<Option<AssignmentRecord>> {
        Ok(self
            .state()?
            .assignments
            .iter()
            .find(|a| a.assignment_id == assignment_id)
            .cloned())
    }

    fn all_assignments(&self) -> AssignResult<Vec<AssignmentRecord>> {
        Ok(self.state()?.assignments.clone())
    }

    fn append_event(&self, entry: &EventLogEntry) -> AssignResult<()> {
        let mut state = self.state()?;
        let mut entry = entry.clone();
        entry.id = Some(state.events.len() as i64 + 1);
        state.events.push(entry);
        Ok(())
    }

    fn events(&self) -> AssignResult<Vec<EventLogEntry>> {
        Ok(self.state()?.events.clone())
    }
}
