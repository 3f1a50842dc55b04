//! Workload tracker — open assignments per person versus capacity.
//!
//! Reads degrade conservatively: a store failure makes a person look
//! unavailable, never available. Writes fail loudly, because a dropped
//! audit write would let the capacity ceiling drift.

use crate::{
    assignment::AssignmentRecord,
    error::{AssignError, AssignResult},
    store::{AssignmentStore, CommitOutcome},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct WorkloadTracker {
    store: Arc<dyn AssignmentStore>,
}

impl WorkloadTracker {
    pub fn new(store: Arc<dyn AssignmentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AssignmentStore> {
        &self.store
    }

    /// Open assignments for `user_id`. Unknown ids and store errors give 0.
    pub fn get_open_count(&self, user_id: &str) -> u32 {
        self.try_open_count(user_id).unwrap_or_else(|e| {
            log::warn!("Workload read failed for {user_id}: {e}");
            0
        })
    }

    pub fn try_open_count(&self, user_id: &str) -> AssignResult<u32> {
        self.store.open_count(user_id)
    }

    /// `open < max_concurrent`. Unknown capacity means no capacity, and a
    /// failed read means unavailable.
    pub fn has_capacity(&self, user_id: &str, max_concurrent: Option<u32>) -> bool {
        let Some(max) = max_concurrent else {
            return false;
        };
        match self.store.open_count(user_id) {
            Ok(open) => open < max,
            Err(e) => {
                log::warn!("Capacity check failed for {user_id}, treating as unavailable: {e}");
                false
            }
        }
    }

    /// Commit an OPEN assignment under its selectee's ceiling.
    /// Returns the selectee's open count including the new assignment.
    pub fn record_open(
        &self,
        record: &AssignmentRecord,
        max_concurrent: Option<u32>,
    ) -> AssignResult<u32> {
        let max = max_concurrent.unwrap_or(0);
        match self.store.open_with_ceiling(record, max)? {
            CommitOutcome::Committed { open_after } => {
                log::info!(
                    "Opened {} for {} ({open_after}/{max})",
                    record.assignment_id,
                    record.selected_user_id
                );
                Ok(open_after)
            }
            CommitOutcome::AtCapacity { open } => Err(AssignError::CapacityExceeded {
                user_id: record.selected_user_id.clone(),
                open,
                max,
            }),
        }
    }

    /// Close an assignment. `Ok(false)` when the id is unknown or the
    /// assignment is already closed; the count is never decremented twice.
    pub fn record_closed(&self, assignment_id: &str, at: DateTime<Utc>) -> AssignResult<bool> {
        let closed = self.store.close(assignment_id, at)?;
        if closed {
            log::info!("Closed {assignment_id}");
        } else {
            log::debug!("Close of {assignment_id} ignored: unknown or already closed");
        }
        Ok(closed)
    }
}
