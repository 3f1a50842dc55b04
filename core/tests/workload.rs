//! Workload tracker tests.
//!
//! Covers: the capacity ceiling on commit, closure freeing a slot,
//! idempotent close, and conservative degradation when the store fails.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use triage_core::{
    assignment::{AssignmentAction, AssignmentRecord},
    error::{AssignError, AssignResult},
    event::EventLogEntry,
    recommendation::AgentMethod,
    store::{AssignmentStore, CommitOutcome, MemoryStore},
    ticket::{Priority, Ticket},
    workload::WorkloadTracker,
};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 4, 15, 0).unwrap()
}

fn record_for(user_id: &str) -> AssignmentRecord {
    let ticket = Ticket::new("Database", Priority::P2, Some("2024-06-03T09:45:00+05:30"));
    AssignmentRecord::open(
        &ticket,
        Some(user_id.to_string()),
        80,
        user_id,
        AssignmentAction::Accept,
        "test".into(),
        AgentMethod::ScoreBased,
        at(),
    )
}

fn tracker() -> WorkloadTracker {
    WorkloadTracker::new(Arc::new(MemoryStore::new()))
}

#[test]
fn commit_refused_at_ceiling() {
    let t = tracker();
    assert_eq!(t.record_open(&record_for("u1"), Some(2)).unwrap(), 1);
    assert_eq!(t.record_open(&record_for("u1"), Some(2)).unwrap(), 2);

    match t.record_open(&record_for("u1"), Some(2)) {
        Err(AssignError::CapacityExceeded { user_id, open, max }) => {
            assert_eq!(user_id, "u1");
            assert_eq!(open, 2);
            assert_eq!(max, 2);
        }
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }
    assert_eq!(t.get_open_count("u1"), 2, "rejected commit must not be written");
    assert!(!t.has_capacity("u1", Some(2)));
}

#[test]
fn closing_frees_a_slot() {
    let t = tracker();
    let first = record_for("u1");
    t.record_open(&first, Some(1)).unwrap();
    assert!(!t.has_capacity("u1", Some(1)));

    assert!(t.record_closed(&first.assignment_id, at()).unwrap());
    assert_eq!(t.get_open_count("u1"), 0);
    assert!(t.has_capacity("u1", Some(1)));
    assert_eq!(t.record_open(&record_for("u1"), Some(1)).unwrap(), 1);
}

#[test]
fn close_is_idempotent() {
    let t = tracker();
    let a = record_for("u1");
    let b = record_for("u1");
    t.record_open(&a, Some(5)).unwrap();
    t.record_open(&b, Some(5)).unwrap();

    assert!(t.record_closed(&a.assignment_id, at()).unwrap());
    assert!(!t.record_closed(&a.assignment_id, at()).unwrap());
    assert_eq!(t.get_open_count("u1"), 1, "second close must not decrement again");

    assert!(!t.record_closed("ASSIGN_unknown", at()).unwrap());
}

#[test]
fn counts_are_per_person() {
    let t = tracker();
    t.record_open(&record_for("u1"), Some(3)).unwrap();
    t.record_open(&record_for("u2"), Some(3)).unwrap();
    t.record_open(&record_for("u2"), Some(3)).unwrap();
    assert_eq!(t.get_open_count("u1"), 1);
    assert_eq!(t.get_open_count("u2"), 2);
    assert_eq!(t.get_open_count("nobody"), 0);
}

#[test]
fn unknown_capacity_is_never_available() {
    let t = tracker();
    assert!(!t.has_capacity("u1", None));
    assert!(!t.has_capacity("u1", Some(0)));
    assert!(matches!(
        t.record_open(&record_for("u1"), None),
        Err(AssignError::CapacityExceeded { open: 0, max: 0, .. })
    ));
}

// ── Store failure ───────────────────────────────────────────────────

struct DownStore;

fn down<T>() -> AssignResult<T> {
    Err(AssignError::Other(anyhow::anyhow!("store offline")))
}

impl AssignmentStore for DownStore {
    fn open_count(&self, _user_id: &str) -> AssignResult<u32> {
        down()
    }
    fn open_with_ceiling(&self, _r: &AssignmentRecord, _max: u32) -> AssignResult<CommitOutcome> {
        down()
    }
    fn close(&self, _id: &str, _at: DateTime<Utc>) -> AssignResult<bool> {
        down()
    }
    fn get(&self, _id: &str) -> AssignResult<Option<AssignmentRecord>> {
        down()
    }
    fn all_assignments(&self) -> AssignResult<Vec<AssignmentRecord>> {
        down()
    }
    fn append_event(&self, _entry: &EventLogEntry) -> AssignResult<()> {
        down()
    }
    fn events(&self) -> AssignResult<Vec<EventLogEntry>> {
        down()
    }
}

#[test]
fn failed_reads_mean_unavailable() {
    let t = WorkloadTracker::new(Arc::new(DownStore));
    assert!(!t.has_capacity("u1", Some(10)));
    assert_eq!(t.get_open_count("u1"), 0);
    assert!(t.try_open_count("u1").is_err());
}

#[test]
fn failed_writes_propagate() {
    let t = WorkloadTracker::new(Arc::new(DownStore));
    let err = t.record_open(&record_for("u1"), Some(10)).unwrap_err();
    assert!(matches!(err, AssignError::Other(_)), "got {err:?}");
    assert!(t.record_closed("x", at()).is_err());
}
