//! The assignment agent — recommendation orchestrator and decision recorder.
//!
//! PIPELINE (fixed order, per ticket):
//!   1. Matcher   — skill filter, then capacity filter
//!   2. Scorer    — deterministic totals, stable sort
//!   3. Truncate  — first top_k
//!   4. Reasoner  — optional explanations; any failure → score-based fallback
//!
//! RULES:
//!   - The reasoner never reorders; the scorer's ranking is final.
//!   - The agent holds no per-request mutable state, so `&self` calls
//!     may run concurrently from several threads.
//!   - Assignments are committed through the workload tracker only;
//!     the capacity ceiling is checked atomically with the insert.
//!   - Every decision and rejection is written to the audit log.

use crate::{
    assignment::{AssignmentAction, AssignmentRecord, AssignmentStats},
    clock::{Clock, SystemClock},
    config::EngineConfig,
    error::{AssignError, AssignResult},
    event::{DeskEvent, EventLogEntry},
    matcher::CandidateMatcher,
    reasoner::{NullReasoner, Reasoner, ReasoningError},
    recommendation::Recommendation,
    roster::{find_person, Person},
    scorer::{ScoredCandidate, Scorer},
    store::AssignmentStore,
    ticket::Ticket,
    workload::WorkloadTracker,
};
use serde::Serialize;
use std::sync::Arc;

/// Everything a human needs to decide on a ticket.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationReport {
    pub ticket: Ticket,
    /// Top-K in scorer order, with sub-scores.
    pub ranked: Vec<ScoredCandidate>,
    /// Eligible candidates before truncation.
    pub total_candidates: usize,
    pub recommendation: Recommendation,
}

pub struct AssignmentAgent {
    config: EngineConfig,
    roster: Vec<Person>,
    tracker: WorkloadTracker,
    matcher: CandidateMatcher,
    scorer: Scorer,
    reasoner: Box<dyn Reasoner>,
    clock: Arc<dyn Clock>,
}

impl AssignmentAgent {
    /// Score-based agent on the system clock. Swap parts in with
    /// `with_reasoner` / `with_clock`.
    pub fn new(config: EngineConfig, roster: Vec<Person>, store: Arc<dyn AssignmentStore>) -> Self {
        let tracker = WorkloadTracker::new(store);
        Self {
            matcher: CandidateMatcher::new(tracker.clone()),
            scorer: Scorer::new(config.clone(), Some(tracker.clone())),
            config,
            roster,
            tracker,
            reasoner: Box::new(NullReasoner),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_reasoner(mut self, reasoner: Box<dyn Reasoner>) -> Self {
        log::info!("Reasoner: {}", reasoner.name());
        self.reasoner = reasoner;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn roster(&self) -> &[Person] {
        &self.roster
    }

    pub fn tracker(&self) -> &WorkloadTracker {
        &self.tracker
    }

    /// Swap in a fresh roster snapshot.
    pub fn replace_roster(&mut self, roster: Vec<Person>) {
        log::info!("Roster replaced: {} -> {} people", self.roster.len(), roster.len());
        self.roster = roster;
    }

    // ── Recommendation ──────────────────────────────────────────────

    /// Rank the roster for `ticket`. `top_k` defaults to the configured
    /// value; `Some(0)` is rejected as an invalid request.
    pub fn recommend(&self, ticket: &Ticket, top_k: Option<usize>) -> AssignResult<RecommendationReport> {
        let top_k = match top_k {
            Some(0) => {
                return Err(AssignError::InvalidRecord {
                    reason: "top_k must be at least 1".into(),
                })
            }
            Some(k) => k,
            None => self.config.top_k,
        };

        let set = self.matcher.find_candidates(ticket, &self.roster);
        if let Some(cause) = set.empty_cause() {
            let message = self.matcher.describe_empty(ticket, &set, &self.roster);
            log::info!("No candidates for '{}' ({cause}): {message}", ticket.subcategory);
            self.emit(DeskEvent::NoCandidates {
                subcategory: ticket.subcategory.clone(),
                cause,
            });
            return Err(AssignError::NoCandidates { cause, message });
        }

        let total_candidates = set.candidates.len();
        let mut ranked = self.scorer.score(ticket, set.candidates);
        ranked.truncate(top_k);

        let recommendation = match self.reasoner.explain(ticket, &ranked) {
            Ok(r) => r,
            Err(e @ ReasoningError::Unavailable(_)) => {
                log::debug!("Reasoner '{}' unavailable, score-based: {e}", self.reasoner.name());
                Recommendation::score_based(&self.config, &ranked)
            }
            Err(e) => {
                log::warn!("Reasoner '{}' failed, using score-based fallback: {e}", self.reasoner.name());
                Recommendation::score_based(&self.config, &ranked)
            }
        };

        log::info!(
            "Recommended {:?} for '{}' {} via {}",
            recommendation.user_ids(),
            ticket.subcategory,
            ticket.priority,
            recommendation.agent_method.as_str()
        );
        self.emit(DeskEvent::RecommendationIssued {
            subcategory: ticket.subcategory.clone(),
            priority: ticket.priority.label().to_string(),
            agent_method: recommendation.agent_method,
            ranked_user_ids: recommendation.user_ids(),
        });

        Ok(RecommendationReport {
            ticket: ticket.clone(),
            ranked,
            total_candidates,
            recommendation,
        })
    }

    // ── Decisions ───────────────────────────────────────────────────

    /// Record a human decision on `report`. Picking top1 is an Accept,
    /// anyone else on the roster is an Override.
    pub fn assign(&self, report: &RecommendationReport, selected_user_id: &str) -> AssignResult<AssignmentRecord> {
        let selected_user_id = selected_user_id.trim();
        let person = find_person(&self.roster, selected_user_id).ok_or_else(|| AssignError::UnknownPerson {
            user_id: selected_user_id.to_string(),
        })?;

        let rec = &report.recommendation;
        let top1 = rec.top1();
        let action = match top1 {
            Some(t) if t.user_id == selected_user_id => AssignmentAction::Accept,
            _ => AssignmentAction::Override,
        };
        let explanation = rec
            .entries
            .iter()
            .find(|e| e.user_id == selected_user_id)
            .map(|e| e.explanation.clone())
            .unwrap_or_else(|| format!("Manual override: {selected_user_id} was not recommended"));

        let record = AssignmentRecord::open(
            &report.ticket,
            top1.map(|t| t.user_id.clone()),
            top1.map(|t| t.score).unwrap_or(0),
            selected_user_id,
            action,
            explanation,
            rec.agent_method,
            self.clock.now(),
        );

        match self.tracker.record_open(&record, person.max_concurrent) {
            Ok(open_after) => {
                self.emit(DeskEvent::AssignmentOpened {
                    assignment_id: record.assignment_id.clone(),
                    user_id: record.selected_user_id.clone(),
                    action: action.as_str().to_string(),
                    open_after,
                    max_concurrent: person.max_concurrent.unwrap_or(0),
                });
                Ok(record)
            }
            Err(err) => {
                if let AssignError::CapacityExceeded { user_id, open, max } = &err {
                    log::info!("Rejected assignment to {user_id}: {open}/{max} open");
                    self.emit(DeskEvent::CapacityRejected {
                        user_id: user_id.clone(),
                        open: *open,
                        max_concurrent: *max,
                    });
                }
                Err(err)
            }
        }
    }

    /// Close an assignment. False when unknown or already closed.
    pub fn close(&self, assignment_id: &str) -> AssignResult<bool> {
        let closed = self.tracker.record_closed(assignment_id, self.clock.now())?;
        if closed {
            self.emit(DeskEvent::AssignmentClosed {
                assignment_id: assignment_id.to_string(),
            });
        }
        Ok(closed)
    }

    pub fn statistics(&self) -> AssignResult<AssignmentStats> {
        self.tracker.store().statistics()
    }

    pub fn open_assignments(&self) -> AssignResult<Vec<AssignmentRecord>> {
        self.tracker.store().open_assignments()
    }

    pub fn availability_message(&self) -> String {
        self.matcher.get_availability_message(&self.roster)
    }

    // ── Audit ───────────────────────────────────────────────────────

    /// Append to the audit log. The assignment table is the source of
    /// truth, so a failed audit write is logged, not returned.
    fn emit(&self, event: DeskEvent) {
        let result = EventLogEntry::new(&event, self.clock.now())
            .map_err(AssignError::from)
            .and_then(|entry| self.tracker.store().append_event(&entry));
        if let Err(e) = result {
            log::error!("Audit write failed for {}: {e}", event.event_type());
        }
    }
}
