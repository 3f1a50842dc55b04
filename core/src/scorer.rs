//! Scorer — deterministic ranking of matched candidates.
//!
//! total = skill + on-call + shift + availability
//!
//! Each sub-score is a pure function of (config, ticket, person, workload)
//! and can be tested on its own. Ranking is a stable sort on the total,
//! so equal totals keep matcher (roster) order.

use crate::{
    config::EngineConfig,
    matcher::{skill_match, SkillMatch},
    roster::Person,
    ticket::Ticket,
    workload::WorkloadTracker,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub const AVAILABILITY_SCORE_MAX: u32 = 30;

// Remaining-capacity ratio tiers: (minimum ratio, score).
const RATIO_TIERS: &[(f64, u32)] = &[(0.5, 30), (0.25, 20)];
const RATIO_ANY_LEFT: u32 = 10;

// Declared-capacity tiers, used when workload tracking is unavailable.
const CAPACITY_TIERS: &[(u32, u32)] = &[(10, 30), (5, 20), (3, 10)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub person: Person,
    pub skill_score: u32,
    pub oncall_score: u32,
    pub shift_score: u32,
    pub availability_score: u32,
    pub total_score: u32,
    /// Workload seen while scoring; None if tracking was unavailable.
    pub open_count: Option<u32>,
}

impl ScoredCandidate {
    pub fn user_id(&self) -> &str {
        &self.person.user_id
    }
}

// ── Sub-scores ──────────────────────────────────────────────────────

pub fn skill_score(config: &EngineConfig, ticket: &Ticket, person: &Person) -> u32 {
    match skill_match(&ticket.subcategory_key(), &person.skills) {
        SkillMatch::Exact => config.skill_score_exact,
        SkillMatch::Partial => config.skill_score_partial,
        SkillMatch::None => 0,
    }
}

pub fn oncall_score(config: &EngineConfig, ticket: &Ticket, person: &Person) -> u32 {
    if !person.on_call {
        return 0;
    }
    config
        .oncall_base
        .saturating_add(config.priority_boost(ticket.priority.label()))
}

pub fn shift_score(config: &EngineConfig, ticket: &Ticket, person: &Person) -> u32 {
    let opened = match ticket.opened_at_utc() {
        None => return config.shift_score_neutral,
        Some(Ok(t)) => t,
        Some(Err(e)) => {
            log::debug!("Shift check for {}: {e}; assuming in window", person.user_id);
            return config.shift_score_in_window;
        }
    };
    let (Some(start), Some(end)) = (person.shift_start, person.shift_end) else {
        return config.shift_score_in_window;
    };
    let local = opened.with_timezone(&config.reference_offset()).time();
    if in_shift_window(start, end, local) {
        config.shift_score_in_window
    } else {
        config.shift_score_out_window
    }
}

/// Inclusive window test. `start > end` is an overnight shift.
pub fn in_shift_window(start: NaiveTime, end: NaiveTime, t: NaiveTime) -> bool {
    if start <= end {
        start <= t && t <= end
    } else {
        t >= start || t <= end
    }
}

/// `open` is None when workload tracking is unavailable.
pub fn availability_score(config: &EngineConfig, max_concurrent: Option<u32>, open: Option<u32>) -> u32 {
    let Some(open) = open else {
        return capacity_tier_score(config, max_concurrent);
    };
    let max = match max_concurrent {
        Some(m) if m > 0 => m,
        _ => return config.availability_score_unknown,
    };
    let ratio = (max as f64 - open as f64) / max as f64;
    for (min_ratio, score) in RATIO_TIERS {
        if ratio >= *min_ratio {
            return *score;
        }
    }
    if ratio > 0.0 {
        RATIO_ANY_LEFT
    } else {
        0
    }
}

/// Score on declared capacity alone.
pub fn capacity_tier_score(config: &EngineConfig, max_concurrent: Option<u32>) -> u32 {
    let Some(max) = max_concurrent else {
        return config.availability_score_unknown;
    };
    CAPACITY_TIERS
        .iter()
        .find(|(min, _)| max >= *min)
        .map(|(_, score)| *score)
        .unwrap_or(config.availability_score_unknown)
}

// ── Scorer ──────────────────────────────────────────────────────────

pub struct Scorer {
    config: EngineConfig,
    tracker: Option<WorkloadTracker>,
}

impl Scorer {
    pub fn new(config: EngineConfig, tracker: Option<WorkloadTracker>) -> Self {
        Self { config, tracker }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn score_one(&self, ticket: &Ticket, person: Person) -> ScoredCandidate {
        let open_count = self.tracker.as_ref().and_then(|t| {
            t.try_open_count(&person.user_id)
                .map_err(|e| {
                    log::warn!("Workload unavailable for {}, scoring on capacity: {e}", person.user_id)
                })
                .ok()
        });
        let skill = skill_score(&self.config, ticket, &person);
        let oncall = oncall_score(&self.config, ticket, &person);
        let shift = shift_score(&self.config, ticket, &person);
        let availability = availability_score(&self.config, person.max_concurrent, open_count);
        let total = skill
            .saturating_add(oncall)
            .saturating_add(shift)
            .saturating_add(availability);
        log::debug!(
            "Score {}: skill={skill} oncall={oncall} shift={shift} avail={availability} total={total}",
            person.user_id
        );
        ScoredCandidate {
            person,
            skill_score: skill,
            oncall_score: oncall,
            shift_score: shift,
            availability_score: availability,
            total_score: total,
            open_count,
        }
    }

    /// Score every candidate and sort best-first. Ties keep input order.
    pub fn score(&self, ticket: &Ticket, candidates: Vec<Person>) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|p| self.score_one(ticket, p))
            .collect();
        scored.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        scored
    }
}
