//! Candidate matcher — who may receive a ticket at all.
//!
//! Two filters, applied in order, roster order preserved:
//!   1. Skill: the ticket subcategory equals or is a substring of one of
//!      the person's tags. An empty subcategory lets everyone through.
//!   2. Capacity: the workload tracker must report a free slot.
//!
//! An empty result always carries a cause so callers can tell
//! "nobody knows this" from "everybody is busy".

use crate::{roster::Person, ticket::Ticket, workload::WorkloadTracker};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoCandidatesCause {
    EmptyRoster,
    NoSkillMatch,
    AllAtCapacity,
}

impl std::fmt::Display for NoCandidatesCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NoCandidatesCause::EmptyRoster => "empty roster",
            NoCandidatesCause::NoSkillMatch => "no skill match",
            NoCandidatesCause::AllAtCapacity => "all at capacity",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillMatch {
    Exact,
    Partial,
    None,
}

/// Compare a lowercased subcategory against a person's tags.
/// Exact beats partial; an empty subcategory matches nothing.
pub fn skill_match(subcategory_key: &str, skills: &[String]) -> SkillMatch {
    if subcategory_key.is_empty() {
        return SkillMatch::None;
    }
    if skills.iter().any(|s| s == subcategory_key) {
        SkillMatch::Exact
    } else if skills.iter().any(|s| s.contains(subcategory_key)) {
        SkillMatch::Partial
    } else {
        SkillMatch::None
    }
}

/// Matcher output: the eligible people plus enough counts to explain
/// an empty result.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub candidates: Vec<Person>,
    pub roster_size: usize,
    /// People who passed the skill filter, before the capacity filter.
    pub skill_matched: usize,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn empty_cause(&self) -> Option<NoCandidatesCause> {
        if !self.candidates.is_empty() {
            None
        } else if self.roster_size == 0 {
            Some(NoCandidatesCause::EmptyRoster)
        } else if self.skill_matched == 0 {
            Some(NoCandidatesCause::NoSkillMatch)
        } else {
            Some(NoCandidatesCause::AllAtCapacity)
        }
    }
}

pub struct CandidateMatcher {
    tracker: WorkloadTracker,
}

impl CandidateMatcher {
    pub fn new(tracker: WorkloadTracker) -> Self {
        Self { tracker }
    }

    pub fn find_candidates(&self, ticket: &Ticket, roster: &[Person]) -> CandidateSet {
        let key = ticket.subcategory_key();
        let skilled: Vec<&Person> = roster
            .iter()
            .filter(|p| passes_skill_filter(&key, p))
            .collect();
        let skill_matched = skilled.len();

        let candidates: Vec<Person> = skilled
            .into_iter()
            .filter(|p| self.tracker.has_capacity(&p.user_id, p.max_concurrent))
            .cloned()
            .collect();

        log::debug!(
            "Matcher '{key}': {} roster, {skill_matched} skilled, {} with capacity",
            roster.len(),
            candidates.len()
        );
        CandidateSet {
            candidates,
            roster_size: roster.len(),
            skill_matched,
        }
    }

    /// Human-readable summary of how many people can take new work.
    pub fn get_availability_message(&self, roster: &[Person]) -> String {
        let total = roster.len();
        let available = roster
            .iter()
            .filter(|p| self.tracker.has_capacity(&p.user_id, p.max_concurrent))
            .count();
        if available == 0 {
            "No persons are free to assign. All team members are at max capacity.".to_string()
        } else {
            format!("{available} of {total} team members available for assignment.")
        }
    }

    /// Message for an empty candidate set, specific to its cause.
    pub fn describe_empty(&self, ticket: &Ticket, set: &CandidateSet, roster: &[Person]) -> String {
        match set.empty_cause() {
            Some(NoCandidatesCause::EmptyRoster) => "The roster is empty.".to_string(),
            Some(NoCandidatesCause::NoSkillMatch) => format!(
                "No team member lists a skill matching '{}'.",
                ticket.subcategory
            ),
            Some(NoCandidatesCause::AllAtCapacity) => format!(
                "{} team member(s) match '{}' but all are at max capacity. {}",
                set.skill_matched,
                ticket.subcategory,
                self.get_availability_message(roster)
            ),
            None => String::new(),
        }
    }
}

/// A person with no skills never passes, unless the ticket has no
/// subcategory, in which case the filter is skipped.
pub fn passes_skill_filter(subcategory_key: &str, person: &Person) -> bool {
    subcategory_key.is_empty() || skill_match(subcategory_key, &person.skills) != SkillMatch::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substring_match_is_partial() {
        assert_eq!(skill_match("database", &tags(&["database-oracle"])), SkillMatch::Partial);
        assert_eq!(skill_match("database", &tags(&["db", "database"])), SkillMatch::Exact);
        assert_eq!(skill_match("network", &tags(&["storage"])), SkillMatch::None);
        assert_eq!(skill_match("network", &[]), SkillMatch::None);
    }

    #[test]
    fn empty_subcategory_skips_skill_filter() {
        let person = Person::new("u1", &[], false, Some(1));
        assert!(passes_skill_filter("", &person));
        assert!(!passes_skill_filter("network", &person));
    }
}
