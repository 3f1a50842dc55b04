//! Ticket records and the Ticket value type.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Urgency class. Declaration order is urgency order: P1 sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
    Unknown,
}

impl Priority {
    /// Accepts "P1".."P4", bare "1".."4" and ticketing-system forms
    /// such as "2 - High".
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        let rest = upper.strip_prefix('P').unwrap_or(&upper);
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        match digits.as_str() {
            "1" => Priority::P1,
            "2" => Priority::P2,
            "3" => Priority::P3,
            "4" => Priority::P4,
            _ => Priority::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
            Priority::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One ticket row as it arrives from a source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketRecord {
    pub short_description: String,
    pub description: String,
    pub category: String,
    pub subcategory: String,
    pub priority: String,
    pub opened_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub short_description: String,
    pub description: String,
    pub category: String,
    pub subcategory: String,
    pub priority: Priority,
    /// Kept raw; shift scoring parses it and tolerates garbage.
    pub opened_at: Option<String>,
}

impl Ticket {
    pub fn from_record(record: &TicketRecord) -> Self {
        Self {
            short_description: record.short_description.trim().to_string(),
            description: record.description.trim().to_string(),
            category: record.category.trim().to_string(),
            subcategory: record.subcategory.trim().to_string(),
            priority: Priority::parse(&record.priority),
            opened_at: record
                .opened_at
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn new(subcategory: &str, priority: Priority, opened_at: Option<&str>) -> Self {
        Self {
            short_description: String::new(),
            description: String::new(),
            category: String::new(),
            subcategory: subcategory.to_string(),
            priority,
            opened_at: opened_at.map(String::from),
        }
    }

    /// Lowercased subcategory used for skill matching. Empty means "any".
    pub fn subcategory_key(&self) -> String {
        self.subcategory.trim().to_lowercase()
    }

    /// Parsed opened_at. `None` when absent; `Some(Err)` when present but unreadable.
    pub fn opened_at_utc(&self) -> Option<Result<DateTime<Utc>, String>> {
        self.opened_at.as_deref().map(parse_timestamp)
    }
}

/// Parse an ISO-ish timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognised timestamp '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_accepts_ticketing_forms() {
        assert_eq!(Priority::parse("P1"), Priority::P1);
        assert_eq!(Priority::parse("p3"), Priority::P3);
        assert_eq!(Priority::parse("2 - High"), Priority::P2);
        assert_eq!(Priority::parse("4"), Priority::P4);
        assert_eq!(Priority::parse("P5"), Priority::Unknown);
        assert_eq!(Priority::parse(""), Priority::Unknown);
        assert!(Priority::P1 < Priority::P4);
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let a = parse_timestamp("2025-03-01 18:00:00").unwrap();
        let b = parse_timestamp("2025-03-01T18:00:00Z").unwrap();
        let c = parse_timestamp("2025-03-01T23:30:00+05:30").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
