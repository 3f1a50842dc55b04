//! Roster records and the Person value type.
//!
//! Raw roster rows are loosely typed (spreadsheet exports, REST payloads).
//! Every field gets an explicit default when it cannot be parsed:
//!   - skills        → empty set, the person never matches a subcategory
//!   - shift bounds  → None, the person is always on shift
//!   - on_call       → false
//!   - max_concurrent→ None, the person is never available

use crate::{
    error::{AssignError, AssignResult},
    types::UserId,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One roster row as it arrives from a source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterRecord {
    pub user_id: Value,
    pub group: Option<Value>,
    #[serde(alias = "skills_csv")]
    pub skills: Option<Value>,
    pub shift_start: Option<Value>,
    pub shift_end: Option<Value>,
    pub on_call: Option<Value>,
    pub max_concurrent: Option<Value>,
}

/// A staff member, parsed and ready for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub user_id: UserId,
    pub group: String,
    /// Lowercase tags, de-duplicated, in roster order.
    pub skills: Vec<String>,
    pub shift_start: Option<NaiveTime>,
    pub shift_end: Option<NaiveTime>,
    pub on_call: bool,
    pub max_concurrent: Option<u32>,
}

impl Person {
    pub fn from_record(record: &RosterRecord) -> AssignResult<Self> {
        let Some(user_id) = value_text(&record.user_id) else {
            return Err(AssignError::InvalidRecord {
                reason: format!("roster row without usable user_id ({})", record.user_id),
            });
        };
        let user_id = user_id.as_str();

        let shift_start_raw = record.shift_start.as_ref().and_then(value_text);
        let shift_end_raw = record.shift_end.as_ref().and_then(value_text);
        let shift_start = shift_start_raw.as_deref().and_then(parse_shift_time);
        let shift_end = shift_end_raw.as_deref().and_then(parse_shift_time);
        if (shift_start_raw.is_some() && shift_start.is_none())
            || (shift_end_raw.is_some() && shift_end.is_none())
        {
            log::warn!("Unparseable shift for {user_id}, treating as always on shift");
        }

        let max_concurrent = record.max_concurrent.as_ref().and_then(parse_capacity);
        if max_concurrent.is_none() {
            log::warn!("No usable max_concurrent for {user_id}, treating as zero capacity");
        }

        Ok(Self {
            user_id: user_id.to_string(),
            group: record.group.as_ref().and_then(value_text).unwrap_or_default(),
            skills: record
                .skills
                .as_ref()
                .map(parse_skills_value)
                .unwrap_or_default(),
            shift_start,
            shift_end,
            on_call: record.on_call.as_ref().map(parse_flag).unwrap_or(false),
            max_concurrent,
        })
    }

    /// Display name used in recommendation output.
    pub fn display_name(&self) -> String {
        format!("User_{}", self.user_id)
    }

    /// Shorthand for tests and fixtures.
    pub fn new(user_id: &str, skills: &[&str], on_call: bool, max_concurrent: Option<u32>) -> Self {
        Self {
            user_id: user_id.to_string(),
            group: String::new(),
            skills: skills.iter().map(|s| s.trim().to_lowercase()).collect(),
            shift_start: None,
            shift_end: None,
            on_call,
            max_concurrent,
        }
    }

    pub fn with_shift(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.shift_start = Some(start);
        self.shift_end = Some(end);
        self
    }
}

/// Parse every row, dropping (and logging) rows without an identity.
pub fn people_from_records(records: &[RosterRecord]) -> Vec<Person> {
    records
        .iter()
        .filter_map(|r| match Person::from_record(r) {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("Skipping roster row: {e}");
                None
            }
        })
        .collect()
}

pub fn find_person<'a>(roster: &'a [Person], user_id: &str) -> Option<&'a Person> {
    roster.iter().find(|p| p.user_id == user_id)
}

// ── Field parsers ───────────────────────────────────────────────────

pub fn parse_skills(csv: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in csv.split(',') {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Skills as a comma-separated string or a JSON array of tags.
pub fn parse_skills_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            let joined: Vec<String> = items.iter().filter_map(value_text).collect();
            parse_skills(&joined.join(","))
        }
        other => value_text(other).map(|s| parse_skills(&s)).unwrap_or_default(),
    }
}

/// Trimmed text of a string or number cell. Blank, null, bool and
/// structured values give None.
pub fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub fn parse_shift_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// yes / true / 1 / y (any case) are on-call; everything else is not.
pub fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "yes" | "true" | "1" | "y"),
        _ => false,
    }
}

pub fn parse_capacity(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                    .and_then(|f| u32::try_from(f as u64).ok())
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skills_are_lowercased_and_deduplicated() {
        assert_eq!(
            parse_skills(" Network, database-Oracle ,network,,"),
            vec!["network".to_string(), "database-oracle".to_string()]
        );
    }

    #[test]
    fn flags_accept_yes_like_strings() {
        for v in [json!("Yes"), json!("TRUE"), json!("1"), json!("y"), json!(true), json!(1)] {
            assert!(parse_flag(&v), "{v} should be on-call");
        }
        for v in [json!("no"), json!("maybe"), json!(false), json!(0), json!(null)] {
            assert!(!parse_flag(&v), "{v} should not be on-call");
        }
    }

    #[test]
    fn capacity_rejects_garbage() {
        assert_eq!(parse_capacity(&json!(4)), Some(4));
        assert_eq!(parse_capacity(&json!("3")), Some(3));
        assert_eq!(parse_capacity(&json!(2.0)), Some(2));
        assert_eq!(parse_capacity(&json!("two")), None);
        assert_eq!(parse_capacity(&json!(-1)), None);
        assert_eq!(parse_capacity(&json!(1.5)), None);
    }

    #[test]
    fn malformed_shift_means_always_on_shift() {
        let record = RosterRecord {
            user_id: "u1".into(),
            shift_start: Some("nine-ish".into()),
            shift_end: Some("18:00".into()),
            max_concurrent: Some(json!(2)),
            ..Default::default()
        };
        let person = Person::from_record(&record).unwrap();
        assert_eq!(person.shift_start, None);
        assert_eq!(person.shift_end, NaiveTime::from_hms_opt(18, 0, 0));
    }

    #[test]
    fn row_without_user_id_is_rejected() {
        let record = RosterRecord::default();
        assert!(Person::from_record(&record).is_err());
        let blank = RosterRecord {
            user_id: json!("   "),
            ..Default::default()
        };
        assert!(Person::from_record(&blank).is_err());
    }

    #[test]
    fn numeric_cells_are_read_as_text() {
        let record: RosterRecord = serde_json::from_value(json!({
            "user_id": 1001,
            "group": 7,
            "skills": ["Database", "SQL"],
            "shift_start": "22:00",
            "shift_end": "06:00",
            "on_call": "yes",
            "max_concurrent": 2
        }))
        .unwrap();
        let person = Person::from_record(&record).unwrap();
        assert_eq!(person.user_id, "1001");
        assert_eq!(person.group, "7");
        assert_eq!(person.skills, vec!["database".to_string(), "sql".to_string()]);
        assert_eq!(person.shift_start, NaiveTime::from_hms_opt(22, 0, 0));
    }
}
