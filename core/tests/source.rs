//! Roster and ticket source tests: loosely typed JSON rows in, parsed
//! Person / Ticket values out.

use chrono::NaiveTime;
use std::fs;
use triage_core::{
    roster::RosterRecord,
    source::{JsonFileSource, RosterSource, StaticSource, TicketSource},
    ticket::{Priority, TicketRecord},
};

fn write(dir: &std::path::Path, rel: &str, body: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

#[test]
fn json_roster_fields_are_normalised() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "roster/roster.json",
        r#"{ "roster": [
            { "user_id": "1001", "group": "DBA", "skills": " Database, SQL ,database",
              "shift_start": "22:00", "shift_end": "06:00", "on_call": "Yes", "max_concurrent": "4" },
            { "user_id": "1002", "skills_csv": "network", "shift_start": "late",
              "on_call": 1, "max_concurrent": 2.0 },
            { "user_id": "1003", "on_call": "nope", "max_concurrent": "n/a" },
            { "user_id": "  ", "skills": "database" }
        ] }"#,
    );

    let source = JsonFileSource::new(dir.path().to_str().unwrap());
    let people = source.people().unwrap();
    assert_eq!(people.len(), 3, "row without user_id is dropped");

    let a = &people[0];
    assert_eq!(a.skills, vec!["database", "sql"]);
    assert_eq!(a.group, "DBA");
    assert_eq!(a.shift_start, NaiveTime::from_hms_opt(22, 0, 0));
    assert_eq!(a.shift_end, NaiveTime::from_hms_opt(6, 0, 0));
    assert!(a.on_call);
    assert_eq!(a.max_concurrent, Some(4));

    let b = &people[1];
    assert_eq!(b.skills, vec!["network"]);
    assert_eq!(b.shift_start, None, "unparseable shift means always on shift");
    assert!(b.on_call);
    assert_eq!(b.max_concurrent, Some(2));

    let c = &people[2];
    assert!(c.skills.is_empty());
    assert!(!c.on_call);
    assert_eq!(c.max_concurrent, None);
}

#[test]
fn numeric_user_id_does_not_sink_the_roster() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "roster/roster.json",
        r#"{ "roster": [
            { "user_id": "1001", "skills": "database", "max_concurrent": 3 },
            { "user_id": 1002, "skills": ["Database", "SQL"], "shift_start": 900,
              "on_call": true, "max_concurrent": 2 },
            "not a row",
            { "user_id": "1004", "on_call": { "nested": true }, "max_concurrent": 1 }
        ] }"#,
    );

    let records = JsonFileSource::new(dir.path().to_str().unwrap()).load_roster().unwrap();
    assert_eq!(records.len(), 3, "non-object row is skipped");

    let people = JsonFileSource::new(dir.path().to_str().unwrap()).people().unwrap();
    let ids: Vec<&str> = people.iter().map(|p| p.user_id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1002", "1004"]);

    let numeric = &people[1];
    assert_eq!(numeric.skills, vec!["database", "sql"]);
    assert_eq!(numeric.shift_start, None, "numeric shift is unparseable");
    assert!(numeric.on_call);
    assert_eq!(numeric.max_concurrent, Some(2));

    assert!(!people[2].on_call);
}

#[test]
fn json_tickets_parse_priority_forms() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "tickets/tickets.json",
        r#"{ "tickets": [
            { "short_description": " DB down ", "subcategory": "Database",
              "priority": "1 - Critical", "opened_at": "2024-06-03T10:15:00+05:30" },
            { "subcategory": "Network", "priority": "P3", "opened_at": "" },
            { "priority": "urgent" }
        ] }"#,
    );

    let tickets = JsonFileSource::new(dir.path().to_str().unwrap()).tickets().unwrap();
    assert_eq!(tickets.len(), 3);
    assert_eq!(tickets[0].priority, Priority::P1);
    assert_eq!(tickets[0].short_description, "DB down");
    assert!(tickets[0].opened_at_utc().unwrap().is_ok());
    assert_eq!(tickets[1].priority, Priority::P3);
    assert_eq!(tickets[1].opened_at, None, "blank opened_at is absent");
    assert_eq!(tickets[2].priority, Priority::Unknown);
    assert_eq!(tickets[2].subcategory_key(), "");
}

#[test]
fn missing_files_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let source = JsonFileSource::new(dir.path().to_str().unwrap());
    assert!(source.people().is_err());
    assert!(source.tickets().is_err());
}

#[test]
fn static_source_serves_rows() {
    let source = StaticSource {
        roster: vec![RosterRecord {
            user_id: "u1".into(),
            skills: Some("storage".into()),
            ..RosterRecord::default()
        }],
        tickets: vec![TicketRecord {
            subcategory: "Storage".into(),
            priority: "4".into(),
            ..TicketRecord::default()
        }],
    };
    let people = source.people().unwrap();
    assert_eq!(people[0].skills, vec!["storage"]);
    assert_eq!(people[0].max_concurrent, None);
    assert_eq!(source.tickets().unwrap()[0].priority, Priority::P4);
}
