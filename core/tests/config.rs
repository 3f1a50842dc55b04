//! Engine configuration tests: file loading with partial keys, validation,
//! and scoring behaviour under tuned constants.

use chrono::NaiveTime;
use std::{fs, sync::Arc};
use triage_core::{
    agent::AssignmentAgent,
    config::{EngineConfig, MAX_SCORE_CONSTANT},
    roster::Person,
    scorer::{oncall_score, shift_score, Scorer},
    store::MemoryStore,
    ticket::{Priority, Ticket},
    workload::WorkloadTracker,
};

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn write_config(dir: &std::path::Path, body: &str) {
    let path = dir.join("config/engine.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn scorer(config: EngineConfig) -> Scorer {
    Scorer::new(config, Some(WorkloadTracker::new(Arc::new(MemoryStore::new()))))
}

#[test]
fn partial_file_keeps_defaults_for_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        r#"{ "top_k": 5, "priority_boosts": [["P1", 100], ["P2", 10]], "skill_score_partial": 45 }"#,
    );

    let config = EngineConfig::load(dir.path().to_str().unwrap()).unwrap();
    let defaults = EngineConfig::default();
    assert_eq!(config.top_k, 5);
    assert_eq!(config.priority_boosts, vec![("P1".to_string(), 100), ("P2".to_string(), 10)]);
    assert_eq!(config.skill_score_partial, 45);
    assert_eq!(config.oncall_base, defaults.oncall_base);
    assert_eq!(config.skill_score_exact, defaults.skill_score_exact);
    assert_eq!(config.shift_score_neutral, defaults.shift_score_neutral);
    assert_eq!(config.reference_utc_offset_minutes, 330);
    assert_eq!(config.max_total_score(), 50 + 50 + 100 + 30 + 30);
}

#[test]
fn load_rejects_missing_unparseable_and_invalid_files() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap();
    assert!(EngineConfig::load(data_dir).is_err(), "missing file");

    write_config(dir.path(), "{ not json");
    assert!(EngineConfig::load(data_dir).is_err(), "unparseable file");

    write_config(dir.path(), r#"{ "top_k": 0 }"#);
    let err = EngineConfig::load(data_dir).unwrap_err();
    assert!(err.to_string().contains("top_k"), "got: {err}");
}

#[test]
fn validate_rejects_bad_values() {
    let cases: Vec<(&str, EngineConfig)> = vec![
        (
            "zero top_k",
            EngineConfig {
                top_k: 0,
                ..EngineConfig::default()
            },
        ),
        (
            "empty boosts",
            EngineConfig {
                priority_boosts: vec![],
                ..EngineConfig::default()
            },
        ),
        (
            "offset beyond a day",
            EngineConfig {
                reference_utc_offset_minutes: 100_000,
                ..EngineConfig::default()
            },
        ),
        (
            "offset overflowing seconds",
            EngineConfig {
                reference_utc_offset_minutes: i32::MIN,
                ..EngineConfig::default()
            },
        ),
        (
            "huge on-call base",
            EngineConfig {
                oncall_base: u32::MAX,
                ..EngineConfig::default()
            },
        ),
        (
            "huge boost",
            EngineConfig {
                priority_boosts: vec![("P1".into(), MAX_SCORE_CONSTANT + 1)],
                ..EngineConfig::default()
            },
        ),
    ];
    for (label, config) in cases {
        assert!(config.validate().is_err(), "{label}");
    }

    assert!(EngineConfig::default().validate().is_ok());
    let at_limit = EngineConfig {
        skill_score_exact: MAX_SCORE_CONSTANT,
        reference_utc_offset_minutes: -720,
        ..EngineConfig::default()
    };
    assert!(at_limit.validate().is_ok());
}

#[test]
fn unvalidated_huge_constants_saturate() {
    let config = EngineConfig {
        skill_score_exact: u32::MAX,
        oncall_base: u32::MAX,
        priority_boosts: vec![("P1".into(), u32::MAX)],
        shift_score_neutral: u32::MAX,
        ..EngineConfig::default()
    };
    assert_eq!(config.max_total_score(), u32::MAX);

    let ticket = Ticket::new("Database", Priority::P1, None);
    let person = Person::new("a", &["database"], true, Some(4));
    assert_eq!(oncall_score(&config, &ticket, &person), u32::MAX);
    let scored = scorer(config).score_one(&ticket, person);
    assert_eq!(scored.total_score, u32::MAX);
}

#[test]
fn tuned_partial_score_reorders_candidates() {
    let config = EngineConfig {
        skill_score_partial: 80,
        ..EngineConfig::default()
    };
    let ticket = Ticket::new("Database", Priority::P3, None);
    let ranked = scorer(config).score(
        &ticket,
        vec![
            Person::new("exact", &["database"], false, Some(4)),
            Person::new("partial", &["database-oracle"], false, Some(4)),
        ],
    );
    let ids: Vec<&str> = ranked.iter().map(|s| s.user_id()).collect();
    assert_eq!(ids, vec!["partial", "exact"]);
    assert_eq!(ranked[0].total_score, 80 + 20 + 30);
    assert_eq!(ranked[1].total_score, 50 + 20 + 30);
}

#[test]
fn tuned_boosts_apply_to_known_and_unknown_labels() {
    let config = EngineConfig {
        priority_boosts: vec![("P1".into(), 5), ("P2".into(), 3)],
        ..EngineConfig::default()
    };
    let on_call = Person::new("a", &[], true, Some(1));
    let p1 = Ticket::new("x", Priority::P1, None);
    let p4 = Ticket::new("x", Priority::P4, None);
    assert_eq!(oncall_score(&config, &p1, &on_call), 55);
    assert_eq!(oncall_score(&config, &p4, &on_call), 53, "unknown label takes the last boost");
    assert_eq!(config.priority_boost("p2"), 3);
}

#[test]
fn tuned_offset_moves_the_shift_window() {
    let person = Person::new("day", &[], false, Some(1)).with_shift(hm(9, 0), hm(18, 0));
    // 04:00 UTC is 09:30 at +05:30 but outside 09:00-18:00 at UTC.
    let ticket = Ticket::new("x", Priority::P3, Some("2024-06-03T04:00:00+00:00"));

    let kolkata = EngineConfig::default();
    assert_eq!(shift_score(&kolkata, &ticket, &person), 30);

    let utc = EngineConfig {
        reference_utc_offset_minutes: 0,
        shift_score_out_window: 7,
        ..EngineConfig::default()
    };
    assert!(utc.validate().is_ok());
    assert_eq!(shift_score(&utc, &ticket, &person), 7);
}

#[test]
fn on_call_person_outranks_peer_on_critical_ticket() {
    let _ = env_logger::builder().is_test(true).try_init();
    let roster = vec![
        Person::new("B", &["database"], false, Some(2)).with_shift(hm(9, 0), hm(18, 0)),
        Person::new("A", &["database"], true, Some(2)).with_shift(hm(9, 0), hm(18, 0)),
    ];
    let agent = AssignmentAgent::new(EngineConfig::default_test(), roster, Arc::new(MemoryStore::new()));
    let ticket = Ticket::new("Database", Priority::P1, Some("2024-06-03T10:15:00+05:30"));

    let report = agent.recommend(&ticket, None).unwrap();
    let a = &report.ranked[0];
    let b = &report.ranked[1];
    assert_eq!(a.user_id(), "A");
    assert_eq!(
        (a.skill_score, a.oncall_score, a.shift_score, a.availability_score),
        (50, 90, 30, 30)
    );
    assert_eq!(a.total_score, 200);
    assert_eq!(b.user_id(), "B");
    assert_eq!(b.total_score, 110);
    assert_eq!(report.recommendation.entries[0].score, 100);
    assert_eq!(report.recommendation.entries[1].score, 55);
}
