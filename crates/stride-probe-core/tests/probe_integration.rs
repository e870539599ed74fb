//! Integration tests for store resolution and the full probe run.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use stride_probe_core::storage::DataConfig;
use stride_probe_core::{
    run_probe, select_features, Config, DataResolver, DataSource, FallbackReason, MockClassifier,
    Verdict,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
}

fn resolver(db_path: PathBuf) -> DataResolver {
    let config = DataConfig {
        db_path,
        ..DataConfig::default()
    };
    DataResolver::new(&config, 20, 42, today())
}

/// `energy_logs` with the given column list and `days` rows per user.
fn create_store(path: &Path, columns: &str, users: &[&str], days: u32) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(&format!("CREATE TABLE energy_logs ({columns});"))
        .unwrap();
    let has_mood = columns.contains("mood_score");
    for &user in users {
        for day in 0..days {
            let date = format!("2024-03-{:02}", day + 1);
            let energy = 1.0 + f64::from(day % 4);
            if has_mood {
                conn.execute(
                    "INSERT INTO energy_logs
                         (user_id, log_date, energy_level, mood_score, stress_level, hours_slept)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![user, date, energy, 3.0, f64::from(day % 3), 7.5],
                )
                .unwrap();
            } else {
                conn.execute(
                    "INSERT INTO energy_logs (user_id, log_date, energy_level) VALUES (?1, ?2, ?3)",
                    params![user, date, energy],
                )
                .unwrap();
            }
        }
    }
}

const FULL_SCHEMA: &str = "user_id TEXT, log_date TEXT, energy_level REAL, mood_score REAL, \
                           stress_level REAL, hours_slept REAL, notes TEXT";

#[test]
fn store_with_enough_rows_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, FULL_SCHEMA, &["alice", "bob"], 20);

    let mut out = Vec::new();
    let data = resolver(db.clone()).resolve(&mut out).unwrap();

    assert_eq!(data.source, DataSource::Store { path: db });
    assert_eq!(data.table.len(), 40);
    assert_eq!(data.table.entity_count(), 2);
    // Seven rows per user are lost to the lag-7 window.
    assert_eq!(data.frame.len(), 26);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Loaded 40 energy log entries from 2 users"));
}

#[test]
fn null_notes_do_not_drop_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    // notes exists but stays NULL in every row.
    create_store(&db, FULL_SCHEMA, &["alice"], 30);

    let data = resolver(db).resolve(&mut Vec::new()).unwrap();
    assert!(!data.source.is_synthetic());
    assert_eq!(data.frame.len(), 23);
    let set = select_features(&data.frame).unwrap();
    assert_eq!(set.n_features(), 12);
}

#[test]
fn all_null_optional_field_empties_the_frame() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, FULL_SCHEMA, &["alice"], 30);
    let conn = Connection::open(&db).unwrap();
    conn.execute("UPDATE energy_logs SET hours_slept = NULL", []).unwrap();
    drop(conn);

    // Every row lacks hours_slept, so every engineered record is undefined.
    let data = resolver(db).resolve(&mut Vec::new()).unwrap();
    assert_eq!(
        data.source,
        DataSource::Synthetic {
            reason: FallbackReason::TooFewSamples {
                samples: 0,
                required: 20
            }
        }
    );
}

#[test]
fn schema_without_optional_columns_shrinks_features() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, "user_id TEXT, log_date TEXT, energy_level REAL", &["u"], 30);

    let data = resolver(db).resolve(&mut Vec::new()).unwrap();
    let set = select_features(&data.frame).unwrap();
    assert_eq!(
        set.columns,
        vec![
            "energy_level_lag1",
            "energy_level_lag7",
            "energy_level_rolling7",
            "day_sin",
            "day_cos",
        ]
    );
}

#[test]
fn thin_store_falls_back_to_synthetic() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, FULL_SCHEMA, &["alice"], 10);

    let mut out = Vec::new();
    let data = resolver(db).resolve(&mut out).unwrap();
    assert_eq!(
        data.source,
        DataSource::Synthetic {
            reason: FallbackReason::TooFewSamples {
                samples: 3,
                required: 20
            }
        }
    );
    assert_eq!(data.frame.len(), 193);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Insufficient real data. Falling back to synthetic data."));
}

#[test]
fn missing_table_lists_available_tables() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch("CREATE TABLE goals (id INTEGER); CREATE TABLE users (id INTEGER);")
        .unwrap();
    drop(conn);

    let mut out = Vec::new();
    let data = resolver(db).resolve(&mut out).unwrap();
    assert_eq!(
        data.source,
        DataSource::Synthetic {
            reason: FallbackReason::MissingTable {
                available: vec!["goals".into(), "users".into()]
            }
        }
    );
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Table 'energy_logs' not found. Available tables: [\"goals\", \"users\"]"));
}

#[test]
fn missing_required_column_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch("CREATE TABLE energy_logs (user_id TEXT, energy_level REAL);")
        .unwrap();
    drop(conn);

    let data = resolver(db).resolve(&mut Vec::new()).unwrap();
    assert_eq!(
        data.source,
        DataSource::Synthetic {
            reason: FallbackReason::MissingColumns {
                missing: vec!["log_date".into()]
            }
        }
    );
}

#[test]
fn empty_table_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, FULL_SCHEMA, &[], 0);

    let mut out = Vec::new();
    let data = resolver(db).resolve(&mut out).unwrap();
    assert_eq!(
        data.source,
        DataSource::Synthetic {
            reason: FallbackReason::NoRows
        }
    );
    assert!(String::from_utf8(out).unwrap().contains("No energy_logs data found."));
}

#[test]
fn recent_academic_events_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, FULL_SCHEMA, &["alice", "bob"], 20);
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch(
        "CREATE TABLE academic_events (user_id TEXT, event_date TEXT, event_type TEXT, stress_multiplier REAL);
         INSERT INTO academic_events VALUES ('alice', '2024-04-10', 'exam', 1.5);
         INSERT INTO academic_events VALUES ('bob', '2024-03-20', 'deadline', NULL);
         INSERT INTO academic_events VALUES ('bob', '2024-01-02', 'exam', 2.0);",
    )
    .unwrap();
    drop(conn);

    let data = resolver(db).resolve(&mut Vec::new()).unwrap();
    // 2024-04-15 minus 30 days is 2024-03-16.
    assert_eq!(data.events.len(), 2);
    assert!(data.events.iter().any(|e| e.event_type == "exam" && e.stress_multiplier == Some(1.5)));
}

#[test]
fn malformed_academic_events_keep_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, FULL_SCHEMA, &["alice"], 30);
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch(
        "CREATE TABLE academic_events (user_id TEXT, event_date TEXT, event_type TEXT, stress_multiplier REAL);
         INSERT INTO academic_events VALUES ('alice', '2024-04-01', 'exam', 'high');",
    )
    .unwrap();
    drop(conn);

    let data = resolver(db.clone()).resolve(&mut Vec::new()).unwrap();
    assert_eq!(data.source, DataSource::Store { path: db });
    assert_eq!(data.frame.len(), 23);
    assert_eq!(data.events.len(), 1);
    assert_eq!(data.events[0].stress_multiplier, None);
}

#[test]
fn text_typed_energy_levels_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch("CREATE TABLE energy_logs (user_id TEXT, log_date TEXT, energy_level TEXT);")
        .unwrap();
    for day in 0..30u32 {
        conn.execute(
            "INSERT INTO energy_logs VALUES ('alice', ?1, ?2)",
            params![format!("2024-03-{:02}", day + 1), (1 + day % 5).to_string()],
        )
        .unwrap();
    }
    drop(conn);

    let data = resolver(db.clone()).resolve(&mut Vec::new()).unwrap();
    assert_eq!(data.source, DataSource::Store { path: db });
    assert_eq!(data.table.len(), 30);
    assert_eq!(data.frame.len(), 23);
}

#[test]
fn energy_logs_view_is_read_like_a_table() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    let conn = Connection::open(&db).unwrap();
    conn.execute_batch(
        "CREATE TABLE daily (uid TEXT, day TEXT, energy REAL, mood REAL);
         CREATE VIEW energy_logs AS
             SELECT uid AS user_id, day AS log_date, energy AS energy_level, mood AS mood_score
             FROM daily;",
    )
    .unwrap();
    for day in 0..30u32 {
        conn.execute(
            "INSERT INTO daily VALUES ('alice', ?1, ?2, 3.0)",
            params![format!("2024-03-{:02}", day + 1), f64::from(1 + day % 4)],
        )
        .unwrap();
    }
    drop(conn);

    let mut out = Vec::new();
    let data = resolver(db.clone()).resolve(&mut out).unwrap();
    assert_eq!(data.source, DataSource::Store { path: db });
    assert_eq!(data.frame.len(), 23);
    assert!(String::from_utf8(out).unwrap().contains("Loaded 30 energy log entries from 1 users"));
}

#[test]
fn unreadable_store_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    std::fs::write(&db, b"definitely not a sqlite file, just some plain bytes").unwrap();
    assert!(resolver(db).resolve(&mut Vec::new()).is_err());
}

#[test]
fn probe_runs_end_to_end_on_a_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("stride.db");
    create_store(&db, FULL_SCHEMA, &["alice", "bob"], 20);
    let config = Config {
        data: DataConfig {
            db_path: db,
            ..DataConfig::default()
        },
        ..Config::default()
    };

    let mut clf = MockClassifier::new(7);
    let mut out = Vec::new();
    let outcome = run_probe(&config, &mut clf, today(), &mut out).unwrap();

    assert!(!outcome.source.is_synthetic());
    assert_eq!(outcome.results.samples, 26);
    assert_eq!(outcome.results.classes, vec![1, 2, 3, 4]);
    assert_eq!(outcome.verdict, Verdict::from_cv_mean(outcome.results.cv_mean));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("RESULTS"));
    assert!(text.contains("Next steps:"));
}
