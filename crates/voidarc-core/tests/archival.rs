//! End-to-end archival flows against in-memory and file-backed databases.

use rusqlite::Connection;
use voidarc_core::{ArchiveEngine, Error};

fn clinic_engine() -> ArchiveEngine {
    let engine = ArchiveEngine::open_in_memory().unwrap().with_batch_size(3);
    engine
        .connection()
        .execute_batch(
            r#"
            CREATE TABLE users (
                user_id INTEGER PRIMARY KEY,
                username TEXT
            );
            CREATE TABLE person (
                person_id INTEGER PRIMARY KEY,
                uuid TEXT,
                voided INTEGER NOT NULL DEFAULT 0,
                voided_by INTEGER,
                date_voided TEXT,
                void_reason TEXT
            );
            CREATE TABLE patient (
                patient_id INTEGER PRIMARY KEY,
                person_id INTEGER REFERENCES person(person_id),
                uuid TEXT,
                voided INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE visit (
                visit_id INTEGER PRIMARY KEY,
                patient_id INTEGER REFERENCES patient(patient_id),
                uuid TEXT,
                voided INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE observation (
                obs_id INTEGER PRIMARY KEY,
                visit_id INTEGER REFERENCES visit(visit_id),
                uuid TEXT,
                voided INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO users VALUES (1, 'admin');
            INSERT INTO person VALUES (1, 'per-1', 1, 1, '2026-03-01', 'merged');
            INSERT INTO person VALUES (2, 'per-2', 0, NULL, NULL, NULL);
            INSERT INTO patient VALUES (10, 1, 'pat-10', 1);
            INSERT INTO visit VALUES (100, 10, 'vis-100', 1);
            INSERT INTO visit VALUES (101, 10, 'vis-101', 1);
            INSERT INTO observation VALUES (1000, 100, 'obs-1000', 1);
            INSERT INTO observation VALUES (1001, 100, 'obs-1001', 1);
            INSERT INTO observation VALUES (1002, 101, 'obs-1002', 1);
            INSERT INTO observation VALUES (1003, 101, 'obs-1003', 0);
            "#,
        )
        .unwrap();
    engine
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |r| r.get(0)).unwrap()
}

#[test]
fn global_run_then_restore_round_trip() {
    let engine = clinic_engine();

    let report = engine.run_archival(None).unwrap();
    assert!(!report.partial_order);
    assert!(report.failures().is_empty());
    // 1 person + 1 patient + 2 visits + 3 observations.
    assert_eq!(report.rows_moved(), 7);

    let conn = engine.connection();
    assert_eq!(count(conn, "SELECT count(*) FROM visit"), 0);
    assert_eq!(count(conn, "SELECT count(*) FROM observation"), 1);
    assert_eq!(count(conn, "SELECT count(*) FROM archive_observation"), 3);

    // Restore one branch and verify identity, not just counts.
    engine.restore("visit").unwrap();
    assert_eq!(count(conn, "SELECT count(*) FROM visit"), 2);
    assert_eq!(
        count(conn, "SELECT count(DISTINCT visit_id) FROM visit"),
        2
    );
    let uuids: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT uuid FROM visit ORDER BY visit_id")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    };
    assert_eq!(uuids, vec!["vis-100", "vis-101"]);

    // The shadow is gone once fully merged.
    let shadows = engine.list_shadow_tables().unwrap();
    assert!(shadows.iter().all(|t| t.name != "archive_visit"));
}

#[test]
fn archival_respects_dependency_order() {
    let engine = clinic_engine();
    let report = engine.run_archival(None).unwrap();

    let order: Vec<&str> = report.tables.iter().map(|t| t.table.as_str()).collect();
    let pos = |name: &str| order.iter().position(|t| *t == name).unwrap();
    assert!(pos("observation") < pos("visit"));
    assert!(pos("visit") < pos("patient"));
    assert!(pos("patient") < pos("person"));
}

#[test]
fn targeted_run_archives_descendant_closure() {
    let engine = clinic_engine();
    let report = engine.run_archival(Some("visit")).unwrap();

    let tables: Vec<&str> = report.tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(tables, vec!["observation", "visit"]);

    let conn = engine.connection();
    // Patient and person stay untouched.
    assert_eq!(count(conn, "SELECT count(*) FROM patient WHERE voided = 1"), 1);
    assert_eq!(count(conn, "SELECT count(*) FROM archive_visit"), 2);
}

#[test]
fn archiving_a_shadow_table_is_rejected() {
    let engine = clinic_engine();
    let err = engine.run_archival(Some("archive_visit")).unwrap_err();
    assert!(matches!(err, Error::ShadowTarget(name) if name == "archive_visit"));
}

#[test]
fn shadow_listing_reports_counts_and_samples() {
    let engine = clinic_engine();
    engine.run_archival(Some("person")).unwrap();

    let shadows = engine.list_shadow_tables().unwrap();
    let person = shadows.iter().find(|t| t.name == "archive_person").unwrap();
    assert_eq!(person.total_records, Some(1));
    assert_eq!(person.voided_records, Some(1));
    assert_eq!(person.voided_entries.len(), 1);
    assert_eq!(person.voided_entries[0].record_id, "per-1");
    assert_eq!(person.voided_entries[0].voided_by, "admin");
}

#[test]
fn failed_table_does_not_abort_independent_tables() {
    let engine = clinic_engine();
    // Sabotage observation's shadow creation with a name-squatting view.
    engine
        .connection()
        .execute_batch("CREATE VIEW archive_observation AS SELECT * FROM observation")
        .unwrap();

    let report = engine.run_archival(None).unwrap();

    let failures: Vec<&str> = report
        .failures()
        .iter()
        .map(|t| t.table.as_str())
        .collect();
    assert_eq!(failures, vec!["observation"]);

    // Independent tables still completed in the same run.
    let person = report.tables.iter().find(|t| t.table == "person").unwrap();
    assert_eq!(person.rows_moved, 1);
    assert_eq!(
        count(engine.connection(), "SELECT count(*) FROM archive_person"),
        1
    );
}

#[test]
fn rerun_after_source_schema_evolves() {
    let engine = clinic_engine();
    engine.run_archival(Some("visit")).unwrap();

    let conn = engine.connection();
    conn.execute_batch(
        r#"
        ALTER TABLE visit ADD COLUMN note TEXT;
        INSERT INTO visit (visit_id, patient_id, uuid, voided, note)
            VALUES (102, 10, 'vis-102', 1, 'late entry');
        "#,
    )
    .unwrap();

    let report = engine.run_archival(Some("visit")).unwrap();
    let visit = report.tables.iter().find(|t| t.table == "visit").unwrap();
    assert_eq!(visit.rows_moved, 1);

    // The shadow was synced and carries the new column's value.
    let note: String = conn
        .query_row(
            "SELECT note FROM archive_visit WHERE visit_id = 102",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(note, "late entry");
}

#[test]
fn cyclic_references_degrade_to_partial_order() {
    let engine = ArchiveEngine::open_in_memory().unwrap();
    engine
        .connection()
        .execute_batch(
            r#"
            CREATE TABLE alpha (
                alpha_id INTEGER PRIMARY KEY,
                beta_id INTEGER REFERENCES beta(beta_id),
                voided INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE beta (
                beta_id INTEGER PRIMARY KEY,
                alpha_id INTEGER REFERENCES alpha(alpha_id),
                voided INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO beta (beta_id, alpha_id, voided) VALUES (1, NULL, 0);
            INSERT INTO alpha (alpha_id, beta_id, voided) VALUES (1, 1, 1);
            "#,
        )
        .unwrap();

    let report = engine.run_archival(None).unwrap();
    assert!(report.partial_order);
    // Both tables processed exactly once despite the cycle.
    let mut tables: Vec<&str> = report.tables.iter().map(|t| t.table.as_str()).collect();
    tables.sort();
    assert_eq!(tables, vec!["alpha", "beta"]);
    assert!(report.failures().is_empty());
    assert_eq!(report.rows_moved(), 1);
}

#[test]
fn file_backed_round_trip_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.db");

    {
        let engine = ArchiveEngine::open(&path).unwrap();
        engine
            .connection()
            .execute_batch(
                r#"
                CREATE TABLE item (
                    item_id INTEGER PRIMARY KEY,
                    uuid TEXT,
                    voided INTEGER NOT NULL DEFAULT 0
                );
                INSERT INTO item VALUES (1, 'i-1', 1);
                INSERT INTO item VALUES (2, 'i-2', 0);
                "#,
            )
            .unwrap();
        let report = engine.run_archival(None).unwrap();
        assert_eq!(report.rows_moved(), 1);
    }

    // Shadow tables persist as ordinary tables; the prefix convention is
    // the only archival state there is.
    let engine = ArchiveEngine::open(&path).unwrap();
    let shadows = engine.list_shadow_tables().unwrap();
    assert_eq!(shadows.len(), 1);
    assert_eq!(shadows[0].name, "archive_item");

    engine.restore("item").unwrap();
    assert_eq!(
        count(engine.connection(), "SELECT count(*) FROM item"),
        2
    );
}
