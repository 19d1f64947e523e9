mod common;

use chrono::{NaiveDate, Utc};
use common::{event, local_utc};
use worksync::core::recompute;
use worksync::db::pool::DbPool;
use worksync::db::stats;
use worksync::models::EventKind;
use worksync::server::ingest::ingest_batch;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn empty_batch_is_a_no_op_success() {
    let mut pool = DbPool::open_in_memory().unwrap();
    let report = ingest_batch(&mut pool.conn, "u1", Vec::new()).unwrap();
    assert_eq!(report.accepted, 0);
    assert!(report.touched_pairs.is_empty());
    assert!(report.date_range.is_none());
}

#[test]
fn reingesting_the_same_batch_changes_nothing() {
    let mut pool = DbPool::open_in_memory().unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 17, 0), None),
    ];

    ingest_batch(&mut pool.conn, "u1", batch.clone()).unwrap();
    recompute::backfill_all(&mut pool.conn).unwrap();
    let first = stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap();

    // The retransmission of an already-accepted batch, e.g. after a lost
    // acknowledgment.
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();
    recompute::backfill_all(&mut pool.conn).unwrap();
    let second = stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap();

    assert_eq!(first, 8 * 60 * 60_000);
    assert_eq!(first, second);

    let count: i64 = pool
        .conn
        .query_row("SELECT COUNT(*) FROM time_events", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn resubmission_under_the_same_id_overwrites_fields() {
    let mut pool = DbPool::open_in_memory().unwrap();

    let mut ev = event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None);
    ingest_batch(&mut pool.conn, "u1", vec![ev.clone()]).unwrap();

    ev.note = Some("corrected".to_string());
    ev.timestamp = local_utc(2025, 6, 2, 9, 5);
    ingest_batch(&mut pool.conn, "u1", vec![ev.clone()]).unwrap();

    let (note, ts): (Option<String>, String) = pool
        .conn
        .query_row(
            "SELECT note, timestamp FROM time_events WHERE id = ?1",
            [&ev.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(note.as_deref(), Some("corrected"));
    assert_eq!(ts, worksync::db::events::ts_to_db(ev.timestamp));
}

#[test]
fn unknown_references_are_nulled_not_rejected() {
    let mut pool = DbPool::open_in_memory().unwrap();
    pool.conn
        .execute(
            "INSERT INTO teams (id, name, created_at) VALUES ('team-1', 'Crew', ?1)",
            [Utc::now().to_rfc3339()],
        )
        .unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), Some("team-1")),
        event("u1", EventKind::StartTask, local_utc(2025, 6, 2, 9, 30), Some("ghost-team"))
            .with_task("ghost-task"),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 17, 0), Some("team-1")),
    ];

    let report = ingest_batch(&mut pool.conn, "u1", batch).unwrap();
    assert_eq!(report.accepted, 3);
    assert_eq!(report.nulled_refs, 2);

    let dangling: i64 = pool
        .conn
        .query_row(
            "SELECT COUNT(*) FROM time_events WHERE team_id = 'ghost-team' OR task_id = 'ghost-task'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dangling, 0);
}

#[test]
fn report_captures_touched_pairs_and_date_range() {
    let mut pool = DbPool::open_in_memory().unwrap();
    pool.conn
        .execute(
            "INSERT INTO teams (id, name, created_at) VALUES ('team-1', 'Crew', ?1)",
            [Utc::now().to_rfc3339()],
        )
        .unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 23, 0), Some("team-1")),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 3, 1, 0), Some("team-1")),
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 4, 9, 0), None),
    ];

    let report = ingest_batch(&mut pool.conn, "u1", batch).unwrap();
    assert_eq!(
        report.touched_pairs,
        vec![
            ("u1".to_string(), Some("team-1".to_string())),
            ("u1".to_string(), None),
        ]
    );
    assert_eq!(report.date_range, Some((date(2025, 6, 2), date(2025, 6, 4))));
    assert_eq!(report.clock_ins, 2);
}

#[test]
fn the_session_user_owns_the_batch() {
    let mut pool = DbPool::open_in_memory().unwrap();

    // Payload claims another user; the authenticated session wins.
    let batch = vec![event("intruder", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None)];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();

    let owner: String = pool
        .conn
        .query_row("SELECT user_id FROM time_events", [], |row| row.get(0))
        .unwrap();
    assert_eq!(owner, "u1");
}
