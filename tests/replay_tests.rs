mod common;

use chrono::{Duration, NaiveDate, Utc};
use common::{event, local_utc};
use worksync::core::dashboard::live_session_ms;
use worksync::core::recompute;
use worksync::db::pool::DbPool;
use worksync::db::{events, stats};
use worksync::models::EventKind;
use worksync::server::ingest::ingest_batch;
use worksync::utils::time::now_local_naive;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn full_work_day_materializes_as_one_bucket() {
    let mut pool = DbPool::open_in_memory().unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 17, 15), None),
    ];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();
    recompute::backfill_all(&mut pool.conn).unwrap();

    let total = stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap();
    assert_eq!(total, (8 * 60 + 15) * 60_000);
}

#[test]
fn midnight_crossing_splits_thirty_thirty() {
    let mut pool = DbPool::open_in_memory().unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 23, 30), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 3, 0, 30), None),
    ];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();
    recompute::backfill_all(&mut pool.conn).unwrap();

    assert_eq!(
        stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap(),
        30 * 60_000
    );
    assert_eq!(
        stats::day_total(&pool.conn, "u1", None, date(2025, 6, 3)).unwrap(),
        30 * 60_000
    );
}

#[test]
fn stop_task_keeps_accruing_until_clock_out() {
    let mut pool = DbPool::open_in_memory().unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None),
        event("u1", EventKind::StartTask, local_utc(2025, 6, 2, 9, 10), None),
        event("u1", EventKind::StopTask, local_utc(2025, 6, 2, 9, 40), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 10, 0), None),
    ];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();
    recompute::backfill_all(&mut pool.conn).unwrap();

    assert_eq!(
        stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap(),
        60 * 60_000
    );
}

#[test]
fn incremental_window_is_seeded_from_events_before_it() {
    let mut pool = DbPool::open_in_memory().unwrap();

    // Session opens the night before the recompute window and closes
    // inside it.
    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 23, 0), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 3, 1, 0), None),
    ];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();

    recompute::recompute_window(&mut pool.conn, "u1", None, date(2025, 6, 3), date(2025, 6, 3))
        .unwrap();

    // Only day 3 is in the window; its hour between midnight and 01:00
    // counts because the seed says "still clocked in".
    assert_eq!(
        stats::day_total(&pool.conn, "u1", None, date(2025, 6, 3)).unwrap(),
        60 * 60_000
    );
    // Day 2 was outside the window and stays uncached until its own
    // recompute.
    assert_eq!(
        stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap(),
        0
    );
}

#[test]
fn recompute_converges_when_run_twice() {
    let mut pool = DbPool::open_in_memory().unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 8, 0), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 12, 0), None),
    ];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();

    recompute::recompute_window(&mut pool.conn, "u1", None, date(2025, 6, 1), date(2025, 6, 7))
        .unwrap();
    let first = stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap();
    recompute::recompute_window(&mut pool.conn, "u1", None, date(2025, 6, 1), date(2025, 6, 7))
        .unwrap();
    let second = stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap();

    assert_eq!(first, 4 * 60 * 60_000);
    assert_eq!(first, second);
}

#[test]
fn streams_are_partitioned_by_team() {
    let mut pool = DbPool::open_in_memory().unwrap();
    pool.conn
        .execute(
            "INSERT INTO teams (id, name, created_at) VALUES ('team-1', 'Crew', ?1)",
            [Utc::now().to_rfc3339()],
        )
        .unwrap();

    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), Some("team-1")),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 11, 0), Some("team-1")),
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 13, 0), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 14, 0), None),
    ];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();
    recompute::backfill_all(&mut pool.conn).unwrap();

    assert_eq!(
        stats::day_total(&pool.conn, "u1", Some("team-1"), date(2025, 6, 2)).unwrap(),
        2 * 60 * 60_000
    );
    assert_eq!(
        stats::day_total(&pool.conn, "u1", None, date(2025, 6, 2)).unwrap(),
        60 * 60_000
    );
}

#[test]
fn live_read_reports_open_session_with_zero_persisted_rows() {
    let mut pool = DbPool::open_in_memory().unwrap();

    // Clocked in half an hour ago, no clock-out, no recompute ran.
    let session_start = Utc::now() - Duration::minutes(30);
    let batch = vec![event("u1", EventKind::ClockIn, session_start, None)];
    ingest_batch(&mut pool.conn, "u1", batch).unwrap();

    assert_eq!(stats::count_rows_for_user(&pool.conn, "u1").unwrap(), 0);

    let (kind, started) = events::latest_clock_event(&pool.conn, "u1").unwrap().unwrap();
    assert_eq!(kind, EventKind::ClockIn);

    let since = events::load_user_events_since(&pool.conn, "u1", started).unwrap();
    let live_ms = live_session_ms(&events::project_local(&since), now_local_naive());

    let expected = 30 * 60_000;
    assert!(
        (live_ms - expected).abs() < 5_000,
        "live delta {live_ms} not within 5s of {expected}"
    );
}
