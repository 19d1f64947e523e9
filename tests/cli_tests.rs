mod common;

use common::{event, local_utc, setup_test_db, ws};
use predicates::str::contains;
use worksync::db::pool::DbPool;
use worksync::models::EventKind;
use worksync::server::ingest::ingest_batch;

#[test]
fn init_creates_both_databases() {
    let server_db = setup_test_db("cli_init_server");
    let client_db = setup_test_db("cli_init_client");

    ws()
        .args([
            "--server-db",
            &server_db,
            "--client-db",
            &client_db,
            "--test",
            "init",
        ])
        .assert()
        .success()
        .stdout(contains("Server database ready"))
        .stdout(contains("Client database ready"));

    assert!(std::path::Path::new(&server_db).exists());
    assert!(std::path::Path::new(&client_db).exists());
}

fn seed_one_day(server_db: &str) {
    let mut pool = DbPool::open(server_db).expect("open server db");
    let batch = vec![
        event("u1", EventKind::ClockIn, local_utc(2025, 6, 2, 9, 0), None),
        event("u1", EventKind::ClockOut, local_utc(2025, 6, 2, 17, 15), None),
    ];
    ingest_batch(&mut pool.conn, "u1", batch).expect("ingest");
}

#[test]
fn backfill_rebuilds_the_cache_from_events() {
    let server_db = setup_test_db("cli_backfill");
    seed_one_day(&server_db);

    ws()
        .args(["--server-db", &server_db, "--test", "backfill"])
        .assert()
        .success()
        .stdout(contains("Backfilled 1 day bucket(s) across 1 stream(s)"));
}

#[test]
fn recompute_prints_the_window_totals() {
    let server_db = setup_test_db("cli_recompute");
    seed_one_day(&server_db);

    ws()
        .args([
            "--server-db",
            &server_db,
            "--test",
            "recompute",
            "--user",
            "u1",
            "--from",
            "2025-06-01",
            "--to",
            "2025-06-07",
        ])
        .assert()
        .success()
        .stdout(contains("Recomputed 1 day bucket(s)"))
        .stdout(contains("2025-06-02  08:15"));
}

#[test]
fn audit_log_records_ingest_and_backfill() {
    let server_db = setup_test_db("cli_audit_log");
    seed_one_day(&server_db);

    ws()
        .args(["--server-db", &server_db, "--test", "backfill"])
        .assert()
        .success();

    ws()
        .args(["--server-db", &server_db, "--test", "log", "--print"])
        .assert()
        .success()
        .stdout(contains("ingest"))
        .stdout(contains("backfill"));
}
