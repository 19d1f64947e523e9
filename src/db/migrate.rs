//! Versioned schema migrations for the server store, tracked via
//! `PRAGMA user_version`.

use crate::errors::{AppError, AppResult};
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 1;

pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        apply_v1(conn)?;
    }

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

/// v1: the full initial schema.
///
/// `time_events.timestamp` is RFC3339 normalized to UTC with millisecond
/// precision, so lexicographic order is chronological order.
/// `daily_stats.team_id` uses '' for "no team": SQLite treats NULLs as
/// distinct inside unique indexes, which would break the upsert key.
fn apply_v1(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS time_events (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            kind        TEXT NOT NULL CHECK(kind IN
                          ('clock_in','clock_out','start_task','stop_task','break_start','break_end')),
            timestamp   TEXT NOT NULL,
            task_id     TEXT,
            team_id     TEXT,
            note        TEXT,
            received_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_time_events_user_ts ON time_events(user_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_time_events_user_team_ts ON time_events(user_id, team_id, timestamp);

        CREATE TABLE IF NOT EXISTS daily_stats (
            user_id    TEXT NOT NULL,
            team_id    TEXT NOT NULL DEFAULT '',
            date       TEXT NOT NULL,
            worked_ms  INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, team_id, date)
        );

        CREATE TABLE IF NOT EXISTS teams (
            id         TEXT PRIMARY KEY,
            name       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id         TEXT PRIMARY KEY,
            team_id    TEXT,
            title      TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| AppError::Migration(e.to_string()))
}
