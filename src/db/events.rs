//! Queries over the durable `time_events` log.

use crate::core::replay::ReplayEvent;
use crate::errors::{AppError, AppResult};
use crate::models::{EventKind, TimeEvent};
use crate::utils::time::to_local_naive;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, Transaction, params};
use std::collections::HashSet;

/// Kinds that flip the clocked-in boolean; breaks are excluded on purpose.
const STATE_KINDS: &str = "('clock_in','clock_out','start_task','stop_task')";

/// Timestamps are stored normalized to UTC with millisecond precision so
/// that lexicographic order in SQLite is chronological order.
pub fn ts_to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn ts_from_db(s: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidTimestamp(s.to_string()))
}

fn map_row(row: &Row) -> Result<TimeEvent> {
    let kind_str: String = row.get("kind")?;
    let kind = EventKind::from_db_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(AppError::InvalidEventKind(kind_str.clone())),
        )
    })?;

    let ts_str: String = row.get("timestamp")?;
    let timestamp = ts_from_db(&ts_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(TimeEvent {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        kind,
        timestamp,
        task_id: row.get("task_id")?,
        team_id: row.get("team_id")?,
        note: row.get("note")?,
    })
}

/// Upsert by the client-chosen id: insert if new, overwrite fields if the
/// id already exists. This is what makes batch retransmission a no-op
/// instead of a duplicate. `received_at` keeps its original value.
pub fn upsert_event(tx: &Transaction, ev: &TimeEvent) -> AppResult<()> {
    tx.execute(
        "INSERT INTO time_events (id, user_id, kind, timestamp, task_id, team_id, note, received_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
             user_id   = excluded.user_id,
             kind      = excluded.kind,
             timestamp = excluded.timestamp,
             task_id   = excluded.task_id,
             team_id   = excluded.team_id,
             note      = excluded.note",
        params![
            ev.id,
            ev.user_id,
            ev.kind.to_db_str(),
            ts_to_db(ev.timestamp),
            ev.task_id,
            ev.team_id,
            ev.note,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn existing_ids_in(conn: &Connection, sql: &str, ids: &HashSet<String>) -> AppResult<HashSet<String>> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!("{} ({})", sql, placeholders);

    let id_vec: Vec<&String> = ids.iter().collect();
    let bind: Vec<&dyn rusqlite::ToSql> = id_vec.iter().map(|s| *s as &dyn rusqlite::ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(bind), |row| row.get::<_, String>(0))?;

    let mut out = HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

/// One bulk existence check per referenced set, so ingestion query cost is
/// bounded independent of batch size.
pub fn existing_team_ids(conn: &Connection, ids: &HashSet<String>) -> AppResult<HashSet<String>> {
    existing_ids_in(conn, "SELECT id FROM teams WHERE id IN", ids)
}

pub fn existing_task_ids(conn: &Connection, ids: &HashSet<String>) -> AppResult<HashSet<String>> {
    existing_ids_in(conn, "SELECT id FROM tasks WHERE id IN", ids)
}

/// All events of one (user, team-or-none) stream, in chronological order.
pub fn load_pair_events(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
) -> AppResult<Vec<TimeEvent>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM time_events
         WHERE user_id = ?1 AND team_id IS ?2
         ORDER BY timestamp ASC",
    )?;

    let rows = stmt.query_map(params![user_id, team_id], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn load_pair_events_between(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<Vec<TimeEvent>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM time_events
         WHERE user_id = ?1 AND team_id IS ?2 AND timestamp >= ?3 AND timestamp < ?4
         ORDER BY timestamp ASC",
    )?;

    let rows = stmt.query_map(
        params![user_id, team_id, ts_to_db(from), ts_to_db(to)],
        map_row,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Kind of the last state-changing event strictly before `before`, used to
/// seed the clocked-in boolean of an incremental replay window.
pub fn last_state_kind_before(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
    before: DateTime<Utc>,
) -> AppResult<Option<EventKind>> {
    let sql = format!(
        "SELECT kind FROM time_events
         WHERE user_id = ?1 AND team_id IS ?2 AND timestamp < ?3 AND kind IN {STATE_KINDS}
         ORDER BY timestamp DESC LIMIT 1"
    );

    let kind_str: Option<String> = conn
        .query_row(&sql, params![user_id, team_id, ts_to_db(before)], |row| {
            row.get(0)
        })
        .optional()?;

    match kind_str {
        None => Ok(None),
        Some(s) => EventKind::from_db_str(&s)
            .map(Some)
            .ok_or(AppError::InvalidEventKind(s)),
    }
}

/// Every (user, team) stream present in the log. Drives full backfill.
pub fn distinct_pairs(conn: &Connection) -> AppResult<Vec<(String, Option<String>)>> {
    let mut stmt = conn.prepare("SELECT DISTINCT user_id, team_id FROM time_events")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// The user's most recent clock-in/clock-out, across all teams. A trailing
/// clock-in means a session is still running.
pub fn latest_clock_event(
    conn: &Connection,
    user_id: &str,
) -> AppResult<Option<(EventKind, DateTime<Utc>)>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT kind, timestamp FROM time_events
             WHERE user_id = ?1 AND kind IN ('clock_in','clock_out')
             ORDER BY timestamp DESC LIMIT 1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        None => Ok(None),
        Some((kind_str, ts_str)) => {
            let kind =
                EventKind::from_db_str(&kind_str).ok_or(AppError::InvalidEventKind(kind_str))?;
            Ok(Some((kind, ts_from_db(&ts_str)?)))
        }
    }
}

/// All of the user's events at or after `since`, across teams, for the
/// live session delta.
pub fn load_user_events_since(
    conn: &Connection,
    user_id: &str,
    since: DateTime<Utc>,
) -> AppResult<Vec<TimeEvent>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM time_events
         WHERE user_id = ?1 AND timestamp >= ?2
         ORDER BY timestamp ASC",
    )?;

    let rows = stmt.query_map(params![user_id, ts_to_db(since)], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Project stored events onto the local wall clock for replay.
pub fn project_local(events: &[TimeEvent]) -> Vec<ReplayEvent> {
    events
        .iter()
        .map(|ev| ReplayEvent {
            at: to_local_naive(ev.timestamp),
            kind: ev.kind,
        })
        .collect()
}
