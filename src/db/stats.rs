//! The materialized `daily_stats` cache. Derived data only: every row can
//! be rebuilt from `time_events` at any time.

use crate::errors::AppResult;
use crate::models::DailyStat;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};

/// Sentinel for "no team" inside the primary key. NULLs compare distinct
/// in SQLite unique indexes, which would break the upsert key.
const NO_TEAM_KEY: &str = "";

fn team_key(team_id: Option<&str>) -> &str {
    team_id.unwrap_or(NO_TEAM_KEY)
}

fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn upsert_day(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
    date: NaiveDate,
    worked_ms: i64,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO daily_stats (user_id, team_id, date, worked_ms, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, team_id, date) DO UPDATE SET
             worked_ms  = excluded.worked_ms,
             updated_at = excluded.updated_at",
        params![
            user_id,
            team_key(team_id),
            date_str(date),
            worked_ms,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Drop cached rows in `[from, to]` before a window recompute, so days
/// whose total fell to zero do not survive as stale rows.
pub fn clear_range(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<()> {
    conn.execute(
        "DELETE FROM daily_stats
         WHERE user_id = ?1 AND team_id = ?2 AND date >= ?3 AND date <= ?4",
        params![user_id, team_key(team_id), date_str(from), date_str(to)],
    )?;
    Ok(())
}

pub fn clear_pair(conn: &Connection, user_id: &str, team_id: Option<&str>) -> AppResult<()> {
    conn.execute(
        "DELETE FROM daily_stats WHERE user_id = ?1 AND team_id = ?2",
        params![user_id, team_key(team_id)],
    )?;
    Ok(())
}

pub fn day_total(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
    date: NaiveDate,
) -> AppResult<i64> {
    let total: Option<i64> = conn.query_row(
        "SELECT SUM(worked_ms) FROM daily_stats
         WHERE user_id = ?1 AND team_id = ?2 AND date = ?3",
        params![user_id, team_key(team_id), date_str(date)],
        |row| row.get(0),
    )?;
    Ok(total.unwrap_or(0))
}

pub fn range_total(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<i64> {
    let total: Option<i64> = conn.query_row(
        "SELECT SUM(worked_ms) FROM daily_stats
         WHERE user_id = ?1 AND team_id = ?2 AND date >= ?3 AND date <= ?4",
        params![user_id, team_key(team_id), date_str(from), date_str(to)],
        |row| row.get(0),
    )?;
    Ok(total.unwrap_or(0))
}

pub fn count_rows_for_user(conn: &Connection, user_id: &str) -> AppResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM daily_stats WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Cached rows for one pair, oldest first. Used by the CLI to print a
/// recompute result.
pub fn load_pair_stats(
    conn: &Connection,
    user_id: &str,
    team_id: Option<&str>,
) -> AppResult<Vec<DailyStat>> {
    let mut stmt = conn.prepare(
        "SELECT date, worked_ms FROM daily_stats
         WHERE user_id = ?1 AND team_id = ?2
         ORDER BY date ASC",
    )?;

    let rows = stmt.query_map(params![user_id, team_key(team_id)], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut out = Vec::new();
    for r in rows {
        let (date_text, worked_ms) = r?;
        let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|_| {
            crate::errors::AppError::InvalidDate(date_text.clone())
        })?;
        out.push(DailyStat {
            user_id: user_id.to_string(),
            team_id: team_id.map(str::to_string),
            date,
            worked_ms,
        });
    }
    Ok(out)
}
