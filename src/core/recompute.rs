//! Backfill and incremental recompute of the `daily_stats` cache.
//!
//! Both entry points share the replay algorithm in [`crate::core::replay`];
//! they differ only in how the window and its initial clocked-in state are
//! derived. Either one is safe to run twice: the result converges to
//! whatever the event log implies.

use crate::core::buckets::DayBuckets;
use crate::core::replay::{replay_day_buckets, seed_state};
use crate::db::{events, log, stats};
use crate::errors::AppResult;
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::Connection;
use tracing::info;

fn pair_label(user_id: &str, team_id: Option<&str>) -> String {
    match team_id {
        Some(team) => format!("{user_id}/{team}"),
        None => format!("{user_id}/-"),
    }
}

fn write_buckets(
    conn: &mut Connection,
    user_id: &str,
    team_id: Option<&str>,
    buckets: &DayBuckets,
    clear: impl FnOnce(&Connection) -> AppResult<()>,
    operation: &str,
) -> AppResult<usize> {
    let tx = conn.transaction()?;
    clear(&tx)?;
    for (date, worked_ms) in buckets {
        stats::upsert_day(&tx, user_id, team_id, *date, *worked_ms)?;
    }
    log::record(
        &tx,
        operation,
        &pair_label(user_id, team_id),
        &format!("{} day bucket(s) written", buckets.len()),
    )?;
    tx.commit()?;
    Ok(buckets.len())
}

/// Full backfill: replay every (user, team) stream from its very first
/// event and rewrite that pair's cache rows.
pub fn backfill_all(conn: &mut Connection) -> AppResult<usize> {
    let pairs = events::distinct_pairs(conn)?;
    let mut days = 0;
    for (user_id, team_id) in &pairs {
        days += backfill_pair(conn, user_id, team_id.as_deref())?;
    }
    info!(pairs = pairs.len(), days, "backfill complete");
    Ok(days)
}

pub fn backfill_pair(
    conn: &mut Connection,
    user_id: &str,
    team_id: Option<&str>,
) -> AppResult<usize> {
    let history = events::load_pair_events(conn, user_id, team_id)?;
    let projected = events::project_local(&history);

    let buckets = match projected.first() {
        Some(first) => replay_day_buckets(&projected, false, first.at, None),
        None => DayBuckets::new(),
    };

    write_buckets(
        conn,
        user_id,
        team_id,
        &buckets,
        |tx| stats::clear_pair(tx, user_id, team_id),
        "backfill",
    )
}

/// Incremental recompute of one pair over the local-date window
/// `[from, to]` (inclusive), seeded with the clocked-in state implied by
/// the last state-changing event before the window.
pub fn recompute_window(
    conn: &mut Connection,
    user_id: &str,
    team_id: Option<&str>,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<usize> {
    let window_start: NaiveDateTime = from.and_time(NaiveTime::MIN);
    let window_end: NaiveDateTime = to
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN);

    // Query bounds padded by a day on each side: real UTC offsets are
    // under 24h, so the padded range always covers the local window and
    // the precise cut happens on projected local times below.
    let utc_from = DateTime::<Utc>::from_naive_utc_and_offset(window_start - Duration::days(1), Utc);
    let utc_to = DateTime::<Utc>::from_naive_utc_and_offset(window_end + Duration::days(1), Utc);

    let loaded = events::load_pair_events_between(conn, user_id, team_id, utc_from, utc_to)?;
    let projected = events::project_local(&loaded);

    // Roll the seed forward through padded events that fall before the
    // window once projected onto the local clock.
    let mut seeded =
        seed_state(events::last_state_kind_before(conn, user_id, team_id, utc_from)?);
    let mut in_window = Vec::with_capacity(projected.len());
    for ev in projected {
        if ev.at < window_start {
            if let Some(state) = ev.kind.clocks_in() {
                seeded = state;
            }
        } else if ev.at < window_end {
            in_window.push(ev);
        }
    }

    let buckets = replay_day_buckets(&in_window, seeded, window_start, None);

    write_buckets(
        conn,
        user_id,
        team_id,
        &buckets,
        |tx| stats::clear_range(tx, user_id, team_id, from, to),
        "recompute",
    )
}
