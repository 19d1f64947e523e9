//! Idempotent batch ingestion of time events.
//!
//! One transaction per batch; upserts are keyed by the client-chosen
//! event id, so a retransmitted batch converges instead of duplicating.
//! Bad task/team references degrade to NULL instead of failing the batch.

use crate::db::{events, log};
use crate::errors::AppResult;
use crate::models::{EventKind, TimeEvent};
use crate::utils::time::to_local_naive;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub nulled_refs: usize,
    pub clock_ins: usize,
    /// Distinct (user, team) streams touched, in first-seen order.
    pub touched_pairs: Vec<(String, Option<String>)>,
    /// Local-date span of the batch, for the follow-up recompute.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

pub fn ingest_batch(
    conn: &mut Connection,
    user_id: &str,
    mut batch: Vec<TimeEvent>,
) -> AppResult<IngestReport> {
    let mut report = IngestReport::default();
    if batch.is_empty() {
        return Ok(report);
    }

    batch.sort_by_key(|ev| ev.timestamp);

    // One bulk existence check per referenced set, independent of batch
    // size.
    let task_refs: HashSet<String> = batch.iter().filter_map(|ev| ev.task_id.clone()).collect();
    let team_refs: HashSet<String> = batch.iter().filter_map(|ev| ev.team_id.clone()).collect();
    let known_tasks = events::existing_task_ids(conn, &task_refs)?;
    let known_teams = events::existing_team_ids(conn, &team_refs)?;

    let tx = conn.transaction()?;
    for mut ev in batch {
        // The session decides whose events these are, not the payload.
        ev.user_id = user_id.to_string();

        if let Some(task_id) = &ev.task_id
            && !known_tasks.contains(task_id)
        {
            warn!(event_id = %ev.id, task_id = %task_id, "unknown task reference, nulling it");
            ev.task_id = None;
            report.nulled_refs += 1;
        }
        if let Some(team_id) = &ev.team_id
            && !known_teams.contains(team_id)
        {
            warn!(event_id = %ev.id, team_id = %team_id, "unknown team reference, nulling it");
            ev.team_id = None;
            report.nulled_refs += 1;
        }

        events::upsert_event(&tx, &ev)?;
        report.accepted += 1;
        if ev.kind == EventKind::ClockIn {
            report.clock_ins += 1;
        }

        let date = to_local_naive(ev.timestamp).date();
        report.date_range = Some(match report.date_range {
            None => (date, date),
            Some((from, to)) => (from.min(date), to.max(date)),
        });

        let pair = (ev.user_id.clone(), ev.team_id.clone());
        if !report.touched_pairs.contains(&pair) {
            report.touched_pairs.push(pair);
        }
    }

    log::record(
        &tx,
        "ingest",
        user_id,
        &format!(
            "{} event(s), {} reference(s) nulled",
            report.accepted, report.nulled_refs
        ),
    )?;
    tx.commit()?;

    Ok(report)
}
