//! Post-commit side effects, modeled as explicit tasks on a channel so
//! they can be driven deterministically in tests instead of detaching
//! unstructured futures.
//!
//! Everything here is best-effort and idempotent: a failed recompute or
//! notification is logged and forgotten, because the next ingestion (or
//! an explicit backfill) re-converges the cache from the event log.

use crate::core::recompute;
use crate::db::pool::SharedDb;
use crate::db::stats;
use crate::errors::AppResult;
use crate::server::live::{LiveHub, StatsUpdate};
use crate::utils::time::{ms_to_hours, today_local, week_bounds};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Recompute one pair's cache rows over the affected date range, then
    /// publish refreshed today/week totals to the user's live channel.
    RecomputeAndPublish {
        user_id: String,
        team_id: Option<String>,
        from: NaiveDate,
        to: NaiveDate,
    },
    /// Event-triggered notification, e.g. "member clocked in".
    Notify { user_id: String, message: String },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: &str, message: &str) -> AppResult<()>;
}

/// Default dispatcher: just a structured log line. Real delivery lives in
/// an external service.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, user_id: &str, message: &str) -> AppResult<()> {
        info!(user_id, message, "notification dispatched");
        Ok(())
    }
}

pub struct SideEffectWorker {
    db: SharedDb,
    live: LiveHub,
    notifier: Arc<dyn Notifier>,
}

impl SideEffectWorker {
    pub fn new(db: SharedDb, live: LiveHub, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, live, notifier }
    }

    /// Process one effect synchronously. Failures never propagate: the
    /// ingested events are already durable and cache/notifications are
    /// not the source of truth.
    pub fn process(&self, effect: SideEffect) {
        if let Err(err) = self.try_process(&effect) {
            warn!(?effect, %err, "side effect failed, continuing");
        }
    }

    fn try_process(&self, effect: &SideEffect) -> AppResult<()> {
        match effect {
            SideEffect::RecomputeAndPublish {
                user_id,
                team_id,
                from,
                to,
            } => {
                let team = team_id.as_deref();
                let (today_ms, week_ms) = {
                    let mut conn = self.db.lock().expect("server db poisoned");
                    recompute::recompute_window(&mut conn, user_id, team, *from, *to)?;

                    let today = today_local();
                    let (week_from, week_to) = week_bounds(today);
                    (
                        stats::day_total(&conn, user_id, team, today)?,
                        stats::range_total(&conn, user_id, team, week_from, week_to)?,
                    )
                };

                self.live.publish(
                    user_id,
                    StatsUpdate {
                        team_id: team_id.clone(),
                        total_hours_today: ms_to_hours(today_ms),
                        total_hours_week: ms_to_hours(week_ms),
                    },
                );
                Ok(())
            }
            SideEffect::Notify { user_id, message } => self.notifier.notify(user_id, message),
        }
    }

    /// Background loop consuming the effect channel. Tests skip this and
    /// call [`SideEffectWorker::process`] directly.
    pub fn spawn(self, mut rx: UnboundedReceiver<SideEffect>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(effect) = rx.recv().await {
                self.process(effect);
            }
        })
    }
}
