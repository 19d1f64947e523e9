//! Single-flight sync coordinator.
//!
//! One pass: drain the mutation queue (so offline-created entities gain
//! canonical ids first), then push every pending time event as a single
//! batch, then acknowledge exactly what was submitted. A trigger while a
//! pass is in flight is a no-op, never a cancel-and-restart.

use crate::client::connectivity::SyncReason;
use crate::client::event_log::EventLog;
use crate::client::queue::{DrainReport, MutationQueue};
use crate::client::transport::Transport;
use crate::errors::AppResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SyncOutcome {
    /// A pass was already running; nothing was done.
    pub skipped: bool,
    pub drain: DrainReport,
    pub pushed: usize,
    pub acknowledged: bool,
}

pub struct SyncOrchestrator {
    queue: MutationQueue,
    log: EventLog,
    transport: Arc<dyn Transport>,
    in_flight: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(queue: MutationQueue, log: EventLog, transport: Arc<dyn Transport>) -> Self {
        Self {
            queue,
            log,
            transport,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Run one sync pass, or no-op if one is already in flight.
    pub async fn sync(&self) -> AppResult<SyncOutcome> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("sync already in flight, trigger collapsed");
            return Ok(SyncOutcome {
                skipped: true,
                ..SyncOutcome::default()
            });
        }
        let result = self.sync_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn sync_inner(&self) -> AppResult<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        // Step 1: the queue first, so time events pushed below carry
        // canonical foreign keys.
        outcome.drain = self.queue.drain(self.transport.as_ref()).await?;
        if !outcome.drain.fully_drained() {
            debug!(drain = ?outcome.drain, "queue not fully drained, deferring event push");
            return Ok(outcome);
        }

        // Step 2: one batch, ordered by event timestamp.
        let mut pending = self.log.pending_events()?;
        if pending.is_empty() {
            return Ok(outcome);
        }
        pending.sort_by_key(|ev| ev.timestamp);
        outcome.pushed = pending.len();

        let reply = match self.transport.push_events(&pending).await {
            Ok(reply) => reply,
            Err(err) => {
                debug!(%err, "event batch push failed, events stay pending");
                return Ok(outcome);
            }
        };

        // Step 3: acknowledge exactly the submitted ids.
        if (200..300).contains(&reply.status) {
            let ids: Vec<String> = pending.into_iter().map(|ev| ev.id).collect();
            self.log.acknowledge(&ids)?;
            outcome.acknowledged = true;
            info!(count = ids.len(), "event batch acknowledged");
        } else {
            warn!(status = reply.status, "event batch rejected, events stay pending");
        }

        Ok(outcome)
    }
}

/// Drive an orchestrator from a trigger channel plus an optional periodic
/// timer. This is the whole client-side runtime loop; the connectivity
/// monitor and any UI hold the sending half.
pub fn spawn_sync_loop(
    orchestrator: Arc<SyncOrchestrator>,
    mut triggers: UnboundedReceiver<SyncReason>,
    interval: Option<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval.map(tokio::time::interval);
        loop {
            let reason = match ticker.as_mut() {
                Some(ticker) => {
                    tokio::select! {
                        received = triggers.recv() => match received {
                            Some(reason) => reason,
                            None => break,
                        },
                        _ = ticker.tick() => SyncReason::Interval,
                    }
                }
                None => match triggers.recv().await {
                    Some(reason) => reason,
                    None => break,
                },
            };

            debug!(?reason, "sync triggered");
            if let Err(err) = orchestrator.sync().await {
                warn!(%err, "sync pass failed");
            }
        }
    })
}
