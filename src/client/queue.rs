//! The durable, ordered offline-mutation queue.
//!
//! FIFO order survives restarts and retries; an entry leaves the queue
//! only on a terminal outcome. Draining is the single place that mutates
//! the cached local copies of entities.

use crate::client::reconcile;
use crate::client::store::SharedStore;
use crate::client::transport::{MutationReply, Transport};
use crate::errors::AppResult;
use crate::models::{Method, OfflineMutation};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// What one `drain` pass did. `halted` means a transient failure stopped
/// processing with entries still queued; `cleared` means an expired
/// session threw the remainder away.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DrainReport {
    pub applied: usize,
    pub dropped: usize,
    pub halted: bool,
    pub cleared: bool,
    pub skipped: bool,
}

impl DrainReport {
    /// True when the pass left nothing behind for a later retry and the
    /// session is still usable; the precondition for pushing time events.
    pub fn fully_drained(&self) -> bool {
        !self.halted && !self.cleared && !self.skipped
    }
}

pub struct MutationQueue {
    store: SharedStore,
    draining: AtomicBool,
}

impl MutationQueue {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            draining: AtomicBool::new(false),
        }
    }

    /// Durably append a write. The temp ids referenced by the path/body
    /// are recorded alongside so reconciliation can find this entry later.
    pub fn enqueue(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
        temp_id: Option<&str>,
    ) -> AppResult<OfflineMutation> {
        let refs = reconcile::collect_temp_refs(path, body.as_ref());
        let mut store = self.store.lock().expect("client store poisoned");
        store.insert_mutation(path, method, body.as_ref(), temp_id, &refs)
    }

    pub fn pending(&self) -> AppResult<Vec<OfflineMutation>> {
        self.store
            .lock()
            .expect("client store poisoned")
            .pending_mutations()
    }

    /// Process queued entries strictly in insertion order. Per entry:
    /// expired session clears the rest of the queue; any other client
    /// error drops just that entry; transient failures stop the pass with
    /// order preserved.
    pub async fn drain(&self, transport: &dyn Transport) -> AppResult<DrainReport> {
        if self.draining.swap(true, Ordering::SeqCst) {
            return Ok(DrainReport {
                skipped: true,
                ..DrainReport::default()
            });
        }
        let result = self.drain_inner(transport).await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain_inner(&self, transport: &dyn Transport) -> AppResult<DrainReport> {
        let mut report = DrainReport::default();

        loop {
            // Re-read the head each round: reconciliation may have
            // rewritten entries behind it.
            let next = {
                let store = self.store.lock().expect("client store poisoned");
                store.oldest_mutation()?
            };
            let Some(mutation) = next else { break };

            let reply = match transport.execute(&mutation).await {
                Ok(reply) => reply,
                Err(err) => {
                    debug!(path = %mutation.path, %err, "transient failure, queue preserved");
                    report.halted = true;
                    break;
                }
            };

            match reply.status {
                401 => {
                    warn!(
                        path = %mutation.path,
                        "session expired, clearing offline queue"
                    );
                    let store = self.store.lock().expect("client store poisoned");
                    store.clear_mutations()?;
                    report.cleared = true;
                    break;
                }
                status if (200..300).contains(&status) => {
                    self.on_applied(&mutation, &reply)?;
                    let store = self.store.lock().expect("client store poisoned");
                    store.delete_mutation(mutation.id)?;
                    report.applied += 1;
                }
                status if (400..500).contains(&status) => {
                    warn!(
                        path = %mutation.path,
                        status,
                        "mutation rejected by server, dropping it"
                    );
                    let store = self.store.lock().expect("client store poisoned");
                    store.delete_mutation(mutation.id)?;
                    report.dropped += 1;
                }
                status => {
                    debug!(path = %mutation.path, status, "server failure, queue preserved");
                    report.halted = true;
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Post-success bookkeeping: reconcile a temp id against the canonical
    /// one the server replied with, then refresh the entity cache.
    fn on_applied(&self, mutation: &OfflineMutation, reply: &MutationReply) -> AppResult<()> {
        let mut store = self.store.lock().expect("client store poisoned");

        if let Some(temp_id) = &mutation.temp_id
            && let Some(canonical_id) = reply
                .body
                .as_ref()
                .and_then(|body| body.get("id"))
                .and_then(Value::as_str)
            && canonical_id != temp_id
        {
            reconcile::apply(&mut store, temp_id, canonical_id)?;
        }

        match mutation.method {
            Method::Post | Method::Put | Method::Patch => {
                if let Some(body) = reply.body.as_ref().or(mutation.body.as_ref())
                    && let Some(id) = body.get("id").and_then(Value::as_str)
                {
                    store.put_entity(id, entity_kind(&mutation.path), body)?;
                }
            }
            Method::Delete => {
                if let Some(id) = mutation.path.rsplit('/').next() {
                    store.delete_entity(id)?;
                }
            }
            Method::Get => {}
        }
        Ok(())
    }
}

/// First meaningful path segment, e.g. "/api/teams/tmp-x" → "teams".
fn entity_kind(path: &str) -> &str {
    path.split('/')
        .find(|seg| !seg.is_empty() && *seg != "api")
        .unwrap_or("entity")
}
