//! Append-only local log of time events awaiting server acknowledgment.
//!
//! An entry is written synchronously the moment the user acts, so the
//! optimistic UI result is backed by durable storage before any network
//! is involved. Entries are never edited; acknowledgment deletes them
//! from the pending set (the server keeps the durable copy).

use crate::client::store::SharedStore;
use crate::errors::AppResult;
use crate::models::TimeEvent;

pub struct EventLog {
    store: SharedStore,
}

impl EventLog {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn log_event(&self, event: &TimeEvent) -> AppResult<()> {
        self.store
            .lock()
            .expect("client store poisoned")
            .insert_pending_event(event)
    }

    /// All events still waiting for a server accept, oldest first.
    pub fn pending_events(&self) -> AppResult<Vec<TimeEvent>> {
        self.store
            .lock()
            .expect("client store poisoned")
            .pending_events()
    }

    /// Remove exactly the acknowledged ids from the pending set.
    pub fn acknowledge(&self, ids: &[String]) -> AppResult<usize> {
        self.store
            .lock()
            .expect("client store poisoned")
            .delete_events(ids)
    }
}
