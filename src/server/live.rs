//! Per-user live channel for refreshed totals. In-process broadcast:
//! delivery to websockets/push infrastructure is an external concern.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsUpdate {
    pub team_id: Option<String>,
    pub total_hours_today: f64,
    pub total_hours_week: f64,
}

#[derive(Clone, Default)]
pub struct LiveHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<StatsUpdate>>>>,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<StatsUpdate> {
        let mut channels = self.channels.lock().expect("live hub lock poisoned");
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Fire-and-forget: a user with no live subscribers just drops the
    /// update on the floor.
    pub fn publish(&self, user_id: &str, update: StatsUpdate) {
        let channels = self.channels.lock().expect("live hub lock poisoned");
        if let Some(sender) = channels.get(user_id) {
            let _ = sender.send(update);
        }
    }
}
