pub mod connectivity;
pub mod event_log;
pub mod orchestrator;
pub mod queue;
pub mod reconcile;
pub mod store;
pub mod transport;

use crate::config::Config;
use crate::errors::AppResult;
use connectivity::{ConnectivityMonitor, SyncReason};
use event_log::EventLog;
use orchestrator::{SyncOrchestrator, spawn_sync_loop};
use queue::MutationQueue;
use std::sync::Arc;
use store::ClientStore;
use tokio::sync::mpsc;
use transport::{HttpTransport, Transport};

/// The fully wired client half: durable store, mutation queue, event log,
/// connectivity monitor and the background sync loop.
pub struct ClientRuntime {
    pub monitor: ConnectivityMonitor,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl ClientRuntime {
    /// Assemble every client component from configuration and spawn the
    /// sync loop. `bearer` is the session credential issued by the
    /// external identity service. Must run inside a tokio runtime.
    pub fn start(cfg: &Config, bearer: &str) -> AppResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            &cfg.server_url,
            Some(bearer),
            cfg.probe_timeout(),
        )?);

        let store = ClientStore::open(&cfg.client_database)?.into_shared();
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel::<SyncReason>();

        let monitor =
            ConnectivityMonitor::new(transport.clone(), cfg.backoff_policy(), trigger_tx);
        let orchestrator = Arc::new(SyncOrchestrator::new(
            MutationQueue::new(store.clone()),
            EventLog::new(store),
            transport,
        ));
        spawn_sync_loop(orchestrator.clone(), trigger_rx, Some(cfg.sync_interval()));

        Ok(Self {
            monitor,
            orchestrator,
        })
    }
}
