//! Connectivity detection and backoff-driven probe scheduling.
//!
//! The monitor never polls forever: after a bounded number of failed
//! probes it goes passive and waits for the next OS-level network signal
//! or an app-foreground event.

use crate::client::transport::Transport;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    Online,
    Offline,
    ServerUnreachable,
}

/// Why a sync pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    ConnectivityRestored,
    Manual,
    Interval,
}

/// Retry schedule: `min(base·2^attempt, cap)` plus a random jitter.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub jitter: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(60),
            jitter: Duration::from_millis(500),
            max_attempts: 6,
        }
    }
}

impl BackoffPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.cap);
        let jitter_ms = if self.jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64)
        };
        exp + Duration::from_millis(jitter_ms)
    }
}

type StatusWatcher = Box<dyn Fn(ConnStatus) + Send + Sync>;

struct MonitorInner {
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
    status: Mutex<ConnStatus>,
    watchers: Mutex<Vec<StatusWatcher>>,
    sync_trigger: UnboundedSender<SyncReason>,
    probing: AtomicBool,
}

/// Explicitly constructed service: owns no global state, gets its
/// transport and trigger channel injected. Cheap to clone; clones share
/// the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: BackoffPolicy,
        sync_trigger: UnboundedSender<SyncReason>,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                transport,
                policy,
                status: Mutex::new(ConnStatus::Offline),
                watchers: Mutex::new(Vec::new()),
                sync_trigger,
                probing: AtomicBool::new(false),
            }),
        }
    }

    pub fn status(&self) -> ConnStatus {
        *self.inner.status.lock().expect("status lock poisoned")
    }

    /// Register a callback fired on every status transition.
    pub fn on_transition(&self, watcher: impl Fn(ConnStatus) + Send + Sync + 'static) {
        self.inner
            .watchers
            .lock()
            .expect("watchers lock poisoned")
            .push(Box::new(watcher));
    }

    /// Manual "sync now" entry point.
    pub fn request_sync(&self) {
        let _ = self.inner.sync_trigger.send(SyncReason::Manual);
    }

    /// The OS reports the network interface up: verify the server is
    /// actually reachable before declaring victory.
    pub fn network_up(&self) {
        self.spawn_probe();
    }

    /// The OS reports the interface down. No probe needed.
    pub fn network_down(&self) {
        self.inner.set_status(ConnStatus::Offline);
    }

    /// App brought to the foreground: re-probe immediately even if a
    /// previous probe cycle gave up.
    pub fn foreground(&self) {
        self.spawn_probe();
    }

    /// At most one probe cycle at a time; concurrent signals collapse.
    fn spawn_probe(&self) {
        if self.inner.probing.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.probe_cycle().await;
            inner.probing.store(false, Ordering::SeqCst);
        });
    }
}

impl MonitorInner {
    fn set_status(&self, new_status: ConnStatus) {
        {
            let mut status = self.status.lock().expect("status lock poisoned");
            if *status == new_status {
                return;
            }
            *status = new_status;
        }
        info!(?new_status, "connectivity transition");
        for watcher in self.watchers.lock().expect("watchers lock poisoned").iter() {
            watcher(new_status);
        }
    }

    async fn probe_cycle(&self) {
        for attempt in 0..self.policy.max_attempts {
            match self.transport.probe().await {
                Ok(()) => {
                    self.set_status(ConnStatus::Online);
                    let _ = self.sync_trigger.send(SyncReason::ConnectivityRestored);
                    return;
                }
                Err(err) => {
                    // Timeouts and transport errors are the same outcome.
                    debug!(attempt, %err, "probe failed");
                    self.set_status(ConnStatus::ServerUnreachable);
                    if attempt + 1 < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay(attempt)).await;
                    }
                }
            }
        }
        debug!("probe attempts exhausted, waiting for the next network signal");
    }
}
