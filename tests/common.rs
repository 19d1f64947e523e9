#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::collections::VecDeque;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use worksync::errors::{AppError, AppResult};
use worksync::models::{EventKind, OfflineMutation, TimeEvent};

pub fn ws() -> Command {
    cargo_bin_cmd!("worksync")
}

/// Create a unique test DB path inside the system temp dir and remove any
/// existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_worksync.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    std::fs::remove_file(&db_path).ok();
    db_path
}

/// A UTC instant built from local wall-clock components, so replay tests
/// are deterministic regardless of the machine timezone.
pub fn local_utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

pub fn event(
    user: &str,
    kind: EventKind,
    at: DateTime<Utc>,
    team: Option<&str>,
) -> TimeEvent {
    let ev = TimeEvent::new(user, kind, at);
    match team {
        Some(team) => ev.with_team(team),
        None => ev,
    }
}

/// One scripted answer for `Transport::execute`.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// HTTP status with no body.
    Status(u16),
    /// 201 with a JSON body (e.g. the canonical id of a created entity).
    Created(serde_json::Value),
    /// Transport-level failure (network error).
    NetworkError,
}

/// Transport double that records every call and answers from a script.
/// Unscripted calls succeed with 200.
#[derive(Default)]
pub struct ScriptedTransport {
    pub replies: Mutex<VecDeque<ScriptedReply>>,
    pub probe_script: Mutex<VecDeque<bool>>,
    pub push_statuses: Mutex<VecDeque<u16>>,
    pub executed: Mutex<Vec<OfflineMutation>>,
    pub pushed: Mutex<Vec<Vec<TimeEvent>>>,
    /// Artificial latency, to hold a sync pass in flight.
    pub push_delay: Option<Duration>,
    pub execute_delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_replies(&self, replies: impl IntoIterator<Item = ScriptedReply>) {
        self.replies.lock().unwrap().extend(replies);
    }

    pub fn script_probes(&self, results: impl IntoIterator<Item = bool>) {
        self.probe_script.lock().unwrap().extend(results);
    }

    pub fn script_push_statuses(&self, statuses: impl IntoIterator<Item = u16>) {
        self.push_statuses.lock().unwrap().extend(statuses);
    }

    pub fn executed_paths(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.path.clone())
            .collect()
    }
}

#[async_trait]
impl worksync::client::transport::Transport for ScriptedTransport {
    async fn probe(&self) -> AppResult<()> {
        let ok = self.probe_script.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(AppError::Sync("probe unreachable".to_string()))
        }
    }

    async fn execute(
        &self,
        mutation: &OfflineMutation,
    ) -> AppResult<worksync::client::transport::MutationReply> {
        if let Some(delay) = self.execute_delay {
            tokio::time::sleep(delay).await;
        }
        self.executed.lock().unwrap().push(mutation.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedReply::Status(200));
        match reply {
            ScriptedReply::Status(status) => Ok(worksync::client::transport::MutationReply {
                status,
                body: None,
            }),
            ScriptedReply::Created(body) => Ok(worksync::client::transport::MutationReply {
                status: 201,
                body: Some(body),
            }),
            ScriptedReply::NetworkError => Err(AppError::Sync("connection reset".to_string())),
        }
    }

    async fn push_events(
        &self,
        events: &[TimeEvent],
    ) -> AppResult<worksync::client::transport::PushReply> {
        if let Some(delay) = self.push_delay {
            tokio::time::sleep(delay).await;
        }
        self.pushed.lock().unwrap().push(events.to_vec());
        let status = self
            .push_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(200);
        Ok(worksync::client::transport::PushReply { status })
    }
}
