//! Network seam between the client components and the server. The trait
//! exists so the queue, orchestrator and connectivity monitor can be
//! driven against a scripted transport in tests; `HttpTransport` is the
//! real reqwest-backed implementation.

use crate::errors::{AppError, AppResult};
use crate::models::{Method, OfflineMutation, TimeEvent};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;

/// Outcome of replaying one queued mutation. Classification into the
/// retry taxonomy happens in the queue, not here.
#[derive(Debug, Clone)]
pub struct MutationReply {
    pub status: u16,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct PushReply {
    pub status: u16,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Cheap reachability check. Timeouts and transport errors are the
    /// same thing to callers: unreachable.
    async fn probe(&self) -> AppResult<()>;

    /// Replay one queued write.
    async fn execute(&self, mutation: &OfflineMutation) -> AppResult<MutationReply>;

    /// Push one batch of pending time events.
    async fn push_events(&self, events: &[TimeEvent]) -> AppResult<PushReply>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, bearer: Option<&str>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer: bearer.map(str::to_string),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self) -> AppResult<()> {
        // Cache-busting query param so intermediaries can't answer for a
        // dead server.
        let url = format!("{}?ts={}", self.url("health"), Utc::now().timestamp_millis());
        let resp = self.client.head(&url).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Rejected(resp.status().as_u16()))
        }
    }

    async fn execute(&self, mutation: &OfflineMutation) -> AppResult<MutationReply> {
        let url = self.url(&mutation.path);
        let req = match mutation.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        let req = self.authorize(req);
        let req = match &mutation.body {
            Some(body) => req.json(body),
            None => req,
        };

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.ok();
        Ok(MutationReply { status, body })
    }

    async fn push_events(&self, events: &[TimeEvent]) -> AppResult<PushReply> {
        let req = self
            .authorize(self.client.post(self.url("api/sync/events")))
            .json(&serde_json::json!({ "events": events }));

        let resp = req.send().await?;
        Ok(PushReply {
            status: resp.status().as_u16(),
        })
    }
}
