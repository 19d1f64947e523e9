use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of every client-invented identifier. Reconciliation only ever
/// rewrites tokens carrying this prefix, so canonical ids can never be
/// mistaken for temporary ones.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Generate a fresh temporary id for an entity created while offline.
pub fn new_temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

pub fn is_temp_id(s: &str) -> bool {
    s.starts_with(TEMP_ID_PREFIX)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

/// A generic queued write against the server, replayed FIFO on reconnect.
/// Removed from the durable queue only on a terminal outcome: confirmed
/// success or a confirmed non-retryable client error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineMutation {
    /// Queue rowid; 0 until persisted.
    pub id: i64,
    pub path: String,
    pub method: Method,
    pub body: Option<serde_json::Value>,
    pub queued_at: DateTime<Utc>,
    /// Locally-invented id for an entity created offline, if any.
    pub temp_id: Option<String>,
}
