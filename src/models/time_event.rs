use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a time event. The first four drive the clocked-in state used by
/// the replay engine; breaks only affect the live dashboard delta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    ClockIn,
    ClockOut,
    StartTask,
    StopTask,
    BreakStart,
    BreakEnd,
}

impl EventKind {
    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EventKind::ClockIn => "clock_in",
            EventKind::ClockOut => "clock_out",
            EventKind::StartTask => "start_task",
            EventKind::StopTask => "stop_task",
            EventKind::BreakStart => "break_start",
            EventKind::BreakEnd => "break_end",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "clock_in" => Some(EventKind::ClockIn),
            "clock_out" => Some(EventKind::ClockOut),
            "start_task" => Some(EventKind::StartTask),
            "stop_task" => Some(EventKind::StopTask),
            "break_start" => Some(EventKind::BreakStart),
            "break_end" => Some(EventKind::BreakEnd),
            _ => None,
        }
    }

    /// Whether time accrues after this event. Stopping a task keeps the
    /// user on the clock; only a clock-out ends accrual.
    pub fn clocks_in(&self) -> Option<bool> {
        match self {
            EventKind::ClockIn | EventKind::StartTask | EventKind::StopTask => Some(true),
            EventKind::ClockOut => Some(false),
            EventKind::BreakStart | EventKind::BreakEnd => None,
        }
    }
}

/// The atomic fact of the system: a clock/task/break transition.
/// Immutable once accepted by the server; re-submission under the same
/// client-chosen `id` overwrites fields instead of duplicating the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEvent {
    /// Client-generated, globally unique. Doubles as the idempotency key.
    pub id: String,
    pub user_id: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TimeEvent {
    /// Constructor for events created by a local user action.
    pub fn new(user_id: &str, kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            timestamp,
            task_id: None,
            team_id: None,
            note: None,
        }
    }

    pub fn with_task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    pub fn with_team(mut self, team_id: &str) -> Self {
        self.team_id = Some(team_id.to_string());
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }
}
