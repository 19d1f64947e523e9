//! Live dashboard composition: cached day buckets plus the in-progress
//! session delta. Nothing here is persisted.

use crate::core::replay::ReplayEvent;
use crate::models::EventKind;
use crate::utils::time::ms_to_hours;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Totals returned by the dashboard read path. `live_ms` is already folded
/// into `today_ms` and `week_ms`; it is reported separately so a client
/// can tick it forward between reads.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardTotals {
    pub team_id: Option<String>,
    pub today_ms: i64,
    pub week_ms: i64,
    pub live_ms: i64,
}

impl DashboardTotals {
    pub fn compose(
        team_id: Option<String>,
        today_cached: i64,
        week_cached: i64,
        live_ms: i64,
    ) -> Self {
        Self {
            team_id,
            today_ms: today_cached + live_ms,
            week_ms: week_cached + live_ms,
            live_ms,
        }
    }

    pub fn today_hours(&self) -> f64 {
        ms_to_hours(self.today_ms)
    }

    pub fn week_hours(&self) -> f64 {
        ms_to_hours(self.week_ms)
    }
}

/// Delta of the in-progress session, if any: `now − session_start` minus
/// break time accumulated since the session started. Zero when the most
/// recent clock event is a CLOCK_OUT (or no clock event exists).
pub fn live_session_ms(events: &[ReplayEvent], now: NaiveDateTime) -> i64 {
    let session_start = match events
        .iter()
        .rev()
        .find(|ev| matches!(ev.kind, EventKind::ClockIn | EventKind::ClockOut))
    {
        Some(ev) if ev.kind == EventKind::ClockIn => ev.at,
        _ => return 0,
    };

    let mut break_ms = 0i64;
    let mut open_break: Option<NaiveDateTime> = None;
    for ev in events.iter().filter(|ev| ev.at >= session_start) {
        match ev.kind {
            EventKind::BreakStart => open_break = Some(ev.at),
            EventKind::BreakEnd => {
                if let Some(started) = open_break.take() {
                    break_ms += (ev.at.min(now) - started).num_milliseconds();
                }
            }
            _ => {}
        }
    }
    if let Some(started) = open_break {
        break_ms += (now - started).num_milliseconds().max(0);
    }

    ((now - session_start).num_milliseconds() - break_ms).max(0)
}
