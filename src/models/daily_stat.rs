use chrono::NaiveDate;
use serde::Serialize;

/// Materialized per-day worked total for one (user, team-or-none) pair.
/// Derived, never authoritative: always reproducible by replaying the
/// user's full event stream for that day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyStat {
    pub user_id: String,
    pub team_id: Option<String>,
    pub date: NaiveDate,
    pub worked_ms: i64,
}
