//! Time utilities: UTC↔local conversion, day boundaries, duration formatting.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, Utc, Weekday};

/// Convert a UTC instant into the local wall clock the replay engine
/// buckets against. Single conversion point: a per-user timezone later
/// only changes this function.
pub fn to_local_naive(ts: DateTime<Utc>) -> NaiveDateTime {
    ts.with_timezone(&Local).naive_local()
}

/// First instant of the day after the one containing `at` (local midnight).
pub fn next_midnight(at: NaiveDateTime) -> NaiveDateTime {
    let next_day = at
        .date()
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);
    next_day.and_hms_opt(0, 0, 0).unwrap_or(NaiveDateTime::MAX)
}

/// Monday..Sunday bounds of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let week = date.week(Weekday::Mon);
    (week.first_day(), week.last_day())
}

pub fn ms_to_hours(ms: i64) -> f64 {
    ms as f64 / 3_600_000.0
}

/// Format a millisecond total as "HH:MM" (sign-aware).
pub fn format_ms(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let mins = ms.abs() / 60_000;
    format!("{}{:02}:{:02}", sign, mins / 60, mins % 60)
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now_local_naive() -> NaiveDateTime {
    Local::now().naive_local()
}
