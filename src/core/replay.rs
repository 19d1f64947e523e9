//! Stateful replay of an ordered event stream into day buckets.
//!
//! The rule set is deliberately small: a user accrues time from CLOCK_IN,
//! START_TASK or STOP_TASK until the next CLOCK_OUT. Stopping a task does
//! not stop the clock (time between tasks still counts), and breaks do not
//! change the persisted clocked-in state; they are only subtracted from
//! the live dashboard delta.

use crate::core::buckets::{DayBuckets, accumulate};
use crate::models::EventKind;
use chrono::NaiveDateTime;

/// An event projected onto the local wall clock, ready for replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayEvent {
    pub at: NaiveDateTime,
    pub kind: EventKind,
}

/// Clocked-in state implied by the last state-changing event strictly
/// before a replay window. `None` means no prior event exists.
pub fn seed_state(last_kind_before: Option<EventKind>) -> bool {
    last_kind_before
        .and_then(|kind| kind.clocks_in())
        .unwrap_or(false)
}

/// Replay `events` (already ordered by timestamp, all at or after
/// `window_start`) into day buckets.
///
/// `seed_clocked_in` is the state at `window_start`; when true, accrual
/// begins at the window boundary itself. When `extend_to` is set and the
/// stream leaves the user clocked in, the trailing open segment is
/// accumulated up to that instant, used only for live reads. Persisted
/// recomputes pass `None` and stop at the last event, so the cache never
/// has to be rewritten just because time passed.
pub fn replay_day_buckets(
    events: &[ReplayEvent],
    seed_clocked_in: bool,
    window_start: NaiveDateTime,
    extend_to: Option<NaiveDateTime>,
) -> DayBuckets {
    let mut buckets = DayBuckets::new();
    let mut clocked_in = seed_clocked_in;
    let mut segment_start = window_start;

    for ev in events {
        if clocked_in && ev.at > segment_start {
            accumulate(&mut buckets, segment_start, ev.at);
        }
        if let Some(state) = ev.kind.clocks_in() {
            clocked_in = state;
        }
        segment_start = ev.at;
    }

    if let Some(horizon) = extend_to
        && clocked_in
        && horizon > segment_start
    {
        accumulate(&mut buckets, segment_start, horizon);
    }

    buckets
}
