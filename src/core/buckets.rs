//! Calendar-day bucket accumulation.

use crate::utils::time::next_midnight;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Worked milliseconds keyed by local calendar date.
pub type DayBuckets = BTreeMap<NaiveDate, i64>;

/// Attribute the half-open interval `[start, end)` to one or more day
/// buckets, splitting at local midnight. Walks forward one day at a time,
/// so the amounts added sum to exactly `end − start` no matter how many
/// midnights the interval crosses.
pub fn accumulate(buckets: &mut DayBuckets, start: NaiveDateTime, end: NaiveDateTime) {
    let mut current = start;
    while current < end {
        let split = next_midnight(current).min(end);
        let ms = (split - current).num_milliseconds();
        if ms > 0 {
            *buckets.entry(current.date()).or_insert(0) += ms;
        }
        current = split;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn same_day_interval_lands_in_one_bucket() {
        let mut buckets = DayBuckets::new();
        accumulate(&mut buckets, dt(2025, 3, 10, 9, 0), dt(2025, 3, 10, 17, 15));
        assert_eq!(buckets.len(), 1);
        assert_eq!(
            buckets[&NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()],
            (8 * 60 + 15) * 60_000
        );
    }

    #[test]
    fn midnight_crossing_splits_exactly() {
        let mut buckets = DayBuckets::new();
        accumulate(&mut buckets, dt(2025, 3, 10, 23, 30), dt(2025, 3, 11, 0, 30));
        assert_eq!(
            buckets[&NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()],
            30 * 60_000
        );
        assert_eq!(
            buckets[&NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()],
            30 * 60_000
        );
    }

    #[test]
    fn multi_day_interval_conserves_total() {
        let mut buckets = DayBuckets::new();
        let start = dt(2025, 3, 10, 18, 47);
        let end = dt(2025, 3, 14, 6, 12);
        accumulate(&mut buckets, start, end);
        let total: i64 = buckets.values().sum();
        assert_eq!(total, (end - start).num_milliseconds());
        assert_eq!(buckets.len(), 5);
    }

    #[test]
    fn empty_interval_adds_nothing() {
        let mut buckets = DayBuckets::new();
        accumulate(&mut buckets, dt(2025, 3, 10, 9, 0), dt(2025, 3, 10, 9, 0));
        assert!(buckets.is_empty());
    }
}
