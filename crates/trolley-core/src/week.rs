//! Week period math.
//!
//! Lists are keyed by the Monday of their calendar week. The mapping from an
//! arbitrary date to that Monday must not depend on locale day-of-week
//! numbering; in particular Sunday belongs to the week that *started* the
//! previous Monday.

use chrono::{Datelike, Days, NaiveDate};

/// Length of a period in days.
pub const PERIOD_DAYS: u64 = 7;

/// The Monday-anchored period key for `date`.
///
/// Idempotent: `period_start(period_start(d)) == period_start(d)`.
pub fn period_start(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday() as u64;
    // num_days_from_monday is 0..=6, so this cannot underflow a valid date.
    date.checked_sub_days(Days::new(days_from_monday))
        .unwrap_or(date)
}

/// Last day of the period starting at `start` (inclusive).
pub fn period_end(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_days(Days::new(PERIOD_DAYS - 1))
        .unwrap_or(start)
}

/// Period key `offset` whole weeks away from `start` (negative = past).
pub fn period_offset(start: NaiveDate, offset: i64) -> NaiveDate {
    let days = offset * PERIOD_DAYS as i64;
    if days >= 0 {
        start
            .checked_add_days(Days::new(days as u64))
            .unwrap_or(start)
    } else {
        start
            .checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(start)
    }
}
