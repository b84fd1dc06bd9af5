//! Calendar utilities for Prayer Moments
//!
//! This crate provides day-key conversion and month-grid generation.
//! Day keys are canonical `YYYY-MM-DD` strings in the local calendar;
//! the month grid is the 6-week (42-cell) layout used by the calendar view.

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

/// Number of cells in the month grid (6 weeks of 7 days).
pub const GRID_CELLS: usize = 42;

/// Format a date as a canonical `YYYY-MM-DD` day key.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Get today's day key from the local runtime clock.
pub fn today_key() -> String {
    day_key(Local::now().date_naive())
}

/// Parse a canonical `YYYY-MM-DD` day key back into a date.
///
/// Parsing is strict: the input must round-trip exactly, so
/// non-zero-padded or otherwise non-canonical strings are rejected.
/// Returns `None` for anything that is not a valid day key.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()?;
    if day_key(date) == key {
        Some(date)
    } else {
        None
    }
}

/// Check whether a string is a syntactically valid day key.
pub fn is_valid_day_key(key: &str) -> bool {
    parse_day_key(key).is_some()
}

/// Get the first day of a month. `month0` is 0-based (0 = January).
///
/// Returns `None` for an out-of-range month.
pub fn month_start(year: i32, month0: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

/// Get the number of days in a month. `month0` is 0-based.
///
/// Returns `None` for an out-of-range month.
pub fn days_in_month(year: i32, month0: u32) -> Option<u32> {
    let first = month_start(year, month0)?;
    let next = if month0 == 11 {
        month_start(year + 1, 0)?
    } else {
        month_start(year, month0 + 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Generate the 42-cell month grid for a 0-based month.
///
/// The grid starts on the Sunday on or before the 1st of the month and
/// covers six full weeks, so leading and trailing cells belong to the
/// adjacent months. Returns an empty vector for an out-of-range month.
pub fn month_grid(year: i32, month0: u32) -> Vec<NaiveDate> {
    let Some(first) = month_start(year, month0) else {
        return Vec::new();
    };

    let offset = first.weekday().num_days_from_sunday() as i64;
    let start = first - Duration::days(offset);

    (0..GRID_CELLS as i64)
        .map(|i| start + Duration::days(i))
        .collect()
}

/// Check whether two dates fall on the same calendar day.
pub fn is_same_day(a: NaiveDate, b: NaiveDate) -> bool {
    a == b
}

/// Check whether a date is a Sunday.
pub fn is_sunday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}
