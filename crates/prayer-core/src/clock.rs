//! Clock abstraction
//!
//! Day keys are derived from the local calendar date, so the date source is
//! injected rather than read ambiently: the repository and statistics
//! engine take a `Clock`, production code passes `SystemClock`, and tests
//! pin time with `FixedClock`.

use chrono::{Local, NaiveDate, Utc};

/// Source of the local calendar date and the current timestamp
pub trait Clock: Send + Sync {
    /// Today's date in the local calendar (no timezone conversion).
    fn today(&self) -> NaiveDate;

    /// Current time in milliseconds since epoch.
    fn now_millis(&self) -> i64;
}

/// Clock backed by the local runtime clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock pinned to a fixed instant, for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
    now_millis: i64,
}

impl FixedClock {
    /// Create a clock pinned to the given date and timestamp.
    pub fn new(today: NaiveDate, now_millis: i64) -> Self {
        Self { today, now_millis }
    }

    /// Create a clock pinned to a day key, with the timestamp at an
    /// arbitrary instant within that day.
    pub fn on_day(key: &str) -> Option<Self> {
        let today = calendar::parse_day_key(key)?;
        let now_millis = today
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        Some(Self { today, now_millis })
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now_millis(&self) -> i64 {
        self.now_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_on_day() {
        let clock = FixedClock::on_day("2025-10-14").unwrap();
        assert_eq!(calendar::day_key(clock.today()), "2025-10-14");
        assert!(clock.now_millis() > 0);
    }

    #[test]
    fn test_fixed_clock_rejects_invalid_key() {
        assert!(FixedClock::on_day("2025-13-01").is_none());
    }

    #[test]
    fn test_system_clock_is_consistent() {
        let clock = SystemClock;
        // The timestamp and the date come from the same instant family
        assert!(clock.now_millis() > 0);
        let _ = clock.today();
    }
}
