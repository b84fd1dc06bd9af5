//! Statistics engine
//!
//! Aggregates a trailing window of day records into the user-facing
//! counters. The scan walks backward from today (offset 0) through the
//! whole window; a day without a record contributes zero and never stops
//! the scan.

use chrono::{Duration, NaiveDate};

use crate::types::{DayRecordMap, UserStatsSnapshot};

/// Length of the trailing statistics window, in days.
pub const WINDOW_DAYS: i64 = 365;

/// Compute the aggregate snapshot over the trailing window ending today.
///
/// The streak is a genuine consecutive run: it counts completed days
/// starting at offset 0 and stops at the first non-completed day, so an
/// incomplete today always yields a streak of 0 regardless of history.
pub fn compute(map: &DayRecordMap, today: NaiveDate) -> UserStatsSnapshot {
    let mut total_moments = 0u64;
    let mut current_streak = 0u32;
    let mut days_completed = 0u32;
    let mut last_activity = None;
    let mut streak_alive = true;

    for offset in 0..WINDOW_DAYS {
        let date = today - Duration::days(offset);
        let key = calendar::day_key(date);

        let (count, completed) = map
            .get(&key)
            .map(|record| (record.count, record.completed))
            .unwrap_or((0, false));

        total_moments += u64::from(count);

        if completed {
            days_completed += 1;
        }

        if streak_alive {
            if completed {
                current_streak += 1;
            } else {
                streak_alive = false;
            }
        }

        if last_activity.is_none() && count > 0 {
            last_activity = Some(key);
        }
    }

    UserStatsSnapshot { total_moments, current_streak, days_completed, last_activity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DayRecord, Platform, PrayerMoment, MAX_MOMENTS_PER_DAY};

    fn day_with_count(key: &str, count: u32) -> DayRecord {
        let mut record = DayRecord::empty(key);
        for i in 0..count {
            record.push_moment(
                PrayerMoment { timestamp: i as i64, platform: Platform::Web, duration: 60 },
                MAX_MOMENTS_PER_DAY,
            );
        }
        record
    }

    fn map_of(days: &[(&str, u32)]) -> DayRecordMap {
        let mut map = DayRecordMap::new();
        for (key, count) in days {
            map.insert(key.to_string(), day_with_count(key, *count));
        }
        map
    }

    fn today() -> NaiveDate {
        calendar::parse_day_key("2025-10-14").unwrap()
    }

    #[test]
    fn test_empty_map() {
        let stats = compute(&DayRecordMap::new(), today());
        assert_eq!(stats, UserStatsSnapshot::default());
        assert_eq!(stats.last_activity, None);
    }

    #[test]
    fn test_streak_of_three_consecutive_days() {
        // Today and the two days before are completed; the day before
        // that is not.
        let map = map_of(&[
            ("2025-10-11", 2),
            ("2025-10-12", 7),
            ("2025-10-13", 7),
            ("2025-10-14", 7),
        ]);

        let stats = compute(&map, today());
        assert_eq!(stats.current_streak, 3);
    }

    #[test]
    fn test_streak_zero_when_today_incomplete() {
        // History is completed but today is not: the run stops at offset 0.
        let map = map_of(&[
            ("2025-10-12", 7),
            ("2025-10-13", 7),
            ("2025-10-14", 3),
        ]);

        let stats = compute(&map, today());
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.days_completed, 2);
    }

    #[test]
    fn test_streak_not_total_completed_days() {
        // A completed day beyond a gap must not extend the streak.
        let map = map_of(&[
            ("2025-10-10", 7),
            ("2025-10-13", 7),
            ("2025-10-14", 7),
        ]);

        let stats = compute(&map, today());
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.days_completed, 3);
    }

    #[test]
    fn test_totals_and_completed_count() {
        let map = map_of(&[
            ("2025-10-12", 7),
            ("2025-10-13", 3),
            ("2025-10-14", 0),
        ]);

        let stats = compute(&map, today());
        assert_eq!(stats.total_moments, 10);
        assert_eq!(stats.days_completed, 1);
    }

    #[test]
    fn test_last_activity_is_most_recent_active_day() {
        let map = map_of(&[
            ("2025-10-01", 5),
            ("2025-10-10", 2),
        ]);

        let stats = compute(&map, today());
        assert_eq!(stats.last_activity, Some("2025-10-10".to_string()));
    }

    #[test]
    fn test_days_outside_window_are_ignored() {
        let map = map_of(&[
            ("2023-01-01", 7), // far outside the 365-day window
            ("2025-10-14", 2),
        ]);

        let stats = compute(&map, today());
        assert_eq!(stats.total_moments, 2);
        assert_eq!(stats.days_completed, 0);
    }
}
