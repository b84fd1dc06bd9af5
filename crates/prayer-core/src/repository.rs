//! Prayer record repository
//!
//! The single authoritative API for recording and querying prayer
//! activity. The repository owns the day-record map: every mutation is a
//! load-modify-persist of the whole map through the storage adapter, so
//! the write unit is the entire payload and a same-tick read observes the
//! update through the fallback mirror.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use storage::{ChannelStore, StorageAdapter, StorageError};

use crate::clock::Clock;
use crate::stats;
use crate::types::{
    keys, AppConfig, DayRecord, DayRecordMap, MonthView, Platform, PlatformInfo, PrayerMoment,
    UserStatsSnapshot,
};

/// Repository error types
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Outcome of a recording attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The moment was recorded; `count` is the day's new total
    Recorded {
        /// The day's moment count after this recording
        count: u32,
    },
    /// The day is already at the cap; nothing was recorded
    LimitReached,
}

/// Single authoritative API for prayer activity
pub struct PrayerRepository {
    adapter: Arc<StorageAdapter>,
    channel: Option<Arc<ChannelStore>>,
    clock: Arc<dyn Clock>,
    config: AppConfig,
    user_agent: String,
}

impl PrayerRepository {
    /// Create a repository over an initialized adapter.
    pub fn new(adapter: Arc<StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            adapter,
            channel: None,
            clock,
            config: AppConfig::default(),
            user_agent: String::new(),
        }
    }

    /// Attach the secondary channel store so `clear_all` reaches it.
    pub fn with_channel(mut self, channel: Arc<ChannelStore>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Set the host-reported user agent stamped into platform records.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Replace the configuration (otherwise defaults apply).
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load any stored configuration override, keeping defaults when the
    /// `app_config` key is absent.
    pub async fn load_config(&mut self) {
        self.config = self
            .adapter
            .read_or(keys::APP_CONFIG, AppConfig::default())
            .await;
    }

    /// Today's day key from the injected clock.
    pub fn today_key(&self) -> String {
        calendar::day_key(self.clock.today())
    }

    async fn load_map(&self) -> DayRecordMap {
        // A missing or undecodable payload reads as an empty history.
        self.adapter
            .read(keys::PRAYER_DATA)
            .await
            .unwrap_or_default()
    }

    /// Record a prayer moment for today.
    ///
    /// The day's record is synthesized on first use. Once the day is at
    /// the cap the ceiling is absorbing: further calls return
    /// `LimitReached` without touching storage until the date changes.
    /// Persistence is a whole-map rewrite.
    pub async fn record_moment(&self, platform: Platform) -> Result<RecordOutcome> {
        let today = self.today_key();
        let mut map = self.load_map().await;

        let mut day = map
            .get(&today)
            .cloned()
            .unwrap_or_else(|| DayRecord::empty(&today));

        let moment = PrayerMoment {
            timestamp: self.clock.now_millis(),
            platform,
            duration: self.config.timer_duration,
        };

        if !day.push_moment(moment, self.config.max_moments_per_day) {
            tracing::debug!("Daily cap reached for {}, declining", today);
            return Ok(RecordOutcome::LimitReached);
        }

        let count = day.count;
        map.insert(today.clone(), day);
        self.adapter.write(keys::PRAYER_DATA, &map).await?;

        tracing::debug!("Recorded moment {}/{} for {}", count, self.config.max_moments_per_day, today);
        Ok(RecordOutcome::Recorded { count })
    }

    /// Get the record for a day, or the zero value when absent.
    /// An absent day is not an error.
    pub async fn get_day(&self, day_key: &str) -> DayRecord {
        let map = self.load_map().await;
        Self::day_from(&map, day_key)
    }

    fn day_from(map: &DayRecordMap, day_key: &str) -> DayRecord {
        map.get(day_key)
            .cloned()
            .unwrap_or_else(|| DayRecord::empty(day_key))
    }

    /// Build the 42-cell month view for a 0-based month.
    ///
    /// Cells are resolved against one load of the record map and
    /// de-duplicated by day key as a defensive measure.
    pub async fn get_month(&self, year: i32, month0: u32) -> MonthView {
        let map = self.load_map().await;

        let mut seen = HashSet::new();
        let mut days = Vec::with_capacity(calendar::GRID_CELLS);
        for date in calendar::month_grid(year, month0) {
            let key = calendar::day_key(date);
            if seen.insert(key.clone()) {
                days.push(Self::day_from(&map, &key));
            }
        }

        MonthView { year, month: month0, days }
    }

    /// Today's moment count.
    pub async fn get_today_count(&self) -> u32 {
        self.get_day(&self.today_key()).await.count
    }

    /// Whether today has reached the cap.
    pub async fn is_today_completed(&self) -> bool {
        self.get_day(&self.today_key()).await.completed
    }

    /// Compute the aggregate statistics snapshot as of today.
    pub async fn compute_stats(&self) -> UserStatsSnapshot {
        let map = self.load_map().await;
        stats::compute(&map, self.clock.today())
    }

    /// Persist the detected platform.
    ///
    /// Writes unconditionally; detection only re-runs when
    /// `get_platform_info` reported no prior value, so the write-once
    /// policy belongs to the caller.
    pub async fn save_platform_info(&self, platform: Platform) -> Result<()> {
        let info = PlatformInfo {
            platform,
            detected_at: self.clock.now_millis(),
            user_agent: self.user_agent.clone(),
        };
        self.adapter.write(keys::PLATFORM_INFO, &info).await?;
        Ok(())
    }

    /// Load the persisted platform record, if any.
    pub async fn get_platform_info(&self) -> Option<PlatformInfo> {
        self.adapter.read(keys::PLATFORM_INFO).await
    }

    /// Erase the record map, platform info, and config from every backing
    /// store. Irreversible; the migration sentinel survives.
    pub async fn clear_all(&self) {
        self.adapter
            .clear_keys(&[keys::PRAYER_DATA, keys::PLATFORM_INFO, keys::APP_CONFIG])
            .await;

        if let Some(channel) = &self.channel {
            channel.remove(keys::PRAYER_DATA);
            channel.remove(keys::PLATFORM_INFO);
            channel.remove(keys::APP_CONFIG);
        }

        tracing::info!("All prayer data cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use storage::{FallbackStore, SledStore};

    async fn repository_on(day: &str) -> PrayerRepository {
        let adapter = Arc::new(StorageAdapter::new(
            Some(Arc::new(SledStore::in_memory().unwrap())),
            Arc::new(FallbackStore::in_memory()),
        ));
        adapter.initialize().await;

        let clock = Arc::new(FixedClock::on_day(day).unwrap());
        PrayerRepository::new(adapter, clock)
    }

    #[tokio::test]
    async fn test_count_tracks_recordings() {
        let repo = repository_on("2025-10-14").await;

        for expected in 1..=7u32 {
            let outcome = repo.record_moment(Platform::Web).await.unwrap();
            assert_eq!(outcome, RecordOutcome::Recorded { count: expected });
            assert_eq!(repo.get_today_count().await, expected);
        }

        assert!(repo.is_today_completed().await);
    }

    #[tokio::test]
    async fn test_cap_is_absorbing() {
        let repo = repository_on("2025-10-14").await;

        for _ in 0..7 {
            repo.record_moment(Platform::Ios).await.unwrap();
        }

        let outcome = repo.record_moment(Platform::Ios).await.unwrap();
        assert_eq!(outcome, RecordOutcome::LimitReached);

        let day = repo.get_day("2025-10-14").await;
        assert_eq!(day.count, 7);
        assert_eq!(day.moments.len(), 7);
    }

    #[tokio::test]
    async fn test_absent_day_reads_as_zero_value() {
        let repo = repository_on("2025-10-14").await;

        let day = repo.get_day("2025-01-01").await;
        assert_eq!(day.date, "2025-01-01");
        assert_eq!(day.count, 0);
        assert!(!day.completed);
        assert!(day.moments.is_empty());
    }

    #[tokio::test]
    async fn test_recording_preserves_other_days() {
        let repo = repository_on("2025-10-14").await;
        repo.record_moment(Platform::Web).await.unwrap();

        // Move the calendar forward a day over the same adapter
        let adapter = Arc::clone(&repo.adapter);
        let next_day = PrayerRepository::new(
            adapter,
            Arc::new(FixedClock::on_day("2025-10-15").unwrap()),
        );
        next_day.record_moment(Platform::Web).await.unwrap();

        let yesterday = next_day.get_day("2025-10-14").await;
        assert_eq!(yesterday.count, 1);
        let today = next_day.get_day("2025-10-15").await;
        assert_eq!(today.count, 1);
    }

    #[tokio::test]
    async fn test_month_view_grid() {
        let repo = repository_on("2025-10-14").await;
        repo.record_moment(Platform::Telegram).await.unwrap();

        // October 2025, 0-based month 9
        let view = repo.get_month(2025, 9).await;
        assert_eq!(view.days.len(), 42);
        assert_eq!(view.days[0].date, "2025-09-28");

        // The 1st sits at the weekday offset of October (Wednesday = 3),
        // so the 14th is at index 3 + 14 - 1.
        assert_eq!(view.days[16].date, "2025-10-14");
        assert_eq!(view.days[16].count, 1);
    }

    #[tokio::test]
    async fn test_moment_fields_come_from_clock_and_config() {
        let repo = repository_on("2025-10-14").await;
        repo.record_moment(Platform::Android).await.unwrap();

        let day = repo.get_day("2025-10-14").await;
        let moment = &day.moments[0];
        assert_eq!(moment.platform, Platform::Android);
        assert_eq!(moment.duration, 60);
        assert!(moment.timestamp > 0);
    }

    #[tokio::test]
    async fn test_platform_info_round_trip() {
        let repo = repository_on("2025-10-14")
            .await
            .with_user_agent("TestAgent/1.0");

        assert_eq!(repo.get_platform_info().await, None);

        repo.save_platform_info(Platform::Telegram).await.unwrap();

        let info = repo.get_platform_info().await.unwrap();
        assert_eq!(info.platform, Platform::Telegram);
        assert_eq!(info.user_agent, "TestAgent/1.0");
        assert!(info.detected_at > 0);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let repo = repository_on("2025-10-14").await;

        repo.record_moment(Platform::Web).await.unwrap();
        repo.save_platform_info(Platform::Web).await.unwrap();
        repo.clear_all().await;

        assert_eq!(repo.get_today_count().await, 0);
        assert_eq!(repo.get_platform_info().await, None);
    }

    #[tokio::test]
    async fn test_stats_from_recorded_history() {
        let repo = repository_on("2025-10-14").await;
        for _ in 0..3 {
            repo.record_moment(Platform::Web).await.unwrap();
        }

        let stats = repo.compute_stats().await;
        assert_eq!(stats.total_moments, 3);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.last_activity, Some("2025-10-14".to_string()));
    }

    #[tokio::test]
    async fn test_custom_cap_config() {
        let repo = repository_on("2025-10-14").await.with_config(AppConfig {
            max_moments_per_day: 2,
            ..AppConfig::default()
        });

        repo.record_moment(Platform::Web).await.unwrap();
        repo.record_moment(Platform::Web).await.unwrap();
        let outcome = repo.record_moment(Platform::Web).await.unwrap();
        assert_eq!(outcome, RecordOutcome::LimitReached);
    }
}
