//! Prayer record model
//!
//! These are the persisted and derived structures of the domain. Persisted
//! payloads keep the documented wire layout (camelCase fields, lowercase
//! platform values, day-key keyed record map); decoding validates the
//! payload instead of trusting arbitrary JSON.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum recorded moments per day; an absorbing ceiling.
pub const MAX_MOMENTS_PER_DAY: u32 = 7;

/// Default timer length in seconds, stamped on each recorded moment.
pub const DEFAULT_TIMER_DURATION_SECS: u32 = 60;

/// Persisted storage keys
pub mod keys {
    /// Day-key keyed record map
    pub const PRAYER_DATA: &str = "prayer_data";
    /// Detected platform record
    pub const PLATFORM_INFO: &str = "platform_info";
    /// Reserved application configuration
    pub const APP_CONFIG: &str = "app_config";
}

/// Runtime platform a moment was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS device
    Ios,
    /// Android device
    Android,
    /// Telegram in-app browser
    Telegram,
    /// Regular web browser
    Web,
    /// Unclassified environment
    #[default]
    Unknown,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Telegram => "telegram",
            Platform::Web => "web",
            Platform::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// One recorded prayer event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerMoment {
    /// Milliseconds since epoch, set at recording time
    pub timestamp: i64,
    /// Platform the moment was recorded on
    #[serde(default)]
    pub platform: Platform,
    /// Configured timer length at record time, in seconds
    #[serde(default)]
    pub duration: u32,
}

/// Aggregate record for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    /// The day key, duplicated from the map key for convenience
    pub date: String,
    /// Recorded moments, insertion order = recording order
    #[serde(default)]
    pub moments: Vec<PrayerMoment>,
    /// Derived: always equals `moments.len()`
    #[serde(default)]
    pub count: u32,
    /// Derived: `count >= MAX_MOMENTS_PER_DAY`
    #[serde(default)]
    pub completed: bool,
}

impl DayRecord {
    /// The zero-value record for a day with no activity.
    pub fn empty(date: &str) -> Self {
        Self {
            date: date.to_string(),
            moments: Vec::new(),
            count: 0,
            completed: false,
        }
    }

    /// Append a moment and recompute the derived fields.
    ///
    /// Returns `false` without mutating when the day is already at the
    /// cap — the ceiling is absorbing until the calendar date changes.
    pub fn push_moment(&mut self, moment: PrayerMoment, cap: u32) -> bool {
        if self.count >= cap {
            return false;
        }

        self.moments.push(moment);
        self.count = self.moments.len() as u32;
        self.completed = self.count >= cap;
        true
    }

    /// Recompute derived fields from the moments list and align the date
    /// field with the owning map key.
    fn normalize(&mut self, key: &str) {
        self.date = key.to_string();
        self.count = self.moments.len() as u32;
        self.completed = self.count >= MAX_MOMENTS_PER_DAY;
    }
}

/// Mapping from day key to day record; the entire persisted payload under
/// the `prayer_data` storage key.
///
/// Backed by a `BTreeMap` so iteration is chronological (day keys sort
/// lexicographically in date order). Decoding is validating: every key
/// must be a syntactically valid day key and derived fields are recomputed
/// from the moments list, so a malformed payload surfaces as a
/// deserialization error rather than corrupt state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DayRecordMap(BTreeMap<String, DayRecord>);

impl DayRecordMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a day's record.
    pub fn get(&self, key: &str) -> Option<&DayRecord> {
        self.0.get(key)
    }

    /// Insert or replace a day's record.
    pub fn insert(&mut self, key: String, record: DayRecord) {
        self.0.insert(key, record);
    }

    /// Number of days with a record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether any day has a record.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate records in chronological day-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DayRecord)> {
        self.0.iter()
    }

    /// Shallow merge keyed by day: `base` entries, overwritten by
    /// `preferred` entries wherever both sides have the same day key.
    /// Whole days are the atomic unit; moment lists are never combined.
    pub fn merged(base: &Self, preferred: &Self) -> Self {
        let mut out = base.0.clone();
        for (key, record) in &preferred.0 {
            out.insert(key.clone(), record.clone());
        }
        Self(out)
    }
}

impl Serialize for DayRecordMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DayRecordMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, DayRecord>::deserialize(deserializer)?;

        let mut map = BTreeMap::new();
        for (key, mut record) in raw {
            if !calendar::is_valid_day_key(&key) {
                return Err(serde::de::Error::custom(format!(
                    "invalid day key: {key}"
                )));
            }
            record.normalize(&key);
            map.insert(key, record);
        }

        Ok(Self(map))
    }
}

/// Read-only projection of the 6-week month grid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    /// Calendar year
    pub year: i32,
    /// 0-based month (0 = January)
    pub month: u32,
    /// Exactly 42 day records, starting on the Sunday on/before the 1st
    pub days: Vec<DayRecord>,
}

/// Detected platform record, persisted under `platform_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    /// Detected platform
    pub platform: Platform,
    /// Milliseconds since epoch at detection time
    pub detected_at: i64,
    /// Host-reported user agent string, may be empty
    #[serde(default)]
    pub user_agent: String,
}

/// Application configuration, read from `app_config` with defaults when
/// absent; never required to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Daily recording cap
    #[serde(default = "default_cap")]
    pub max_moments_per_day: u32,
    /// Timer length in seconds
    #[serde(default = "default_duration")]
    pub timer_duration: u32,
    /// Display timezone label (informational; day keys always use the
    /// local runtime clock)
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_cap() -> u32 {
    MAX_MOMENTS_PER_DAY
}

fn default_duration() -> u32 {
    DEFAULT_TIMER_DURATION_SECS
}

fn default_timezone() -> String {
    "Europe/Paris".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_moments_per_day: default_cap(),
            timer_duration: default_duration(),
            timezone: default_timezone(),
        }
    }
}

/// Derived aggregate metrics over the trailing statistics window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsSnapshot {
    /// Sum of moment counts over the window
    pub total_moments: u64,
    /// Consecutive completed days ending at today
    pub current_streak: u32,
    /// Completed days in the window
    pub days_completed: u32,
    /// Most recent day key with any activity, if any
    pub last_activity: Option<String>,
}
