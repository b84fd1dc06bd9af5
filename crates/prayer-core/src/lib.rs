//! Domain core for Prayer Moments
//!
//! This crate owns the prayer record model and the components built on it:
//! the repository (single authoritative API for recording and querying),
//! the synchronizer (fallback/channel reconciliation), and the statistics
//! engine (trailing-window aggregates and streaks).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod repository;
pub mod stats;
pub mod sync;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use repository::{PrayerRepository, RecordOutcome};
pub use sync::{MergePrecedence, SyncConfig, SyncOutcome, SyncSide, SyncTrigger, Synchronizer};
pub use types::{
    AppConfig, DayRecord, DayRecordMap, MonthView, Platform, PlatformInfo, PrayerMoment,
    UserStatsSnapshot,
};
