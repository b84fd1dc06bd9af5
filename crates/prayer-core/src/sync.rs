//! Record-map synchronization
//!
//! Distinct UI surfaces historically wrote the record map to only one of
//! the fallback and channel stores, so the two copies drift. The
//! synchronizer reconciles them: one-sided data is copied across, and
//! conflicting copies are merged day-by-day under an explicit precedence
//! policy. This is best-effort convergent replication, not a CRDT:
//! conflicting moment lists for the same day keep only the preferred
//! side's copy.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use storage::{ChannelStore, FallbackStore, StorageError};

use crate::types::{keys, DayRecordMap};

/// Which side wins when both stores hold data for the same day key.
///
/// Neither direction is inherently correct; this is a product policy and
/// deliberately configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePrecedence {
    /// The channel store's copy of a day overwrites the fallback's
    #[default]
    PreferChannel,
    /// The fallback store's copy of a day overwrites the channel's
    PreferFallback,
}

/// Synchronizer configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between periodic reconciliation runs
    pub interval: Duration,
    /// Same-day conflict precedence
    pub precedence: MergePrecedence,
    /// Outcome broadcast buffer size
    pub buffer_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            precedence: MergePrecedence::default(),
            buffer_size: 16,
        }
    }
}

/// Event that caused a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Process start
    Startup,
    /// Periodic timer tick
    Interval,
    /// The environment regained foreground visibility or focus
    VisibilityRegained,
    /// Network connectivity was restored
    ConnectivityRestored,
}

/// Store side, used in outcome reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSide {
    /// The synchronous fallback store
    Fallback,
    /// The size-limited channel store
    Channel,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Neither side holds any data
    NoData,
    /// Both sides already hold byte-identical data
    AlreadyConsistent,
    /// Only the fallback had data; it was copied to the channel
    CopiedToChannel,
    /// Only the channel had data; it was copied to the fallback
    CopiedToFallback,
    /// Both sides had data; the day-keyed merge was written to both
    Merged {
        /// Number of day records in the merged map
        days: usize,
    },
    /// A side failed to decode, so the winner's raw bytes were copied
    /// over without merging
    Propagated {
        /// The side whose copy was kept
        winner: SyncSide,
    },
}

/// Reconciles the fallback and channel copies of the record map
pub struct Synchronizer {
    fallback: Arc<FallbackStore>,
    channel: Arc<ChannelStore>,
    config: SyncConfig,
    run_guard: tokio::sync::Mutex<()>,
    outcome_tx: broadcast::Sender<SyncOutcome>,
}

impl Synchronizer {
    /// Create a synchronizer over the two stores.
    pub fn new(
        fallback: Arc<FallbackStore>,
        channel: Arc<ChannelStore>,
        config: SyncConfig,
    ) -> Self {
        let (outcome_tx, _) = broadcast::channel(config.buffer_size);
        Self { fallback, channel, config, run_guard: tokio::sync::Mutex::new(()), outcome_tx }
    }

    /// Subscribe to reconciliation outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncOutcome> {
        self.outcome_tx.subscribe()
    }

    /// Run one reconciliation pass for a trigger.
    ///
    /// Runs are serialized behind a guard: a trigger arriving while a pass
    /// is in flight waits for it to finish rather than overlapping it.
    pub async fn handle(&self, trigger: SyncTrigger) -> SyncOutcome {
        let _guard = self.run_guard.lock().await;
        tracing::debug!("Reconciling after {:?}", trigger);

        let outcome = self.reconcile();
        let _ = self.outcome_tx.send(outcome.clone());
        outcome
    }

    /// Spawn the periodic reconciliation task.
    ///
    /// The task fires the `Interval` trigger until the returned handle is
    /// aborted. Event triggers (`Startup`, visibility, connectivity) are
    /// the host's responsibility via `handle`.
    pub fn spawn_periodic(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let sync = Arc::clone(self);
        let interval = self.config.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; startup reconciliation
            // is its own trigger, so swallow it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                sync.handle(SyncTrigger::Interval).await;
            }
        })
    }

    fn reconcile(&self) -> SyncOutcome {
        let fallback_raw = self.fallback.get(keys::PRAYER_DATA);
        let channel_raw = self.channel.get(keys::PRAYER_DATA);

        match (fallback_raw, channel_raw) {
            (None, None) => SyncOutcome::NoData,

            (Some(from_fallback), None) => {
                self.write_channel(&from_fallback);
                SyncOutcome::CopiedToChannel
            }

            (None, Some(from_channel)) => {
                self.fallback.set(keys::PRAYER_DATA, &from_channel);
                SyncOutcome::CopiedToFallback
            }

            (Some(from_fallback), Some(from_channel)) if from_fallback == from_channel => {
                SyncOutcome::AlreadyConsistent
            }

            (Some(from_fallback), Some(from_channel)) => {
                self.merge_sides(&from_fallback, &from_channel)
            }
        }
    }

    fn merge_sides(&self, fallback_raw: &str, channel_raw: &str) -> SyncOutcome {
        let fallback_map = serde_json::from_str::<DayRecordMap>(fallback_raw);
        let channel_map = serde_json::from_str::<DayRecordMap>(channel_raw);

        match (fallback_map, channel_map) {
            (Ok(fallback_map), Ok(channel_map)) => {
                let merged = match self.config.precedence {
                    MergePrecedence::PreferChannel => {
                        DayRecordMap::merged(&fallback_map, &channel_map)
                    }
                    MergePrecedence::PreferFallback => {
                        DayRecordMap::merged(&channel_map, &fallback_map)
                    }
                };

                match serde_json::to_string(&merged) {
                    Ok(raw) => {
                        self.fallback.set(keys::PRAYER_DATA, &raw);
                        self.write_channel(&raw);
                        SyncOutcome::Merged { days: merged.len() }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to serialize merged map: {}", e);
                        SyncOutcome::AlreadyConsistent
                    }
                }
            }

            // A decode failure disables merging; the readable side's raw
            // bytes win outright, favoring availability over correctness.
            (Ok(_), Err(e)) => {
                tracing::warn!("Channel copy undecodable, keeping fallback: {}", e);
                self.write_channel(fallback_raw);
                SyncOutcome::Propagated { winner: SyncSide::Fallback }
            }

            (Err(e), Ok(_)) => {
                tracing::warn!("Fallback copy undecodable, keeping channel: {}", e);
                self.fallback.set(keys::PRAYER_DATA, channel_raw);
                SyncOutcome::Propagated { winner: SyncSide::Channel }
            }

            (Err(fe), Err(ce)) => {
                // Neither side decodes; keep the precedence winner's bytes.
                tracing::warn!("Both copies undecodable (fallback: {}, channel: {})", fe, ce);
                match self.config.precedence {
                    MergePrecedence::PreferChannel => {
                        self.fallback.set(keys::PRAYER_DATA, channel_raw);
                        SyncOutcome::Propagated { winner: SyncSide::Channel }
                    }
                    MergePrecedence::PreferFallback => {
                        self.write_channel(fallback_raw);
                        SyncOutcome::Propagated { winner: SyncSide::Fallback }
                    }
                }
            }
        }
    }

    /// Channel writes tolerate the size ceiling: an oversized payload is
    /// accepted loss, not a failure.
    fn write_channel(&self, raw: &str) {
        match self.channel.set(keys::PRAYER_DATA, raw) {
            Ok(()) => {}
            Err(StorageError::CapacityExceeded { limit, actual }) => {
                tracing::warn!(
                    "Record map ({} bytes) exceeds the channel ceiling ({} bytes), skipping",
                    actual,
                    limit
                );
            }
            Err(e) => {
                tracing::warn!("Channel write failed: {}", e);
            }
        }
    }
}
