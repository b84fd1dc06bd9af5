//! Storage adapter
//!
//! Presents one logical async key-value interface over the primary and
//! fallback backends, performs the one-time fallback-to-primary migration,
//! and tracks the degraded-persistence state callers may surface to users.
//!
//! Write ordering: the fallback copy is committed synchronously before the
//! primary write is issued, so a read in the same tick observes the value
//! even while the primary write is still in flight. Primary failures are
//! logged and recorded in the health flag; they never fail the caller.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{KeyValueBackend, Result};
use crate::fallback::FallbackStore;
use crate::primary::SledStore;

/// Sentinel key marking the one-time migration as complete.
pub const MIGRATION_SENTINEL: &str = "__migration_done__";

/// Adapter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// `initialize` has not completed yet
    Uninitialized,
    /// The adapter is ready; `using_primary` records which path is active
    Ready {
        /// Whether the primary backend is in use
        using_primary: bool,
    },
}

/// Persistence health signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceHealth {
    /// Both backends operating normally
    Full,
    /// The primary backend is unavailable; running on the fallback only
    FallbackOnly,
    /// The primary backend probed available but has since failed at least
    /// one operation
    Degraded,
}

/// Unified async key-value interface over the primary and fallback stores
pub struct StorageAdapter {
    primary: Option<Arc<SledStore>>,
    fallback: Arc<FallbackStore>,
    state: Mutex<AdapterState>,
    init_guard: tokio::sync::Mutex<()>,
    primary_degraded: Arc<AtomicBool>,
}

impl StorageAdapter {
    /// Create an adapter over the given backends.
    ///
    /// Pass `None` for the primary when its capability probe (the open)
    /// failed; the adapter then runs on the fallback alone.
    pub fn new(primary: Option<Arc<SledStore>>, fallback: Arc<FallbackStore>) -> Self {
        Self {
            primary,
            fallback,
            state: Mutex::new(AdapterState::Uninitialized),
            init_guard: tokio::sync::Mutex::new(()),
            primary_degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AdapterState {
        *self.state.lock().unwrap()
    }

    /// Current persistence health.
    pub fn health(&self) -> PersistenceHealth {
        if self.primary.is_none() {
            PersistenceHealth::FallbackOnly
        } else if self.primary_degraded.load(Ordering::Relaxed) {
            PersistenceHealth::Degraded
        } else {
            PersistenceHealth::Full
        }
    }

    /// The fallback store behind this adapter (shared with the
    /// synchronizer).
    pub fn fallback(&self) -> Arc<FallbackStore> {
        Arc::clone(&self.fallback)
    }

    /// Initialize the adapter, running the one-time migration.
    ///
    /// Idempotent per instance: repeat calls return immediately. Without a
    /// primary backend the adapter becomes ready on the fallback alone and
    /// migration is skipped, not retried later. Otherwise every fallback
    /// key not flagged as migrated is copied into the primary, then the
    /// sentinel is written so the next process start is a no-op.
    pub async fn initialize(&self) {
        let _guard = self.init_guard.lock().await;

        if matches!(self.state(), AdapterState::Ready { .. }) {
            return;
        }

        let Some(primary) = &self.primary else {
            tracing::info!("Primary store unavailable, running on fallback only");
            *self.state.lock().unwrap() = AdapterState::Ready { using_primary: false };
            return;
        };

        match primary.read_raw(MIGRATION_SENTINEL).await {
            Ok(Some(_)) => {
                tracing::debug!("Migration already complete, skipping");
            }
            Ok(None) => {
                self.migrate(primary).await;
            }
            Err(e) => {
                tracing::warn!("Failed to check migration sentinel: {}", e);
                self.primary_degraded.store(true, Ordering::Relaxed);
            }
        }

        *self.state.lock().unwrap() = AdapterState::Ready { using_primary: true };
    }

    /// Copy fallback data into the primary store and set the sentinel.
    async fn migrate(&self, primary: &Arc<SledStore>) {
        tracing::info!("Migrating fallback data into the primary store");

        let mut migrated = 0usize;
        for key in self.fallback.key_list() {
            if key.starts_with("__") {
                continue;
            }

            let Some(value) = self.fallback.get(&key) else {
                continue;
            };

            // Values that parse as JSON are copied verbatim; anything else
            // is stored JSON-string-encoded so the primary only ever holds
            // valid JSON.
            let raw = if serde_json::from_str::<serde_json::Value>(&value).is_ok() {
                value
            } else {
                match serde_json::to_string(&value) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        tracing::warn!("Failed to encode {} for migration: {}", key, e);
                        continue;
                    }
                }
            };

            match primary.write_raw(&key, &raw).await {
                Ok(()) => migrated += 1,
                Err(e) => {
                    tracing::warn!("Failed to migrate {}: {}", key, e);
                    self.primary_degraded.store(true, Ordering::Relaxed);
                }
            }
        }

        if let Err(e) = primary.write_raw(MIGRATION_SENTINEL, "true").await {
            tracing::warn!("Failed to set migration sentinel: {}", e);
            self.primary_degraded.store(true, Ordering::Relaxed);
        }

        tracing::info!("Migration complete, {} keys copied", migrated);
    }

    fn using_primary(&self) -> Option<&Arc<SledStore>> {
        match self.state() {
            AdapterState::Ready { using_primary: true } => self.primary.as_ref(),
            _ => None,
        }
    }

    fn mark_degraded(&self, op: &str, key: &str, e: impl std::fmt::Display) {
        tracing::warn!("Primary {} failed for {}: {}", op, key, e);
        self.primary_degraded.store(true, Ordering::Relaxed);
    }

    /// Read a typed value: primary first, then fallback, `None` when
    /// neither has the key. Primary errors are swallowed and treated as a
    /// miss; a payload that fails to decode is also a miss.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(primary) = self.using_primary() {
            match primary.read_raw(key).await {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(value) => return Some(value),
                    Err(e) => {
                        tracing::warn!("Undecodable primary value for {}: {}", key, e);
                    }
                },
                Ok(None) => {}
                Err(e) => self.mark_degraded("read", key, e),
            }
        }

        let raw = self.fallback.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Undecodable fallback value for {}: {}", key, e);
                None
            }
        }
    }

    /// Read a typed value, substituting a default when absent.
    pub async fn read_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.read(key).await.unwrap_or(default)
    }

    /// Write a typed value to both backends, fallback first.
    ///
    /// Returns an error only when the value itself cannot be serialized;
    /// a primary failure is logged and recorded in the health flag.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;

        self.fallback.set(key, &raw);

        if let Some(primary) = self.using_primary() {
            if let Err(e) = primary.write_raw(key, &raw).await {
                self.mark_degraded("write", key, e);
            }
        }

        Ok(())
    }

    /// Remove a key from both backends. Absence is not an error.
    pub async fn remove(&self, key: &str) {
        self.fallback.remove(key);

        if let Some(primary) = self.using_primary() {
            if let Err(e) = primary.remove_raw(key).await {
                self.mark_degraded("remove", key, e);
            }
        }
    }

    /// Remove several keys from both backends.
    pub async fn clear_keys(&self, keys: &[&str]) {
        for key in keys {
            self.remove(key).await;
        }
    }

    /// Synchronous read shim for call sites that cannot await.
    ///
    /// Consults the fallback store only; the primary copy may lag behind
    /// by one in-flight write.
    pub fn read_sync<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.fallback.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Undecodable fallback value for {}: {}", key, e);
                None
            }
        }
    }

    /// Synchronous write shim for call sites that cannot await.
    ///
    /// Commits to the fallback immediately and fires the primary write in
    /// the background on the current runtime; without a runtime the
    /// primary copy is skipped with a warning.
    pub fn write_sync<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;

        self.fallback.set(key, &raw);

        if let Some(primary) = self.using_primary() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let primary = Arc::clone(primary);
                    let degraded = Arc::clone(&self.primary_degraded);
                    let key = key.to_string();
                    handle.spawn(async move {
                        if let Err(e) = primary.write_raw(&key, &raw).await {
                            tracing::warn!("Background primary write failed for {}: {}", key, e);
                            degraded.store(true, Ordering::Relaxed);
                        }
                    });
                }
                Err(_) => {
                    tracing::warn!("No runtime for background primary write of {}", key);
                }
            }
        }

        Ok(())
    }
}
