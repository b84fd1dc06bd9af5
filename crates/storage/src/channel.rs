//! Size-limited secondary channel store
//!
//! The channel store models the small key-value store historically attached
//! to outgoing requests for cross-surface propagation. Its defining
//! constraint is a per-value byte ceiling: a payload over the ceiling is
//! rejected with `CapacityExceeded` and the prior value is left intact.
//! Callers treat that as accepted best-effort loss, not a failure.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::backend::{KeyValueBackend, Result, StorageError};
use crate::snapshot;

/// Default per-value ceiling, sized like a cookie.
pub const DEFAULT_VALUE_LIMIT: usize = 4096;

/// Size-limited synchronous key-value store
pub struct ChannelStore {
    entries: Mutex<BTreeMap<String, String>>,
    path: Option<PathBuf>,
    value_limit: usize,
}

impl ChannelStore {
    /// Open a store backed by a snapshot file with the default ceiling.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = snapshot::load(&path);
        Self {
            entries: Mutex::new(entries),
            path: Some(path),
            value_limit: DEFAULT_VALUE_LIMIT,
        }
    }

    /// Create a memory-only store with the default ceiling (for testing)
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            path: None,
            value_limit: DEFAULT_VALUE_LIMIT,
        }
    }

    /// Override the per-value byte ceiling.
    pub fn with_value_limit(mut self, limit: usize) -> Self {
        self.value_limit = limit;
        self
    }

    /// The per-value byte ceiling.
    pub fn value_limit(&self) -> usize {
        self.value_limit
    }

    /// Get the raw value stored under a key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Set a raw value, rejecting payloads over the ceiling.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if value.len() > self.value_limit {
            return Err(StorageError::CapacityExceeded {
                limit: self.value_limit,
                actual: value.len(),
            });
        }

        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.mirror(&entries);
        Ok(())
    }

    /// Remove a key. A missing key is not an error.
    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(key).is_some() {
            self.mirror(&entries);
        }
    }

    /// Remove every key.
    pub fn clear_all(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        self.mirror(&entries);
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    fn mirror(&self, entries: &BTreeMap<String, String>) {
        if let Some(path) = &self.path {
            snapshot::persist(path, entries);
        }
    }
}

#[async_trait]
impl KeyValueBackend for ChannelStore {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn probe_available(&self) -> bool {
        true
    }

    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value)
    }

    async fn remove_raw(&self, key: &str) -> Result<()> {
        self.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.clear_all();
        Ok(())
    }
}
