//! Synchronous fallback store
//!
//! The fallback store fills the role of a small, always-available,
//! synchronous backend: writes land in memory immediately so a read in the
//! same tick observes them, and every mutation mirrors the whole map to a
//! snapshot file so the data survives a restart. It is both the degraded
//! path when the primary store is unavailable and the fast-path mirror the
//! adapter consults on every read.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::backend::{KeyValueBackend, Result};
use crate::snapshot;

/// Synchronous key-value store with a best-effort file mirror
pub struct FallbackStore {
    entries: Mutex<BTreeMap<String, String>>,
    path: Option<PathBuf>,
}

impl FallbackStore {
    /// Open a store backed by a snapshot file, loading any existing data.
    ///
    /// A missing file starts empty; a corrupt file is logged and treated
    /// as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = snapshot::load(&path);
        Self { entries: Mutex::new(entries), path: Some(path) }
    }

    /// Create a memory-only store (for testing)
    pub fn in_memory() -> Self {
        Self { entries: Mutex::new(BTreeMap::new()), path: None }
    }

    /// Get the raw value stored under a key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Set a raw value. The in-memory copy is updated synchronously; the
    /// snapshot mirror is best-effort.
    pub fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.mirror(&entries);
    }

    /// Remove a key. A missing key is not an error.
    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(key).is_some() {
            self.mirror(&entries);
        }
    }

    /// List all keys currently present.
    pub fn key_list(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Remove every key.
    pub fn clear_all(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        self.mirror(&entries);
    }

    /// Get the number of keys in the store.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
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
impl KeyValueBackend for FallbackStore {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn probe_available(&self) -> bool {
        true
    }

    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, value);
        Ok(())
    }

    async fn remove_raw(&self, key: &str) -> Result<()> {
        self.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.key_list())
    }

    async fn clear(&self) -> Result<()> {
        self.clear_all();
        Ok(())
    }
}
