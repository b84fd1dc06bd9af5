//! Primary store backed by sled
//!
//! The primary store is the durable, larger-capacity backend. It is opened
//! once per process; a failed open means the environment lacks the
//! capability and the adapter degrades to the fallback store instead.

use async_trait::async_trait;
use sled::Db;
use std::sync::Arc;

use crate::backend::{KeyValueBackend, Result, StorageError};

/// Primary store configuration
#[derive(Debug, Clone)]
pub struct PrimaryConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for immediate flush)
    pub flush_every_ms: Option<u64>,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            path: "prayer_kv.db".to_string(),
            cache_capacity: 16 * 1024 * 1024, // 16MB
            use_compression: true,
            flush_every_ms: Some(500),
        }
    }
}

impl PrimaryConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Durable key-value store implementation
pub struct SledStore {
    db: Arc<Db>,
}

impl SledStore {
    /// Open the store with the given configuration.
    ///
    /// An open failure means the backend is unavailable in this
    /// environment; callers degrade rather than retry.
    pub fn open(config: PrimaryConfig) -> Result<Self> {
        let mut db_config = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression);

        if let Some(ms) = config.flush_every_ms {
            db_config = db_config.flush_every_ms(Some(ms));
        }

        let db = db_config
            .open()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create an in-memory primary store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

#[async_trait]
impl KeyValueBackend for SledStore {
    fn name(&self) -> &'static str {
        "primary"
    }

    async fn probe_available(&self) -> bool {
        // An opened database is usable; open failures are surfaced by
        // `open` itself.
        true
    }

    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec())
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn remove_raw(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.db.iter() {
            let (key, _) = item.map_err(|e| StorageError::Backend(e.to_string()))?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                keys.push(key_str);
            }
        }
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        self.db
            .clear()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
