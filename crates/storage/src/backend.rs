//! Backend capability interface
//!
//! Every physical store implements the same small capability set so new
//! backends can be added without touching the repository layer. Values are
//! raw JSON strings; typed encoding and decoding live in the adapter.

use async_trait::async_trait;
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend is not available in this environment
    #[error("Backend unavailable: {0}")]
    Unavailable(&'static str),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Value exceeds the store's size ceiling
    #[error("Value of {actual} bytes exceeds the {limit}-byte ceiling")]
    CapacityExceeded {
        /// Maximum value size in bytes
        limit: usize,
        /// Size of the rejected value in bytes
        actual: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Capability interface shared by all physical stores.
///
/// Implementations must be safe to share across tasks; the adapter holds
/// them behind `Arc`. A backend whose operations are synchronous simply
/// completes its futures immediately.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Short name used in log records.
    fn name(&self) -> &'static str;

    /// Check whether the backend is usable in this environment.
    async fn probe_available(&self) -> bool;

    /// Read the raw value stored under a key.
    async fn read_raw(&self, key: &str) -> Result<Option<String>>;

    /// Write a raw value under a key, replacing any prior value.
    async fn write_raw(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. A missing key is not an error.
    async fn remove_raw(&self, key: &str) -> Result<()>;

    /// List all keys currently present.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Remove every key.
    async fn clear(&self) -> Result<()>;
}
