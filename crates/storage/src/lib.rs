//! Storage layer for Prayer Moments
//!
//! This crate unifies the three on-device persistence backends behind one
//! adapter: a durable primary key-value store, a synchronous fallback store,
//! and a small size-limited channel store used for cross-surface propagation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod backend;
pub mod channel;
pub mod fallback;
pub mod primary;

mod snapshot;

pub use adapter::{AdapterState, PersistenceHealth, StorageAdapter, MIGRATION_SENTINEL};
pub use backend::{KeyValueBackend, Result, StorageError};
pub use channel::ChannelStore;
pub use fallback::FallbackStore;
pub use primary::{PrimaryConfig, SledStore};
