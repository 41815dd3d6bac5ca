//! Persistence traits for the unified storage abstraction layer
//!
//! This module defines the core persistence traits that abstract over the
//! storage backends: external database (MySQL/PostgreSQL) and the embedded
//! in-process store.

pub mod detail;
pub mod lock;
pub mod record;
pub mod request;

pub use detail::ChangeDetailPersistence;
pub use lock::TableLockPersistence;
pub use record::RecordPersistence;
pub use request::ChangeRequestPersistence;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::model::{StorageMode, StoreEvent};

/// Unified persistence service trait
///
/// This is the main interface for all review storage operations.
/// Implementations publish a [`StoreEvent`] after every committed write.
#[async_trait]
pub trait PersistenceService:
    ChangeRequestPersistence
    + ChangeDetailPersistence
    + TableLockPersistence
    + RecordPersistence
    + Send
    + Sync
{
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Subscribe to change notifications for committed writes
    fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent>;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
