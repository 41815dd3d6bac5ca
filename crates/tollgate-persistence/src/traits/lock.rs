//! Table lock persistence trait

use async_trait::async_trait;

use crate::model::TableLockInfo;

/// Table lock persistence operations
#[async_trait]
pub trait TableLockPersistence: Send + Sync {
    /// All locks, including expired ones not yet purged
    async fn lock_find_all(&self) -> anyhow::Result<Vec<TableLockInfo>>;

    /// Locks held on any of the given schema ids
    async fn lock_find_by_schemas(&self, schema_ids: &[String])
    -> anyhow::Result<Vec<TableLockInfo>>;

    /// Locks owned by a request
    async fn lock_find_by_request(&self, request_id: &str) -> anyhow::Result<Vec<TableLockInfo>>;

    /// Delete the lock on a schema id regardless of owner
    async fn lock_release(&self, schema_id: &str) -> anyhow::Result<Option<TableLockInfo>>;
}
