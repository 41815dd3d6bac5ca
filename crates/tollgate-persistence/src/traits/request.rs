//! Change request persistence trait
//!
//! Defines the interface for change request storage operations.

use async_trait::async_trait;

use crate::model::{
    ApplyOp, ChangeRequestInfo, NewChangeDetail, NewChangeRequest, NewTableLock, Page,
    RequestStatus, ResolveOutcome,
};

/// Change request persistence operations
#[async_trait]
pub trait ChangeRequestPersistence: Send + Sync {
    /// Create a request with its details, table locks, and staging writes as
    /// one unit of work.
    ///
    /// Locks that expired before `now_ms` are purged in the same unit. A lock
    /// already held on any of the schema ids fails the whole write with
    /// `TollgateError::TableLocked`; nothing is persisted in that case.
    async fn request_create(
        &self,
        request: NewChangeRequest,
        details: Vec<NewChangeDetail>,
        locks: Vec<NewTableLock>,
        ops: Vec<ApplyOp>,
        now_ms: i64,
    ) -> anyhow::Result<ChangeRequestInfo>;

    /// Find a request by id
    async fn request_find_by_id(&self, id: &str) -> anyhow::Result<Option<ChangeRequestInfo>>;

    /// Search requests with pagination, newest first
    async fn request_search_page(
        &self,
        status: Option<RequestStatus>,
        created_by: Option<&str>,
        page_no: u64,
        page_size: u64,
    ) -> anyhow::Result<Page<ChangeRequestInfo>>;

    /// All requests in the given status, oldest first
    async fn request_find_by_status(
        &self,
        status: RequestStatus,
    ) -> anyhow::Result<Vec<ChangeRequestInfo>>;

    /// Stamp a terminal status and release every lock owned by the request in
    /// one unit of work. A request that is already terminal is left untouched.
    async fn request_resolve(
        &self,
        id: &str,
        status: RequestStatus,
        reviewed_by: &str,
    ) -> anyhow::Result<ResolveOutcome>;

    /// Record the deployment that shipped the request
    async fn request_set_deployment(
        &self,
        id: &str,
        deployment_version_id: &str,
    ) -> anyhow::Result<bool>;
}
