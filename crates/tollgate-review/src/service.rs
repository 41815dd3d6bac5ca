//! Change review service
//!
//! Drives the review workflow on top of a [`PersistenceService`]: submission
//! with table locking, table-level decisions, finalize, bulk review, and the
//! read and administration operations around them.

use std::sync::Arc;

use tollgate_common::{MAX_PAGE_SIZE, TollgateError, is_valid_identifier};
use tollgate_persistence::{
    ChangeDetailInfo, ChangeRequestInfo, DetailStatus, LiveRecordInfo, NewChangeDetail,
    NewChangeRequest, NewTableLock, Page, PersistenceService, RequestStatus, ReviewDecision,
    TableLockInfo, now_millis,
};

use crate::diff::diff;
use crate::handler::HandlerRegistry;
use crate::model::{
    BulkFailure, BulkResolved, BulkReviewReport, ChangeRequestSummary, ReviewOptions,
    ReviewSubmission, SubmitReceipt, TableReviewOutcome, summarize_tables,
};

pub type Result<T> = std::result::Result<T, TollgateError>;

/// Comment stamped on tables rejected while finalizing a rejected request
const FINALIZE_REJECT_COMMENT: &str = "rejected on finalize";

/// Review workflow service
pub struct ChangeReviewService {
    persistence: Arc<dyn PersistenceService>,
    handlers: HandlerRegistry,
    options: ReviewOptions,
}

impl ChangeReviewService {
    /// Create a service with the default table kind handlers
    pub fn new(persistence: Arc<dyn PersistenceService>, options: ReviewOptions) -> Self {
        Self::with_handlers(persistence, HandlerRegistry::default(), options)
    }

    pub fn with_handlers(
        persistence: Arc<dyn PersistenceService>,
        handlers: HandlerRegistry,
        options: ReviewOptions,
    ) -> Self {
        Self {
            persistence,
            handlers,
            options,
        }
    }

    pub fn persistence(&self) -> &Arc<dyn PersistenceService> {
        &self.persistence
    }

    pub fn options(&self) -> &ReviewOptions {
        &self.options
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Diff every submitted table and open a change request for the tables
    /// that changed.
    ///
    /// Fails with `TableLocked` when any listed table is held by another
    /// request and with `NoChanges` when no record differs; nothing is written
    /// in either case.
    pub async fn submit_for_review(
        &self,
        submitted_by: &str,
        submission: ReviewSubmission,
    ) -> Result<SubmitReceipt> {
        let submitted_by = require_user(submitted_by, "submittedBy")?;

        let mut schema_ids: Vec<String> = Vec::with_capacity(submission.schema_ids.len());
        for schema_id in &submission.schema_ids {
            let schema_id = schema_id.trim();
            if !is_valid_identifier(schema_id) {
                return Err(TollgateError::validation(format!(
                    "invalid schema id '{}'",
                    schema_id
                )));
            }
            if !schema_ids.iter().any(|s| s == schema_id) {
                schema_ids.push(schema_id.to_string());
            }
        }
        if schema_ids.is_empty() {
            return Err(TollgateError::validation("schemaIds must not be empty"));
        }

        let now = now_millis();

        let held: Vec<String> = self
            .persistence
            .lock_find_by_schemas(&schema_ids)
            .await?
            .into_iter()
            .filter(|lock| !lock.is_expired_at(now))
            .map(|lock| lock.schema_id)
            .collect();
        if !held.is_empty() {
            tracing::warn!(
                user = %submitted_by,
                tables = ?held,
                "Submission rejected, tables locked by a pending change request"
            );
            return Err(TollgateError::TableLocked(held));
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let mut details = Vec::new();
        let mut locks = Vec::new();
        let mut ops = Vec::new();
        let mut tables = Vec::new();

        for schema_id in &schema_ids {
            let Some(snapshot) = submission.table_changes.get(schema_id) else {
                tracing::debug!(table = %schema_id, "No snapshot submitted for table");
                continue;
            };
            let primary_key = snapshot.resolve_primary_key(&self.options.primary_key_candidates);
            let changes = diff(&snapshot.old_data, &snapshot.new_data, primary_key.as_deref());
            if changes.is_empty() {
                continue;
            }

            let handler = self.handlers.handler_for(schema_id);
            tracing::debug!(
                table = %schema_id,
                kind = handler.kind(),
                primary_key = primary_key.as_deref().unwrap_or("-"),
                changes = changes.len(),
                "Table changes detected"
            );
            ops.extend(handler.submit_ops(&request_id, schema_id, &changes));
            details.extend(changes.into_iter().map(|change| NewChangeDetail {
                table: schema_id.clone(),
                rule_key: change.rule_key,
                old_value: change.old_value,
                new_value: change.new_value,
            }));
            locks.push(NewTableLock {
                schema_id: schema_id.clone(),
                locked_by: submitted_by.to_string(),
                expires_at: self.options.lock_expiry(now),
            });
            tables.push(schema_id.clone());
        }

        if details.is_empty() {
            tracing::info!(user = %submitted_by, "No changes detected, nothing submitted");
            return Err(TollgateError::NoChanges);
        }

        let change_count = details.len();
        let request = NewChangeRequest {
            id: request_id.clone(),
            created_by: submitted_by.to_string(),
            version_id: submission.version_id,
            comment: submission.comment.filter(|c| !c.trim().is_empty()),
        };
        self.persistence
            .request_create(request, details, locks, ops, now)
            .await
            .map_err(|e| {
                let err = TollgateError::from(e);
                if !err.is_user_facing() {
                    tracing::error!(request_id = %request_id, "Failed to store change request: {}", err);
                }
                err
            })?;

        metrics::counter!("review_submissions_total").increment(1);

        let receipt = SubmitReceipt {
            request_id,
            change_count,
            tables,
        };
        tracing::info!(
            request_id = %receipt.request_id,
            user = %submitted_by,
            changes = change_count,
            tables = ?receipt.tables,
            "{}",
            receipt.message()
        );
        Ok(receipt)
    }

    // ========================================================================
    // Table decisions
    // ========================================================================

    /// Approve every pending detail of a table and apply it
    pub async fn approve_table_changes(
        &self,
        request_id: &str,
        table: &str,
        reviewer: &str,
        comment: Option<String>,
    ) -> Result<TableReviewOutcome> {
        self.decide_table(
            request_id,
            table,
            DetailStatus::Approved,
            reviewer,
            comment,
            self.options.auto_finalize,
        )
        .await
    }

    /// Reject every pending detail of a table and discard its staged rows
    pub async fn reject_table_changes(
        &self,
        request_id: &str,
        table: &str,
        reviewer: &str,
        comment: Option<String>,
    ) -> Result<TableReviewOutcome> {
        self.decide_table(
            request_id,
            table,
            DetailStatus::Rejected,
            reviewer,
            comment,
            self.options.auto_finalize,
        )
        .await
    }

    async fn decide_table(
        &self,
        request_id: &str,
        table: &str,
        status: DetailStatus,
        reviewer: &str,
        comment: Option<String>,
        finalize_after: bool,
    ) -> Result<TableReviewOutcome> {
        let reviewer = require_user(reviewer, "reviewer")?;
        let request = self.find_request(request_id).await?;
        let details = self.persistence.detail_find_by_request(request_id).await?;

        let table_details: Vec<&ChangeDetailInfo> =
            details.iter().filter(|d| d.table == table).collect();
        if table_details.is_empty() {
            return Err(TollgateError::not_found(format!(
                "table '{}' in change request '{}'",
                table, request_id
            )));
        }

        let mut outcome = TableReviewOutcome {
            request_id: request_id.to_string(),
            table: table.to_string(),
            updated: 0,
            finalized: None,
        };

        if request.status.is_terminal() {
            tracing::debug!(
                request_id,
                table,
                status = %request.status,
                "Change request already resolved, decision ignored"
            );
            outcome.finalized = Some(request.status);
            return Ok(outcome);
        }

        let pending: Vec<ChangeDetailInfo> = table_details
            .into_iter()
            .filter(|d| d.status == DetailStatus::Pending)
            .cloned()
            .collect();

        if !pending.is_empty() {
            outcome.updated = self
                .apply_decision(request_id, table, status, reviewer, comment, &pending)
                .await?;
        } else {
            tracing::debug!(request_id, table, "Table already decided, decision ignored");
        }

        if !finalize_after {
            return Ok(outcome);
        }

        // Re-read after the write; a concurrent decision on another table
        // may have cleared the last pending detail.
        let any_pending = self
            .persistence
            .detail_find_by_request(request_id)
            .await?
            .iter()
            .any(|d| d.status == DetailStatus::Pending);
        if !any_pending {
            match self.finalize_change_request(request_id, reviewer).await {
                Ok(final_status) => {
                    outcome.finalized = final_status.is_terminal().then_some(final_status);
                }
                Err(e) => {
                    tracing::error!(
                        request_id,
                        table,
                        "Table decision recorded but finalize failed: {}",
                        e
                    );
                    return Err(TollgateError::PartialApply {
                        request_id: request_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Stamp the decision on the pending details of a table and run the table
    /// kind's writes in the same unit of work
    async fn apply_decision(
        &self,
        request_id: &str,
        table: &str,
        status: DetailStatus,
        reviewer: &str,
        comment: Option<String>,
        pending: &[ChangeDetailInfo],
    ) -> Result<u64> {
        let handler = self.handlers.handler_for(table);
        let ops = match status {
            DetailStatus::Approved => handler.approve_ops(request_id, table, pending),
            DetailStatus::Rejected => handler.reject_ops(request_id, table, pending),
            DetailStatus::Pending => {
                return Err(TollgateError::validation("decision must approve or reject"));
            }
        };

        let decision = ReviewDecision {
            status,
            reviewed_by: reviewer.to_string(),
            comment: comment.filter(|c| !c.trim().is_empty()),
        };
        let updated = self
            .persistence
            .detail_review_table(request_id, table, decision, ops)
            .await
            .map_err(|e| {
                let err = TollgateError::from(e);
                tracing::error!(request_id, table, "Failed to record table decision: {}", err);
                err
            })?;

        if updated > 0 {
            metrics::counter!("review_decisions_total", "decision" => status.as_str())
                .increment(1);
            tracing::info!(
                request_id,
                table,
                kind = handler.kind(),
                reviewer,
                decision = %status,
                rows = updated,
                "Table changes decided"
            );
        }
        Ok(updated)
    }

    // ========================================================================
    // Finalize
    // ========================================================================

    /// Compute the terminal status of a request and release its locks.
    ///
    /// Any rejected detail rejects the request; tables still pending are
    /// rejected first. When every detail is approved the request is approved.
    /// Otherwise the request stays in review. Returns the resulting status.
    pub async fn finalize_change_request(
        &self,
        request_id: &str,
        reviewer: &str,
    ) -> Result<RequestStatus> {
        let reviewer = require_user(reviewer, "reviewer")?;
        let request = self.find_request(request_id).await?;
        if request.status.is_terminal() {
            return Ok(request.status);
        }

        let details = self.persistence.detail_find_by_request(request_id).await?;
        if details.is_empty() {
            return Ok(request.status);
        }

        let any_rejected = details.iter().any(|d| d.status == DetailStatus::Rejected);
        let all_approved = details.iter().all(|d| d.status == DetailStatus::Approved);

        let target = if any_rejected {
            for summary in summarize_tables(&details) {
                let pending: Vec<ChangeDetailInfo> = summary
                    .changes
                    .into_iter()
                    .filter(|d| d.status == DetailStatus::Pending)
                    .collect();
                if pending.is_empty() {
                    continue;
                }
                self.apply_decision(
                    request_id,
                    &summary.schema_id,
                    DetailStatus::Rejected,
                    reviewer,
                    Some(FINALIZE_REJECT_COMMENT.to_string()),
                    &pending,
                )
                .await?;
            }
            RequestStatus::Rejected
        } else if all_approved {
            RequestStatus::Approved
        } else {
            return Ok(request.status);
        };

        let outcome = self
            .persistence
            .request_resolve(request_id, target, reviewer)
            .await?;
        if !outcome.resolved {
            // resolved concurrently; report what the store holds
            return Ok(self.find_request(request_id).await?.status);
        }

        metrics::counter!("review_finalized_total", "status" => target.as_str()).increment(1);
        tracing::info!(
            request_id,
            reviewer,
            status = %target,
            released_locks = outcome.released_locks,
            "Change request finalized"
        );
        Ok(target)
    }

    // ========================================================================
    // Bulk review
    // ========================================================================

    /// Approve every pending table of every request in review
    pub async fn approve_all(&self, reviewer: &str) -> Result<BulkReviewReport> {
        self.review_all(DetailStatus::Approved, reviewer).await
    }

    /// Reject every pending table of every request in review
    pub async fn reject_all(&self, reviewer: &str) -> Result<BulkReviewReport> {
        self.review_all(DetailStatus::Rejected, reviewer).await
    }

    async fn review_all(&self, status: DetailStatus, reviewer: &str) -> Result<BulkReviewReport> {
        let reviewer = require_user(reviewer, "reviewer")?;
        let requests = self
            .persistence
            .request_find_by_status(RequestStatus::InReview)
            .await?;

        let mut report = BulkReviewReport::default();
        for request in requests {
            match self.review_request(&request.id, status, reviewer).await {
                Ok(Some(final_status)) => report.resolved.push(BulkResolved {
                    request_id: request.id,
                    status: final_status,
                }),
                Ok(None) => {
                    tracing::debug!(
                        request_id = %request.id,
                        "No pending table, skipped by bulk review"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        request_id = %request.id,
                        decision = %status,
                        "Bulk review failed for change request: {}",
                        e
                    );
                    report.failures.push(BulkFailure {
                        request_id: request.id,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            reviewer,
            decision = %status,
            resolved = report.resolved.len(),
            failed = report.failures.len(),
            "Bulk review completed"
        );
        Ok(report)
    }

    /// Decide every pending table of one request, then finalize it.
    /// Returns `None` when the request has no pending table.
    async fn review_request(
        &self,
        request_id: &str,
        status: DetailStatus,
        reviewer: &str,
    ) -> Result<Option<RequestStatus>> {
        let details = self.persistence.detail_find_by_request(request_id).await?;
        let pending: Vec<String> = summarize_tables(&details)
            .into_iter()
            .filter(|summary| summary.status == DetailStatus::Pending)
            .map(|summary| summary.schema_id)
            .collect();
        if pending.is_empty() {
            return Ok(None);
        }
        for table in &pending {
            self.decide_table(request_id, table, status, reviewer, None, false)
                .await?;
        }
        self.finalize_change_request(request_id, reviewer)
            .await
            .map(Some)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_request(&self, request_id: &str) -> Result<ChangeRequestInfo> {
        self.find_request(request_id).await
    }

    /// Requests newest first, optionally filtered by status and author
    pub async fn list_requests(
        &self,
        status: Option<RequestStatus>,
        created_by: Option<&str>,
        page_no: u64,
        page_size: u64,
    ) -> Result<Page<ChangeRequestInfo>> {
        let page_no = page_no.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let created_by = created_by.map(str::trim).filter(|u| !u.is_empty());
        Ok(self
            .persistence
            .request_search_page(status, created_by, page_no, page_size)
            .await?)
    }

    /// A request with its details grouped per table
    pub async fn request_summary(&self, request_id: &str) -> Result<ChangeRequestSummary> {
        let request = self.find_request(request_id).await?;
        let details = self.persistence.detail_find_by_request(request_id).await?;
        Ok(ChangeRequestSummary {
            request,
            tables: summarize_tables(&details),
        })
    }

    /// Active locks on the given tables
    pub async fn lock_status(&self, schema_ids: &[String]) -> Result<Vec<TableLockInfo>> {
        let now = now_millis();
        Ok(self
            .persistence
            .lock_find_by_schemas(schema_ids)
            .await?
            .into_iter()
            .filter(|lock| !lock.is_expired_at(now))
            .collect())
    }

    /// Every active lock
    pub async fn list_locks(&self) -> Result<Vec<TableLockInfo>> {
        let now = now_millis();
        Ok(self
            .persistence
            .lock_find_all()
            .await?
            .into_iter()
            .filter(|lock| !lock.is_expired_at(now))
            .collect())
    }

    /// Records of a live table
    pub async fn live_records(&self, schema_id: &str) -> Result<Vec<LiveRecordInfo>> {
        if !is_valid_identifier(schema_id) {
            return Err(TollgateError::validation(format!(
                "invalid schema id '{}'",
                schema_id
            )));
        }
        Ok(self.persistence.record_find_all(schema_id).await?)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Drop a lock regardless of its owner, for abandoned reviews
    pub async fn force_release_lock(&self, schema_id: &str, admin: &str) -> Result<TableLockInfo> {
        let admin = require_user(admin, "admin")?;
        let released = self
            .persistence
            .lock_release(schema_id)
            .await?
            .ok_or_else(|| TollgateError::not_found(format!("lock on '{}'", schema_id)))?;
        tracing::warn!(
            table = schema_id,
            admin,
            request_id = %released.request_id,
            locked_by = %released.locked_by,
            "Table lock force released"
        );
        Ok(released)
    }

    /// Link a request to the deployment that shipped it. Rejected requests
    /// are never deployed.
    pub async fn set_deployment_version(
        &self,
        request_id: &str,
        deployment_version_id: &str,
    ) -> Result<ChangeRequestInfo> {
        let deployment_version_id = deployment_version_id.trim();
        if deployment_version_id.is_empty() {
            return Err(TollgateError::validation(
                "deploymentVersionId must not be empty",
            ));
        }
        let request = self.find_request(request_id).await?;
        if request.status == RequestStatus::Rejected {
            return Err(TollgateError::validation(format!(
                "change request '{}' was rejected and cannot be deployed",
                request_id
            )));
        }
        if !self
            .persistence
            .request_set_deployment(request_id, deployment_version_id)
            .await?
        {
            return Err(TollgateError::not_found(format!(
                "change request '{}'",
                request_id
            )));
        }
        tracing::info!(request_id, deployment_version_id, "Deployment version recorded");
        self.find_request(request_id).await
    }

    async fn find_request(&self, request_id: &str) -> Result<ChangeRequestInfo> {
        self.persistence
            .request_find_by_id(request_id)
            .await?
            .ok_or_else(|| TollgateError::not_found(format!("change request '{}'", request_id)))
    }
}

fn require_user<'a>(user: &'a str, field: &str) -> Result<&'a str> {
    let user = user.trim();
    if user.is_empty() {
        return Err(TollgateError::validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_persistence::EmbeddedPersistService;

    use crate::model::TableSnapshot;

    fn service() -> ChangeReviewService {
        ChangeReviewService::new(
            Arc::new(EmbeddedPersistService::new()),
            ReviewOptions::default(),
        )
    }

    fn submission(
        table: &str,
        old_data: Vec<serde_json::Value>,
        new_data: Vec<serde_json::Value>,
    ) -> ReviewSubmission {
        ReviewSubmission {
            schema_ids: vec![table.to_string()],
            table_changes: [(table.to_string(), TableSnapshot::new(old_data, new_data))]
                .into_iter()
                .collect(),
            version_id: "v1".to_string(),
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_submit_requires_user_and_tables() {
        let svc = service();
        let err = svc
            .submit_for_review(" ", submission("t1", vec![], vec![json!({"id": 1})]))
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::Validation(_)));

        let err = svc
            .submit_for_review("alice", ReviewSubmission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::Validation(_)));

        let err = svc
            .submit_for_review("alice", submission("bad table;", vec![], vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_request_and_table() {
        let svc = service();
        let err = svc
            .approve_table_changes("missing", "t1", "bob", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::NotFound(_)));

        let receipt = svc
            .submit_for_review("alice", submission("t1", vec![], vec![json!({"id": 1})]))
            .await
            .unwrap();
        let err = svc
            .approve_table_changes(&receipt.request_id, "t9", "bob", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unchanged_tables_are_not_locked() {
        let svc = service();
        let mut sub = submission("t1", vec![], vec![json!({"id": 1})]);
        sub.schema_ids.push("t2".to_string());
        sub.table_changes.insert(
            "t2".to_string(),
            TableSnapshot::new(vec![json!({"id": 1})], vec![json!({"id": 1})]),
        );
        let receipt = svc.submit_for_review("alice", sub).await.unwrap();
        assert_eq!(receipt.tables, vec!["t1"]);

        let locks = svc.list_locks().await.unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].schema_id, "t1");
        assert_eq!(locks[0].locked_by, "alice");
    }

    #[tokio::test]
    async fn test_manual_finalize_without_auto() {
        let options = ReviewOptions {
            auto_finalize: false,
            ..ReviewOptions::default()
        };
        let svc = ChangeReviewService::new(Arc::new(EmbeddedPersistService::new()), options);
        let receipt = svc
            .submit_for_review("alice", submission("t1", vec![], vec![json!({"id": 1})]))
            .await
            .unwrap();

        let outcome = svc
            .approve_table_changes(&receipt.request_id, "t1", "bob", None)
            .await
            .unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.finalized, None);
        assert_eq!(
            svc.get_request(&receipt.request_id).await.unwrap().status,
            RequestStatus::InReview
        );

        let status = svc
            .finalize_change_request(&receipt.request_id, "bob")
            .await
            .unwrap();
        assert_eq!(status, RequestStatus::Approved);
        assert!(svc.list_locks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deployment_version_rules() {
        let svc = service();
        let receipt = svc
            .submit_for_review("alice", submission("t1", vec![], vec![json!({"id": 1})]))
            .await
            .unwrap();
        svc.reject_table_changes(&receipt.request_id, "t1", "bob", None)
            .await
            .unwrap();

        let err = svc
            .set_deployment_version(&receipt.request_id, "deploy-1")
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::Validation(_)));

        let receipt = svc
            .submit_for_review("alice", submission("t2", vec![], vec![json!({"id": 1})]))
            .await
            .unwrap();
        svc.approve_table_changes(&receipt.request_id, "t2", "bob", None)
            .await
            .unwrap();
        let request = svc
            .set_deployment_version(&receipt.request_id, "deploy-1")
            .await
            .unwrap();
        assert_eq!(request.deployment_version_id.as_deref(), Some("deploy-1"));
    }

    #[tokio::test]
    async fn test_force_release_lock() {
        let svc = service();
        let receipt = svc
            .submit_for_review("alice", submission("t1", vec![], vec![json!({"id": 1})]))
            .await
            .unwrap();
        let released = svc.force_release_lock("t1", "root").await.unwrap();
        assert_eq!(released.request_id, receipt.request_id);

        let err = svc.force_release_lock("t1", "root").await.unwrap_err();
        assert!(matches!(err, TollgateError::NotFound(_)));

        // the table can be submitted again
        svc.submit_for_review("carol", submission("t1", vec![], vec![json!({"id": 2})]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_requests_clamps_paging() {
        let svc = service();
        for table in ["t1", "t2", "t3"] {
            svc.submit_for_review("alice", submission(table, vec![], vec![json!({"id": 1})]))
                .await
                .unwrap();
        }
        let page = svc.list_requests(None, Some("alice"), 0, 0).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.page_number, 1);
        assert_eq!(page.page_items.len(), 1);

        let page = svc.list_requests(None, Some("bob"), 1, 20).await.unwrap();
        assert_eq!(page.total_count, 0);
    }
}
