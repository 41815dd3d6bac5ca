//! Review API handlers
//!
//! HTTP handlers for submitting change requests, deciding tables,
//! finalizing, bulk review and lock administration.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use tollgate_common::{DEFAULT_PAGE_SIZE, TollgateError};
use tollgate_persistence::RequestStatus;
use tollgate_review::ReviewSubmission;

use crate::middleware::identity::ReviewerExt;
use crate::model::AppState;
use crate::model::response::{Result, error_response, respond};

// ============================================================================
// Parameters
// ============================================================================

/// Path parameters for table decisions
#[derive(Debug, Deserialize)]
pub struct TablePathParams {
    pub request_id: String,
    pub table: String,
}

/// Query parameters for listing requests
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsQuery {
    pub status: Option<String>,
    pub created_by: Option<String>,
    pub page_no: Option<u64>,
    pub page_size: Option<u64>,
}

/// Optional body of approve / reject
#[derive(Debug, Default, Deserialize)]
pub struct DecisionBody {
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentBody {
    pub deployment_version_id: String,
}

/// Query parameters for lock status; `schemaIds` is comma separated
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockQuery {
    pub schema_ids: Option<String>,
}

// ============================================================================
// Change Requests
// ============================================================================

/// Submit table snapshots for review
///
/// `POST /v1/review/requests`
pub async fn submit(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<ReviewSubmission>,
) -> HttpResponse {
    let user = req.reviewer();
    match data
        .review_service
        .submit_for_review(&user, body.into_inner())
        .await
    {
        Ok(receipt) => Result::<String>::http_response(200, 0, receipt.message(), receipt),
        Err(e) => error_response(&e),
    }
}

/// List change requests, newest first
///
/// `GET /v1/review/requests`
pub async fn list_requests(
    data: web::Data<AppState>,
    query: web::Query<ListRequestsQuery>,
) -> HttpResponse {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(status) => match status.parse::<RequestStatus>() {
            Ok(status) => Some(status),
            Err(e) => return error_response(&TollgateError::validation(e)),
        },
        None => None,
    };

    respond(
        data.review_service
            .list_requests(
                status,
                query.created_by.as_deref(),
                query.page_no.unwrap_or(1),
                query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            )
            .await,
    )
}

/// Open requests as seen by the review cache
///
/// `GET /v1/review/pending`
pub async fn pending_requests(data: web::Data<AppState>) -> HttpResponse {
    Result::<()>::http_success(data.review_cache.pending_requests())
}

/// Unexpired locks as seen by the review cache
///
/// `GET /v1/review/pending/locks`
pub async fn cached_locks(data: web::Data<AppState>) -> HttpResponse {
    Result::<()>::http_success(data.review_cache.locked_tables())
}

/// Whether the review cache holds a lock on the table
///
/// `GET /v1/review/pending/locks/{schema_id}`
pub async fn cached_lock_status(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    Result::<()>::http_success(serde_json::json!({
        "schemaId": path.as_str(),
        "locked": data.review_cache.is_locked(&path),
    }))
}

/// A request with its per-table details
///
/// `GET /v1/review/requests/{request_id}`
pub async fn request_summary(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    respond(data.review_service.request_summary(&path).await)
}

/// Approve the pending details of one table
///
/// `POST /v1/review/requests/{request_id}/tables/{table}/approve`
pub async fn approve_table(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<TablePathParams>,
    body: Option<web::Json<DecisionBody>>,
) -> HttpResponse {
    let comment = body.and_then(|b| b.into_inner().comment);
    respond(
        data.review_service
            .approve_table_changes(&path.request_id, &path.table, &req.reviewer(), comment)
            .await,
    )
}

/// Reject the pending details of one table
///
/// `POST /v1/review/requests/{request_id}/tables/{table}/reject`
pub async fn reject_table(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<TablePathParams>,
    body: Option<web::Json<DecisionBody>>,
) -> HttpResponse {
    let comment = body.and_then(|b| b.into_inner().comment);
    respond(
        data.review_service
            .reject_table_changes(&path.request_id, &path.table, &req.reviewer(), comment)
            .await,
    )
}

/// Compute the terminal status of a request
///
/// `POST /v1/review/requests/{request_id}/finalize`
pub async fn finalize(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    respond(
        data.review_service
            .finalize_change_request(&path, &req.reviewer())
            .await,
    )
}

/// Link a request to the deployment that shipped it
///
/// `PUT /v1/review/requests/{request_id}/deployment`
pub async fn set_deployment(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<DeploymentBody>,
) -> HttpResponse {
    respond(
        data.review_service
            .set_deployment_version(&path, &body.deployment_version_id)
            .await,
    )
}

// ============================================================================
// Bulk Review
// ============================================================================

/// Approve every open request
///
/// `POST /v1/review/bulk/approve`
pub async fn approve_all(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    respond(data.review_service.approve_all(&req.reviewer()).await)
}

/// Reject every open request
///
/// `POST /v1/review/bulk/reject`
pub async fn reject_all(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    respond(data.review_service.reject_all(&req.reviewer()).await)
}

// ============================================================================
// Locks and Records
// ============================================================================

/// Active locks, optionally restricted to `schemaIds`
///
/// `GET /v1/review/locks`
pub async fn list_locks(data: web::Data<AppState>, query: web::Query<LockQuery>) -> HttpResponse {
    match query.schema_ids.as_deref() {
        Some(schema_ids) => {
            let schema_ids: Vec<String> = schema_ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            respond(data.review_service.lock_status(&schema_ids).await)
        }
        None => respond(data.review_service.list_locks().await),
    }
}

/// Lock held on one table; `null` when the table is free
///
/// `GET /v1/review/locks/{schema_id}`
pub async fn lock_status(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    respond(
        data.review_service
            .lock_status(&[path.into_inner()])
            .await
            .map(|locks| locks.into_iter().next()),
    )
}

/// Drop a lock left behind by an abandoned review
///
/// `DELETE /v1/review/locks/{schema_id}`
pub async fn force_release_lock(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    respond(
        data.review_service
            .force_release_lock(&path, &req.reviewer())
            .await,
    )
}

/// Records of a live table
///
/// `GET /v1/review/tables/{schema_id}/records`
pub async fn live_records(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    respond(data.review_service.live_records(&path).await)
}

/// Reload the review cache from the store
///
/// `POST /v1/review/refresh`
pub async fn refresh_cache(data: web::Data<AppState>) -> HttpResponse {
    match data.review_cache.force_refresh().await {
        Ok(stats) => {
            crate::metrics::set_review_cache_size(stats.requests, stats.locks);
            Result::<()>::http_success(stats)
        }
        Err(e) => error_response(&TollgateError::from(e)),
    }
}
