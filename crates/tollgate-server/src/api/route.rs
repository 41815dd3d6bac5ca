//! Review API route configuration

use actix_web::web;

use super::{health, review};

/// Review API routes under `/v1/review`
///
/// ## Endpoints
/// - `POST   /requests` - Submit a change request
/// - `GET    /requests` - List change requests
/// - `GET    /requests/{requestId}` - Request with per-table details
/// - `POST   /requests/{requestId}/tables/{table}/approve|reject` - Decide a table
/// - `POST   /requests/{requestId}/finalize` - Compute the terminal status
/// - `PUT    /requests/{requestId}/deployment` - Record the deployment version
/// - `POST   /bulk/approve|reject` - Decide every open request
/// - `GET    /pending` - Open requests from the review cache
/// - `GET    /pending/locks`, `GET /pending/locks/{schemaId}` - Cached lock view
/// - `GET    /locks`, `GET|DELETE /locks/{schemaId}` - Table locks
/// - `GET    /tables/{schemaId}/records` - Live table records
/// - `POST   /refresh` - Reload the review cache
pub fn review_routes() -> actix_web::Scope {
    web::scope("/v1/review")
        .route("/requests", web::post().to(review::submit))
        .route("/requests", web::get().to(review::list_requests))
        .route(
            "/requests/{request_id}",
            web::get().to(review::request_summary),
        )
        .route(
            "/requests/{request_id}/tables/{table}/approve",
            web::post().to(review::approve_table),
        )
        .route(
            "/requests/{request_id}/tables/{table}/reject",
            web::post().to(review::reject_table),
        )
        .route(
            "/requests/{request_id}/finalize",
            web::post().to(review::finalize),
        )
        .route(
            "/requests/{request_id}/deployment",
            web::put().to(review::set_deployment),
        )
        .route("/bulk/approve", web::post().to(review::approve_all))
        .route("/bulk/reject", web::post().to(review::reject_all))
        .route("/pending", web::get().to(review::pending_requests))
        .route("/pending/locks", web::get().to(review::cached_locks))
        .route(
            "/pending/locks/{schema_id}",
            web::get().to(review::cached_lock_status),
        )
        .route("/locks", web::get().to(review::list_locks))
        .route("/locks/{schema_id}", web::get().to(review::lock_status))
        .route(
            "/locks/{schema_id}",
            web::delete().to(review::force_release_lock),
        )
        .route(
            "/tables/{schema_id}/records",
            web::get().to(review::live_records),
        )
        .route("/refresh", web::post().to(review::refresh_cache))
}

/// Register the review API plus the health and metrics endpoints
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health))
        .route("/metrics", web::get().to(health::metrics))
        .service(review_routes());
}
