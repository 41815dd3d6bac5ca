//! Health and metrics endpoints

use actix_web::{HttpResponse, web};
use serde::Serialize;

use tollgate_common::error::SERVER_ERROR;

use crate::model::AppState;
use crate::model::response::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub storage: String,
}

/// Storage backend liveness
///
/// `GET /health`
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let persistence = data.persistence();
    let storage = persistence.storage_mode().to_string();
    match persistence.health_check().await {
        Ok(()) => Result::<()>::http_success(HealthStatus {
            status: "UP",
            storage,
        }),
        Err(e) => {
            tracing::error!(storage = %storage, "Health check failed: {}", e);
            Result::<()>::http_response(
                503,
                SERVER_ERROR.code,
                e.to_string(),
                HealthStatus {
                    status: "DOWN",
                    storage,
                },
            )
        }
    }
}

/// Prometheus scrape endpoint
///
/// `GET /metrics`
pub async fn metrics(data: web::Data<AppState>) -> HttpResponse {
    match &data.metrics_handle {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::NotFound().finish(),
    }
}
