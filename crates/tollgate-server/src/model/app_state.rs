//! Shared state handed to every HTTP handler

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use tollgate_persistence::PersistenceService;
use tollgate_review::{ChangeReviewService, ReviewCache};

use super::config::Configuration;

/// Application state shared across handlers
pub struct AppState {
    pub configuration: Configuration,
    pub review_service: Arc<ChangeReviewService>,
    pub review_cache: Arc<ReviewCache>,
    /// Present when the Prometheus recorder was installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        configuration: Configuration,
        review_service: Arc<ChangeReviewService>,
        review_cache: Arc<ReviewCache>,
    ) -> Self {
        Self {
            configuration,
            review_service,
            review_cache,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn persistence(&self) -> &Arc<dyn PersistenceService> {
        self.review_service.persistence()
    }
}
