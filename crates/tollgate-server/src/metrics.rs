// Metrics for the review server, exported in Prometheus text format

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe every metric.
/// Should be called once at application startup
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    describe_counter!(
        "review_submissions_total",
        "Total number of change requests submitted"
    );
    describe_counter!(
        "review_decisions_total",
        "Total number of table approve / reject decisions"
    );
    describe_counter!(
        "review_finalized_total",
        "Total number of change requests reaching a terminal status"
    );

    describe_gauge!("review_cache_requests", "Open change requests in the review cache");
    describe_gauge!("review_cache_locks", "Table locks in the review cache");

    tracing::info!("Metrics initialized");
    Ok(handle)
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string(), "path" => path.to_string()).record(duration_secs);

    if status >= 400 {
        counter!("http_requests_errors_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string()).increment(1);
    }
}

/// Update review cache sizes
pub fn set_review_cache_size(requests: usize, locks: usize) {
    gauge!("review_cache_requests").set(requests as f64);
    gauge!("review_cache_locks").set(locks as f64);
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
