use std::sync::Arc;

use tollgate_review::{ChangeReviewService, ReviewCache};
use tollgate_server::{
    metrics,
    model::{AppState, Configuration},
    startup,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = Configuration::new()?;

    let logging_config = startup::LoggingConfig::from_config(
        configuration.log_dir(),
        configuration.log_console_enabled(),
        configuration.log_file_enabled(),
        configuration.log_level(),
    )
    .with_env_overrides();
    let _logging_guard = startup::init_logging(&logging_config)?;

    let metrics_handle = match metrics::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("Prometheus recorder not installed: {}", e);
            None
        }
    };

    let persistence = startup::init_persistence(&configuration).await?;

    let review_options = configuration.review_options();
    tracing::info!(
        lock_ttl_seconds = review_options.lock_ttl_seconds,
        auto_finalize = review_options.auto_finalize,
        primary_keys = ?review_options.primary_key_candidates,
        "Review workflow configured"
    );
    let review_service = Arc::new(ChangeReviewService::new(
        persistence.clone(),
        review_options,
    ));
    let review_cache = Arc::new(ReviewCache::new(persistence));
    let cache_sync = review_cache.spawn_sync();

    let address = configuration.server_address();
    let port = configuration.server_port();

    let mut app_state = AppState::new(configuration, review_service, review_cache);
    if let Some(handle) = metrics_handle {
        app_state = app_state.with_metrics(handle);
    }

    tracing::info!(address = %address, port, "Starting Tollgate server");
    startup::main_server(Arc::new(app_state), address, port)?.await?;

    cache_sync.abort();
    tracing::info!("Tollgate server stopped");
    Ok(())
}
