//! Application startup utilities module.

mod http;
mod logging;

pub use http::main_server;
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};

use std::sync::Arc;

use tollgate_migration::{Migrator, MigratorTrait};
use tollgate_persistence::{
    EmbeddedPersistService, ExternalDbPersistService, PersistenceService, StorageMode,
};

use crate::model::Configuration;

/// Open the configured storage backend; the SQL schema is migrated first
pub async fn init_persistence(
    configuration: &Configuration,
) -> anyhow::Result<Arc<dyn PersistenceService>> {
    let mode = configuration.storage_mode();
    tracing::info!(storage = %mode, "Initializing persistence");

    let persistence: Arc<dyn PersistenceService> = match mode {
        StorageMode::ExternalDb => {
            let db = configuration.database_connection().await?;
            Migrator::up(&db, None).await?;
            tracing::info!("Database migrations applied");
            Arc::new(ExternalDbPersistService::new(db))
        }
        StorageMode::Embedded => {
            tracing::warn!("Embedded storage keeps review data in memory only");
            Arc::new(EmbeddedPersistService::new())
        }
    };
    Ok(persistence)
}
