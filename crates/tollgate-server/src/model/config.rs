//! Configuration management for the Tollgate server
//!
//! Settings come from `conf/application.yml`, overlaid by `TOLLGATE_*`
//! environment variables and finally by command line flags.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use tollgate_persistence::StorageMode;
use tollgate_review::ReviewOptions;

pub const DEFAULT_SERVER_PORT: u16 = 9090;
pub const DEFAULT_USER_HEADER: &str = "X-Tollgate-User";
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

pub const STORAGE_MODE_PROPERTY: &str = "tollgate.storage.mode";
pub const SERVER_PORT_PROPERTY: &str = "server.port";
pub const USER_HEADER_PROPERTY: &str = "tollgate.auth.userHeader";

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command(name = "tollgate-server", about = "Change request review server")]
struct Cli {
    /// Configuration file, without or with extension
    #[arg(short = 'c', long = "config", default_value = "conf/application.yml")]
    config_file: String,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    database_url: Option<String>,
    /// `external_db` or `embedded`
    #[arg(short = 's', long = "storage")]
    storage: Option<String>,
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load the configuration for the process from its command line
    pub fn new() -> anyhow::Result<Self> {
        let args = Cli::parse();
        let mut config_builder = Config::builder()
            .add_source(config::File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("tollgate")
                    .separator(".")
                    .try_parsing(true),
            );

        if let Some(v) = args.database_url {
            config_builder = config_builder.set_override("db.url", v)?;
        }
        if let Some(v) = args.storage {
            config_builder = config_builder.set_override(STORAGE_MODE_PROPERTY, v)?;
        }
        if let Some(v) = args.port {
            config_builder = config_builder.set_override(SERVER_PORT_PROPERTY, i64::from(v))?;
        }

        Ok(Configuration {
            config: config_builder.build()?,
        })
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string("server.address")
            .unwrap_or("0.0.0.0".to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT_PROPERTY)
            .ok()
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Largest accepted JSON body; snapshots of whole tables can be large
    pub fn max_payload_bytes(&self) -> usize {
        self.config
            .get_int("server.maxPayloadBytes")
            .ok()
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES)
    }

    /// Header carrying the authenticated user, set by the auth proxy
    pub fn user_header(&self) -> String {
        self.config
            .get_string(USER_HEADER_PROPERTY)
            .ok()
            .filter(|header| !header.trim().is_empty())
            .unwrap_or(DEFAULT_USER_HEADER.to_string())
    }

    // ========================================================================
    // Storage Configuration
    // ========================================================================

    pub fn storage_mode(&self) -> StorageMode {
        match self.config.get_string(STORAGE_MODE_PROPERTY) {
            Ok(mode) => mode.parse::<StorageMode>().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to {}", e, StorageMode::default());
                StorageMode::default()
            }),
            Err(_) => StorageMode::default(),
        }
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let max_connections = self
            .config
            .get_int("db.pool.config.maximumPoolSize")
            .unwrap_or(20) as u32;
        let min_connections = self
            .config
            .get_int("db.pool.config.minimumPoolSize")
            .unwrap_or(1) as u32;
        let connect_timeout = self
            .config
            .get_int("db.pool.config.connectionTimeout")
            .unwrap_or(30) as u64;
        let acquire_timeout = self
            .config
            .get_int("db.pool.config.initializationFailTimeout")
            .unwrap_or(8) as u64;
        let idle_timeout = self
            .config
            .get_int("db.pool.config.idleTimeout")
            .unwrap_or(10) as u64;
        let max_lifetime = self
            .config
            .get_int("db.pool.config.maxLifetime")
            .unwrap_or(1800) as u64;
        let sqlx_logging = self
            .config
            .get_bool("db.pool.config.sqlxLogging")
            .unwrap_or(false);

        let url = self.config.get_string("db.url")?;

        let mut opt = ConnectOptions::new(url);

        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .max_lifetime(Duration::from_secs(max_lifetime))
            .sqlx_logging(sqlx_logging)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            idle_timeout = idle_timeout,
            max_lifetime = max_lifetime,
            sqlx_logging = sqlx_logging,
            "Database connection pool configured"
        );

        let database_connection: DatabaseConnection = Database::connect(opt).await?;

        Ok(database_connection)
    }

    // ========================================================================
    // Review Configuration
    // ========================================================================

    pub fn review_options(&self) -> ReviewOptions {
        let defaults = ReviewOptions::default();

        let primary_key_candidates = self
            .config
            .get_array("review.primaryKeys")
            .ok()
            .map(|keys| {
                keys.into_iter()
                    .filter_map(|key| key.into_string().ok())
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|keys| !keys.is_empty())
            .unwrap_or(defaults.primary_key_candidates);

        let lock_ttl_seconds = self
            .config
            .get_int("review.lock.ttlSeconds")
            .ok()
            .and_then(|ttl| u64::try_from(ttl).ok())
            .unwrap_or(defaults.lock_ttl_seconds);

        let auto_finalize = self
            .config
            .get_bool("review.autoFinalize")
            .unwrap_or(defaults.auto_finalize);

        ReviewOptions {
            primary_key_candidates,
            lock_ttl_seconds,
            auto_finalize,
        }
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn log_dir(&self) -> Option<String> {
        self.config.get_string("tollgate.logs.path").ok()
    }

    pub fn log_level(&self) -> String {
        self.config
            .get_string("tollgate.logs.level")
            .unwrap_or("info".to_string())
    }

    pub fn log_console_enabled(&self) -> bool {
        self.config
            .get_bool("tollgate.logs.console.enabled")
            .unwrap_or(true)
    }

    pub fn log_file_enabled(&self) -> bool {
        self.config
            .get_bool("tollgate.logs.file.enabled")
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration(overrides: &[(&str, &str)]) -> Configuration {
        let mut builder = Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Configuration::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let configuration = Configuration::default();
        assert_eq!(configuration.server_address(), "0.0.0.0");
        assert_eq!(configuration.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(configuration.user_header(), DEFAULT_USER_HEADER);
        assert_eq!(configuration.storage_mode(), StorageMode::ExternalDb);
        assert_eq!(configuration.log_level(), "info");

        let options = configuration.review_options();
        assert!(options.auto_finalize);
        assert_eq!(options.lock_ttl_seconds, 0);
        assert_eq!(options.primary_key_candidates[0], "id");
    }

    #[test]
    fn test_overrides() {
        let configuration = configuration(&[
            ("server.port", "8080"),
            (STORAGE_MODE_PROPERTY, "embedded"),
            (USER_HEADER_PROPERTY, "X-Forwarded-User"),
            ("review.lock.ttlSeconds", "3600"),
            ("review.autoFinalize", "false"),
        ]);
        assert_eq!(configuration.server_port(), 8080);
        assert_eq!(configuration.storage_mode(), StorageMode::Embedded);
        assert_eq!(configuration.user_header(), "X-Forwarded-User");

        let options = configuration.review_options();
        assert_eq!(options.lock_ttl_seconds, 3600);
        assert!(!options.auto_finalize);
    }

    #[test]
    fn test_invalid_storage_mode_falls_back() {
        let configuration = configuration(&[(STORAGE_MODE_PROPERTY, "cassandra")]);
        assert_eq!(configuration.storage_mode(), StorageMode::ExternalDb);
    }

    #[test]
    fn test_primary_keys_from_list() {
        let config = Config::builder()
            .set_override("review.primaryKeys", vec!["rule_id", "id"])
            .unwrap()
            .build()
            .unwrap();
        let options = Configuration::from_config(config).review_options();
        assert_eq!(options.primary_key_candidates, vec!["rule_id", "id"]);
    }
}
