use crate::config::AppConfig;
use crate::store::StoreError;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

const CREATE_DOCUMENTS: &str = r#"CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)"#;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            ..Default::default()
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, StoreError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    info!(
        max_connections = config.max_connections,
        "Connecting to database"
    );
    let pool = Database::connect(opt).await?;
    info!("Database connection pool established successfully");
    Ok(pool)
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, StoreError> {
    establish_connection_with_config(&DbConfig::from(cfg)).await
}

/// A private in-memory SQLite database. One pooled connection keeps the
/// database alive for the lifetime of the pool.
pub async fn connect_sqlite_memory() -> Result<DbPool, StoreError> {
    establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        idle_timeout: Duration::from_secs(24 * 60 * 60),
        ..Default::default()
    })
    .await
}

/// Creates the `documents` table used by [`crate::store::SqlStore`].
pub async fn ensure_schema(db: &DbPool) -> Result<(), StoreError> {
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(backend, CREATE_DOCUMENTS.to_string()))
        .await?;
    info!(?backend, "documents table ready");
    Ok(())
}
