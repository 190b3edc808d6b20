use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BACKEND: &str = "sql";
const DEFAULT_AUDIT_DEBOUNCE_MS: u64 = 50;
const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_CURRENCY: &str = "INR";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] ConfigError),
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL for the SQL document store
    #[validate(length(min = 1))]
    pub database_url: String,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Document store backend: "sql" or "memory"
    #[serde(default = "default_store_backend")]
    #[validate(custom = "validate_store_backend")]
    pub store_backend: String,

    /// Quiet period before the audit worker drains a burst
    #[serde(default = "default_audit_debounce_ms")]
    #[validate(custom = "validate_audit_debounce")]
    pub audit_debounce_ms: u64,

    /// Bound of the audit event channel
    #[serde(default = "default_audit_queue_capacity")]
    #[validate(custom = "validate_audit_queue_capacity")]
    pub audit_queue_capacity: usize,

    /// Currency applied to purchase orders that do not name one
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub default_currency: String,

    /// CORS: comma-separated list of allowed origins; permissive when unset
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

impl AppConfig {
    pub fn new(
        database_url: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            store_backend: default_store_backend(),
            audit_debounce_ms: default_audit_debounce_ms(),
            audit_queue_capacity: default_audit_queue_capacity(),
            default_currency: default_currency(),
            cors_allowed_origins: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn uses_memory_store(&self) -> bool {
        self.store_backend.eq_ignore_ascii_case("memory")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn audit_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.audit_debounce_ms)
    }

    /// Parsed list of allowed CORS origins, empty entries dropped
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_store_backend() -> String {
    DEFAULT_STORE_BACKEND.to_string()
}

fn default_audit_debounce_ms() -> u64 {
    DEFAULT_AUDIT_DEBOUNCE_MS
}

fn default_audit_queue_capacity() -> usize {
    DEFAULT_AUDIT_QUEUE_CAPACITY
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_level")),
    }
}

fn validate_store_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "sql" | "memory" => Ok(()),
        _ => Err(ValidationError::new("invalid_store_backend")),
    }
}

fn validate_audit_debounce(value: u64) -> Result<(), ValidationError> {
    if value > 10_000 {
        return Err(ValidationError::new("audit_debounce_too_long"));
    }
    Ok(())
}

fn validate_audit_queue_capacity(value: usize) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::new("audit_queue_capacity_zero"));
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("garment_backoffice={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration from `./config`
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://garment_backoffice.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        )
    }

    #[test]
    fn base_config_is_valid() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.audit_debounce(), std::time::Duration::from_millis(50));
        assert_eq!(cfg.default_currency, "INR");
    }

    #[test]
    fn unknown_store_backend_is_rejected() {
        let mut cfg = base_config();
        cfg.store_backend = "firestore".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_audit_capacity_is_rejected() {
        let mut cfg = base_config();
        cfg.audit_queue_capacity = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn audit_debounce_is_bounded() {
        let mut cfg = base_config();
        cfg.audit_debounce_ms = 10_000;
        assert!(cfg.validate().is_ok());
        cfg.audit_debounce_ms = 10_001;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cors_origins_skip_blank_entries() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://a.example, ,https://b.example".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn loads_values_from_default_toml() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
            database_url = "sqlite::memory:"
            store_backend = "memory"
            port = 9090
            audit_debounce_ms = 20
            "#
        )
        .unwrap();

        let cfg = load_config_from(dir.path()).unwrap();
        assert!(cfg.uses_memory_store());
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.audit_debounce_ms, 20);
    }
}
