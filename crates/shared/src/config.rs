//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Reconciliation sweep schedule.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Attachment storage. Attachments are disabled when absent.
    #[serde(default)]
    pub storage: Option<StorageSettings>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection and acquire timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    10
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Schedule for the background reconciliation sweep.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Delay after start before the first sweep.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    /// Interval between sweeps; `0` runs the sweep only once.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay(),
            interval_secs: default_interval(),
        }
    }
}

fn default_initial_delay() -> u64 {
    5
}

fn default_interval() -> u64 {
    3600
}

/// Attachment storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `local` or `s3`.
    #[serde(default = "default_storage_kind")]
    pub kind: String,
    /// Root directory for `local`.
    pub root: Option<String>,
    /// S3 endpoint.
    pub endpoint: Option<String>,
    /// S3 bucket.
    pub bucket: Option<String>,
    /// S3 access key id.
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    pub secret_access_key: Option<String>,
    /// S3 region.
    pub region: Option<String>,
    /// Maximum accepted file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_storage_kind() -> String {
    "local".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("VOUCHLEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("VOUCHLEDGER__SERVER__HOST", Some("127.0.0.1")),
                ("VOUCHLEDGER__DATABASE__URL", Some("sqlite::memory:")),
                ("VOUCHLEDGER__JWT__SECRET", Some("test-secret")),
                ("VOUCHLEDGER__RECONCILIATION__INTERVAL_SECS", Some("0")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.host, "127.0.0.1");
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.database.url, "sqlite::memory:");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.jwt.secret, "test-secret");
                assert_eq!(config.reconciliation.initial_delay_secs, 5);
                assert_eq!(config.reconciliation.interval_secs, 0);
                assert!(config.storage.is_none());
            },
        );
    }

    #[test]
    fn test_reconciliation_defaults() {
        let config = ReconciliationConfig::default();
        assert_eq!(config.initial_delay_secs, 5);
        assert_eq!(config.interval_secs, 3600);
    }
}
