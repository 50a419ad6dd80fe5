//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger orchestration settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Read-model cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
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
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
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
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger orchestration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Upper bound for a single storage transaction, in milliseconds.
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: default_transaction_timeout(),
        }
    }
}

fn default_transaction_timeout() -> u64 {
    5_000
}

/// Read-model cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Number of records per history page.
    #[serde(default = "default_item_per_page")]
    pub item_per_page: u64,
    /// Lifetime of a cached record snapshot, in seconds.
    #[serde(default = "default_record_ttl")]
    pub record_ttl_secs: u64,
    /// Lifetime of a cached history timeline, in seconds.
    #[serde(default = "default_pagination_ttl")]
    pub pagination_ttl_secs: u64,
    /// Maximum number of entries per cache.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            item_per_page: default_item_per_page(),
            record_ttl_secs: default_record_ttl(),
            pagination_ttl_secs: default_pagination_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_item_per_page() -> u64 {
    50
}

fn default_record_ttl() -> u64 {
    43_200 // 12 hours
}

fn default_pagination_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_max_capacity() -> u64 {
    100_000
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
            .add_source(config::Environment::with_prefix("PAYSTORE").separator("__"))
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
                ("PAYSTORE__DATABASE__URL", Some("postgres://localhost/paystore")),
                ("PAYSTORE__SERVER__PORT", Some("9090")),
                ("PAYSTORE__LEDGER__TRANSACTION_TIMEOUT_MS", Some("250")),
                ("RUN_MODE", Some("test-no-such-file")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/paystore");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.ledger.transaction_timeout_ms, 250);
                assert_eq!(config.database.max_connections, 10);
            },
        );
    }

    #[test]
    fn test_cache_defaults() {
        temp_env::with_vars(
            [
                ("PAYSTORE__DATABASE__URL", Some("postgres://localhost/paystore")),
                ("RUN_MODE", Some("test-no-such-file")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.cache.item_per_page, 50);
                assert_eq!(config.cache.record_ttl_secs, 12 * 3600);
                assert_eq!(config.cache.pagination_ttl_secs, 24 * 3600);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("PAYSTORE__DATABASE__URL", None::<&str>),
                ("RUN_MODE", Some("test-no-such-file")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
