//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use pasur::{db::DatabaseConfig, session::SessionConfig};
use std::{net::SocketAddr, str::FromStr};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` keeps sessions in memory
    pub database: Option<DatabaseConfig>,
    /// Timers and rules every new session is dealt with
    pub session: SessionConfig,
    /// Prometheus scrape address; `None` disables the exporter
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `in_memory` - Ignore any database URL and keep sessions in memory
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but does not parse
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        in_memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or("SERVER_BIND", default_bind())?,
        };

        let database_url = database_url_override.or_else(|| std::env::var("DATABASE_URL").ok());
        let database = match database_url {
            Some(database_url) if !in_memory => Some(DatabaseConfig {
                database_url,
                max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20)?,
                min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5)?,
                connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT", 10)?,
                idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", 600)?,
                max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", 1800)?,
            }),
            _ => None,
        };

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            turn_timeout_secs: parse_env_or("TURN_TIMEOUT_SECS", defaults.turn_timeout_secs)?,
            tick_interval_ms: parse_env_or("TICK_INTERVAL_MS", defaults.tick_interval_ms)?,
            continuation_timeout_ms: parse_env_or(
                "CONTINUATION_TIMEOUT_MS",
                defaults.continuation_timeout_ms,
            )?,
            ready_timeout_secs: parse_env_or("READY_TIMEOUT_SECS", defaults.ready_timeout_secs)?,
            max_consecutive_timeouts: parse_env_or(
                "MAX_CONSECUTIVE_TIMEOUTS",
                defaults.max_consecutive_timeouts,
            )?,
            redeal_threshold: parse_env_or("REDEAL_THRESHOLD", defaults.redeal_threshold)?,
            scoring: defaults.scoring,
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) if !value.is_empty() => {
                Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{value}' is not a socket address"),
                })?)
            }
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            session,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "session".to_string(),
                reason,
            })?;

        if let Some(database) = &self.database {
            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Must not exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from the server bind address".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// `127.0.0.1:6969`
fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Helper to parse environment variable with default fallback
///
/// Unset variables fall back to `default`; set but unparseable ones are errors.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{value}' does not parse"),
        }),
        Err(_) => Ok(default),
    }
}
