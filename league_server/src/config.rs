//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use league_engine::{EngineConfig, config::EnvConfigError, db::DatabaseConfig};
use std::{fmt, net::SocketAddr, str::FromStr};

/// Where competitions are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory; lost on restart
    Memory,
    /// PostgreSQL through `DATABASE_URL`
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("expected memory or postgres, got {other:?}"),
            }),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub backend: StorageBackend,
    /// Database configuration, present for the postgres backend
    pub database: Option<DatabaseConfig>,
    /// Manager behaviour
    pub engine: EngineConfig,
    /// Prometheus scrape address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// CLI values, when given, take precedence over `SERVER_BIND`,
    /// `DATABASE_URL` and `STORAGE_BACKEND`.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but does not parse, or if the
    /// postgres backend is selected without a database URL.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        backend_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("SERVER_BIND")?.unwrap_or(SocketAddr::from(([127, 0, 0, 1], 8080))),
        };

        let backend = match backend_override {
            Some(backend) => backend,
            None => match std::env::var("STORAGE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => StorageBackend::Memory,
            },
        };

        let database = match (backend, database_url_override) {
            (StorageBackend::Memory, _) => None,
            (StorageBackend::Postgres, Some(url)) => Some(DatabaseConfig::from_env_with_url(url)?),
            (StorageBackend::Postgres, None) => {
                Some(DatabaseConfig::from_env().map_err(|e| match e {
                    EnvConfigError::Missing { var } => ConfigError::MissingRequired {
                        var: var.to_string(),
                        hint: "Set DATABASE_URL or pass --db-url, or use --storage memory".to_string(),
                    },
                    other => ConfigError::Env(other),
                })?)
            }
        };

        Ok(ServerConfig {
            bind,
            backend,
            database,
            engine: EngineConfig::from_env()?,
            metrics_bind: parse_env("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
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
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.engine.max_commit_retries > 20 {
            return Err(ConfigError::Invalid {
                var: "ENGINE_MAX_COMMIT_RETRIES".to_string(),
                reason: "Must be at most 20".to_string(),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error(transparent)]
    Env(#[from] EnvConfigError),
}

/// Parse an optional variable, failing on values that do not parse
fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("cannot parse {value:?}"),
        }),
        Err(_) => Ok(None),
    }
}
