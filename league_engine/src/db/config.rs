//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;

use crate::config::{EnvConfigError, env_or};

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT_SECS`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT_SECS`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME_SECS`: Max lifetime in seconds (default: 1800)
    ///
    /// # Errors
    ///
    /// Fails if `DATABASE_URL` is not set or a numeric variable does not parse.
    pub fn from_env() -> Result<Self, EnvConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| EnvConfigError::Missing {
            var: "DATABASE_URL",
        })?;
        Self::from_env_with_url(database_url)
    }

    /// Pool settings from the environment, connection URL from the caller
    pub fn from_env_with_url(database_url: String) -> Result<Self, EnvConfigError> {
        let defaults = Self::development();
        Ok(Self {
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections, "u32")?,
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections, "u32")?,
            connection_timeout_secs: env_or(
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
                "u64",
            )?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs, "u64")?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs, "u64")?,
        })
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/league_db` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/league_db".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 20);
        assert!(config.min_connections <= config.max_connections);
        assert!(config.database_url.starts_with("postgres://"));
    }
}
