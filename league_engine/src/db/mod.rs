//! PostgreSQL storage for competitions.
//!
//! [`Database`] owns the shared pool that the competition repository, the
//! role authorizer and the audit sink all draw from. [`MemoryRepository`]
//! is the in-process alternative used by tests and the `memory` backend.
//! Tables are created by `league_engine/migrations/0001_competition.sql`.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};

pub mod config;
pub mod memory;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::MemoryRepository;
pub use repository::{CompetitionRepository, PgCompetitionRepository};

/// Shared handle to the competition store
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Opens the pool sized by `config`. Fails if the first connection cannot
    /// be established within the acquire timeout.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Pool handle for the repository, authorizer and audit sink
    pub fn shared_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    pub fn competitions(&self) -> PgCompetitionRepository {
        PgCompetitionRepository::new(self.shared_pool())
    }

    /// Succeeds only when the server is reachable and the competition
    /// schema has been applied.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1 FROM tournaments LIMIT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
