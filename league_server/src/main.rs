//! League competition server.
//!
//! Serves the competition engine over HTTP, backed either by process memory
//! or by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use league_engine::{
    CompetitionManager,
    audit::{AuditSink, MemoryAuditSink, PgAuditSink},
    authz::{Authorizer, PgAuthorizer, StaticAuthorizer},
    db::{CompetitionRepository, Database, MemoryRepository},
    notify::{ChannelNotifier, CompetitionEvent},
};
use league_server::{
    api::{self, AppState},
    config::{ServerConfig, StorageBackend},
    logging, metrics,
};
use pico_args::Arguments;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

const HELP: &str = "\
Run the league competition server

USAGE:
  league_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --storage    BACKEND     memory or postgres          [default: env STORAGE_BACKEND or memory]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                         Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND                     memory or postgres
  DATABASE_URL                        PostgreSQL connection string
  DB_MAX_CONNECTIONS                  Pool upper bound
  ENGINE_MAX_COMMIT_RETRIES           Retries after a concurrent modification
  ENGINE_DEFAULT_GRAND_FINAL_RESET    Default for new double-elimination tournaments
  METRICS_BIND                        Prometheus exporter address (disabled when unset)
  RUST_LOG                            Log filter
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let storage: Option<StorageBackend> = pargs.opt_value_from_str("--storage")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url, storage)?;
    config.validate()?;
    info!(
        bind = %config.bind,
        storage = %config.backend,
        "Starting league server"
    );

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus exporter listening on {}", metrics_bind);
    }

    let (repository, authorizer, audit, database): (
        Arc<dyn CompetitionRepository>,
        Arc<dyn Authorizer>,
        Arc<dyn AuditSink>,
        Option<Database>,
    ) = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::connect(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            info!("Database connected successfully");

            let pool = db.shared_pool();
            (
                Arc::new(db.competitions()),
                Arc::new(PgAuthorizer::new(pool.clone())),
                Arc::new(PgAuditSink::new(pool)),
                Some(db),
            )
        }
        None => {
            warn!("Using in-memory storage; competitions are lost on restart");
            (
                Arc::new(MemoryRepository::new()),
                Arc::new(StaticAuthorizer::new()),
                Arc::new(MemoryAuditSink::new()),
                None,
            )
        }
    };

    let (notifier, events) = ChannelNotifier::new();
    tokio::spawn(log_events(events));

    let manager = Arc::new(CompetitionManager::new(
        repository,
        authorizer,
        audit,
        Arc::new(notifier),
        config.engine.clone(),
    ));

    let app = api::create_router(AppState::new(manager, database.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Logs every competition event until the notifier is dropped
async fn log_events(mut events: UnboundedReceiver<CompetitionEvent>) {
    while let Some(event) = events.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(target: "league_server::events", "{}", payload),
            Err(e) => warn!("Failed to encode competition event: {}", e),
        }
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
