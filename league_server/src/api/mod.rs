//! HTTP API for the league server.
//!
//! Every call is a thin wrapper over [`CompetitionManager`]: handlers parse
//! the request, pass the caller from the `x-user-id` header through as the
//! actor, and map [`league_engine::CompetitionError`] onto HTTP statuses.
//!
//! # Modules
//!
//! - [`tournaments`]: create, list and lifecycle transitions
//! - [`roster`]: registrations, teams and auto-assignment
//! - [`matches`]: bracket generation, results, corrections and standings
//! - [`actor`]: caller identity extractor
//! - [`errors`]: error to response mapping
//! - [`request_id`]: request tracing, logging and metrics
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod actor;
pub mod errors;
pub mod matches;
pub mod request_id;
pub mod roster;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use league_engine::{CompetitionManager, db::Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// `database` is set only when the PostgreSQL backend is active; the health
/// check pings it.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CompetitionManager>,
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(manager: Arc<CompetitionManager>, database: Option<Database>) -> Self {
        Self { manager, database }
    }
}

/// Create the complete API router.
///
/// ```text
/// GET  /health
/// GET  /api/v1/tournaments?status=open
/// POST /api/v1/tournaments
/// GET  /api/v1/tournaments/{id}
/// POST /api/v1/tournaments/{id}/publish
/// POST /api/v1/tournaments/{id}/close
/// POST /api/v1/tournaments/{id}/start
/// POST /api/v1/tournaments/{id}/complete
/// POST /api/v1/tournaments/{id}/cancel
/// POST /api/v1/tournaments/{id}/postpone
/// POST /api/v1/tournaments/{id}/resume
/// GET  /api/v1/tournaments/{id}/registrations
/// POST /api/v1/tournaments/{id}/registrations
/// POST /api/v1/tournaments/{id}/registrations/{registration_id}/withdraw
/// POST /api/v1/tournaments/{id}/registrations/{registration_id}/assign
/// GET  /api/v1/tournaments/{id}/teams
/// POST /api/v1/tournaments/{id}/teams
/// POST /api/v1/tournaments/{id}/teams/bulk
/// POST /api/v1/tournaments/{id}/teams/auto-assign
/// POST /api/v1/tournaments/{id}/teams/{team_id}/withdraw
/// POST /api/v1/tournaments/{id}/bracket
/// GET  /api/v1/tournaments/{id}/matches
/// POST /api/v1/tournaments/{id}/matches/{match_id}/start
/// POST /api/v1/tournaments/{id}/matches/{match_id}/score
/// POST /api/v1/tournaments/{id}/matches/{match_id}/forfeit
/// POST /api/v1/tournaments/{id}/matches/{match_id}/correct
/// GET  /api/v1/tournaments/{id}/standings
/// POST /api/v1/tournaments/{id}/standings/resolve
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let tournament_routes = Router::new()
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route("/tournaments/{id}/publish", post(tournaments::publish_tournament))
        .route("/tournaments/{id}/close", post(tournaments::close_registration))
        .route("/tournaments/{id}/start", post(tournaments::start_tournament))
        .route("/tournaments/{id}/complete", post(tournaments::complete_tournament))
        .route("/tournaments/{id}/cancel", post(tournaments::cancel_tournament))
        .route("/tournaments/{id}/postpone", post(tournaments::postpone_tournament))
        .route("/tournaments/{id}/resume", post(tournaments::resume_tournament));

    let roster_routes = Router::new()
        .route(
            "/tournaments/{id}/registrations",
            get(roster::list_registrations).post(roster::register),
        )
        .route(
            "/tournaments/{id}/registrations/{registration_id}/withdraw",
            post(roster::withdraw_registration),
        )
        .route(
            "/tournaments/{id}/registrations/{registration_id}/assign",
            post(roster::assign_team),
        )
        .route(
            "/tournaments/{id}/teams",
            get(roster::list_teams).post(roster::create_team),
        )
        .route("/tournaments/{id}/teams/bulk", post(roster::bulk_create_teams))
        .route(
            "/tournaments/{id}/teams/auto-assign",
            post(roster::auto_assign_teams),
        )
        .route(
            "/tournaments/{id}/teams/{team_id}/withdraw",
            post(roster::withdraw_team),
        );

    let match_routes = Router::new()
        .route("/tournaments/{id}/bracket", post(matches::generate_bracket))
        .route("/tournaments/{id}/matches", get(matches::list_matches))
        .route(
            "/tournaments/{id}/matches/{match_id}/start",
            post(matches::start_match),
        )
        .route(
            "/tournaments/{id}/matches/{match_id}/score",
            post(matches::enter_score),
        )
        .route(
            "/tournaments/{id}/matches/{match_id}/forfeit",
            post(matches::record_forfeit),
        )
        .route(
            "/tournaments/{id}/matches/{match_id}/correct",
            post(matches::correct_score),
        )
        .route("/tournaments/{id}/standings", get(matches::get_standings))
        .route(
            "/tournaments/{id}/standings/resolve",
            post(matches::resolve_ties),
        );

    Router::new()
        .merge(tournament_routes)
        .merge(roster_routes)
        .merge(match_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the storage backend answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","storage":"memory","database":null,"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, database_healthy) = match &state.database {
        Some(database) => ("postgres", Some(database.health_check().await.is_ok())),
        None => ("memory", None),
    };
    let healthy = database_healthy.unwrap_or(true);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": database_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
