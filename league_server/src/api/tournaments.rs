//! Tournament lifecycle handlers.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "x-user-id: 1" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Spring Cup", "format": "single_elimination", "max_teams": 8}'
//! ```
//!
//! Start it once registration is closed:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/<id>/start -H "x-user-id: 1"
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use league_engine::{
    EngineConfig,
    bracket::MatchSet,
    standings::Standings,
    tournament::{
        EntryFee, FormationMode, ScoringRule, TieBreaker, Tournament, TournamentConfig,
        TournamentFormat, TournamentId, TournamentStatus,
    },
};
use serde::Deserialize;

use super::{
    AppState,
    actor::Actor,
    errors::{ApiError, ApiResult},
};

/// Body of `POST /tournaments`
///
/// Omitted fields take the format's defaults; `grand_final_reset` falls back
/// to the server's engine configuration.
#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub format: TournamentFormat,
    pub max_teams: u32,
    pub formation_mode: Option<FormationMode>,
    pub max_participants: Option<u32>,
    pub min_players_per_team: Option<u32>,
    pub max_players_per_team: Option<u32>,
    #[serde(default)]
    pub allow_substitutions: bool,
    pub scoring: Option<ScoringRule>,
    pub meetings: Option<u32>,
    pub playoff_cutoff: Option<u32>,
    pub tie_breakers: Option<Vec<TieBreaker>>,
    pub grand_final_reset: Option<bool>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub entry_fee: Option<EntryFee>,
    pub venue: Option<String>,
}

impl CreateTournamentRequest {
    pub fn into_config(self, engine: &EngineConfig) -> TournamentConfig {
        let mut config = TournamentConfig::new(self.name, self.format, self.max_teams);
        if let Some(mode) = self.formation_mode {
            config.formation_mode = mode;
        }
        config.max_participants = self.max_participants;
        if let Some(min) = self.min_players_per_team {
            config.min_players_per_team = min;
        }
        config.max_players_per_team = self
            .max_players_per_team
            .unwrap_or(config.min_players_per_team.max(config.max_players_per_team));
        config.allow_substitutions = self.allow_substitutions;
        if let Some(scoring) = self.scoring {
            config.scoring = scoring;
        }
        if let Some(meetings) = self.meetings {
            config.round_robin.meetings = meetings;
        }
        config.round_robin.playoff_cutoff = self.playoff_cutoff;
        if let Some(tie_breakers) = self.tie_breakers {
            config.tie_breakers = tie_breakers;
        }
        config.grand_final_reset = self
            .grand_final_reset
            .unwrap_or(engine.default_grand_final_reset);
        config.registration_deadline = self.registration_deadline;
        config.start_date = self.start_date;
        config.end_date = self.end_date;
        if let Some(fee) = self.entry_fee {
            config.entry_fee = fee;
        }
        config.venue = self.venue;
        config
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostponeRequest {
    pub new_start: DateTime<Utc>,
}

/// `GET /tournaments?status=open`
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Tournament>>> {
    let status = match query.status.as_deref() {
        Some(value) => Some(
            TournamentStatus::parse(value)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status {value:?}")))?,
        ),
        None => None,
    };
    Ok(Json(state.manager.list_tournaments(status).await?))
}

/// `POST /tournaments`
pub async fn create_tournament(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateTournamentRequest>,
) -> ApiResult<(StatusCode, Json<Tournament>)> {
    let config = request.into_config(state.manager.config());
    let tournament = state.manager.create_tournament(actor, config).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

/// `GET /tournaments/{id}`
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.manager.get_tournament(id).await?))
}

pub async fn publish_tournament(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.manager.publish_tournament(actor, id).await?))
}

pub async fn close_registration(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.manager.close_registration(actor, id).await?))
}

/// `POST /tournaments/{id}/start`; repeated calls return the same matches
pub async fn start_tournament(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<MatchSet>> {
    Ok(Json(state.manager.start_tournament(actor, id).await?))
}

pub async fn complete_tournament(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Standings>> {
    Ok(Json(state.manager.complete_tournament(actor, id).await?))
}

pub async fn cancel_tournament(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.manager.cancel_tournament(actor, id).await?))
}

pub async fn postpone_tournament(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
    Json(request): Json<PostponeRequest>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(
        state
            .manager
            .postpone_tournament(actor, id, request.new_start)
            .await?,
    ))
}

pub async fn resume_tournament(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.manager.resume_tournament(actor, id).await?))
}
