//! Bracket, match result and standings handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use league_engine::{
    bracket::{Match, MatchId, MatchSet},
    progression::ResultChange,
    roster::TeamId,
    standings::{ManualPlacement, Standings},
    tournament::TournamentId,
};
use serde::Deserialize;

use super::{AppState, actor::Actor, errors::ApiResult};

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub home_score: u32,
    pub away_score: u32,
}

#[derive(Debug, Deserialize)]
pub struct ForfeitRequest {
    pub forfeiting_team_id: TeamId,
}

#[derive(Debug, Deserialize)]
pub struct ResolveTiesRequest {
    pub placements: Vec<ManualPlacement>,
}

pub async fn generate_bracket(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<MatchSet>> {
    Ok(Json(state.manager.generate_bracket(actor, id).await?))
}

pub async fn list_matches(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<MatchSet>> {
    Ok(Json(state.manager.list_matches(id).await?))
}

pub async fn start_match(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, match_id)): Path<(TournamentId, MatchId)>,
) -> ApiResult<Json<Match>> {
    Ok(Json(state.manager.start_match(actor, id, match_id).await?))
}

/// `POST /tournaments/{id}/matches/{match_id}/score`
pub async fn enter_score(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, match_id)): Path<(TournamentId, MatchId)>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<Json<ResultChange>> {
    Ok(Json(
        state
            .manager
            .enter_score(actor, id, match_id, request.home_score, request.away_score)
            .await?,
    ))
}

pub async fn record_forfeit(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, match_id)): Path<(TournamentId, MatchId)>,
    Json(request): Json<ForfeitRequest>,
) -> ApiResult<Json<ResultChange>> {
    Ok(Json(
        state
            .manager
            .record_forfeit(actor, id, match_id, request.forfeiting_team_id)
            .await?,
    ))
}

/// Rewrites a completed result and re-propagates it downstream
pub async fn correct_score(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, match_id)): Path<(TournamentId, MatchId)>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<Json<ResultChange>> {
    Ok(Json(
        state
            .manager
            .correct_score(actor, id, match_id, request.home_score, request.away_score)
            .await?,
    ))
}

pub async fn get_standings(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Standings>> {
    Ok(Json(state.manager.get_standings(id).await?))
}

pub async fn resolve_ties(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
    Json(request): Json<ResolveTiesRequest>,
) -> ApiResult<Json<Standings>> {
    Ok(Json(
        state
            .manager
            .resolve_ties(actor, id, &request.placements)
            .await?,
    ))
}
