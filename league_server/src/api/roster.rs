//! Registration and team handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use league_engine::{
    roster::{AssignmentReport, PaymentState, Registration, RegistrationId, Team, TeamId},
    tournament::{TournamentId, UserId},
};
use serde::Deserialize;

use super::{
    AppState,
    actor::Actor,
    errors::{ApiError, ApiResult},
};

/// Largest batch accepted by `POST /teams/bulk`
pub const MAX_BULK_TEAMS: u32 = 256;

/// Body of `POST /registrations`; `user_id` defaults to the caller
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub user_id: Option<UserId>,
    pub skill_tier: Option<u8>,
    pub payment_state: Option<PaymentState>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub team_id: TeamId,
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub captain_user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct BulkTeamsRequest {
    pub count: u32,
    #[serde(default = "default_prefix")]
    pub name_prefix: String,
}

fn default_prefix() -> String {
    "Team".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct AutoAssignRequest {
    #[serde(default)]
    pub balance_by_skill: bool,
}

pub async fn list_teams(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.manager.get_competition(id).await?.teams))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<Vec<Registration>>> {
    Ok(Json(state.manager.get_competition(id).await?.registrations))
}

/// `POST /tournaments/{id}/registrations`
///
/// A full tournament answers 201 with a waitlisted registration.
pub async fn register(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let registration = state
        .manager
        .register(
            actor,
            id,
            request.user_id.unwrap_or(actor),
            request.skill_tier,
            request.payment_state.unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn withdraw_registration(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, registration_id)): Path<(TournamentId, RegistrationId)>,
) -> ApiResult<Json<Registration>> {
    Ok(Json(
        state
            .manager
            .withdraw_registration(actor, id, registration_id)
            .await?,
    ))
}

pub async fn assign_team(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, registration_id)): Path<(TournamentId, RegistrationId)>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Json<Registration>> {
    Ok(Json(
        state
            .manager
            .assign_team(actor, id, registration_id, request.team_id)
            .await?,
    ))
}

pub async fn create_team(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let team = state
        .manager
        .create_team(actor, id, &request.name, request.captain_user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn bulk_create_teams(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
    Json(request): Json<BulkTeamsRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Team>>)> {
    if request.count == 0 || request.count > MAX_BULK_TEAMS {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {MAX_BULK_TEAMS}"
        )));
    }
    let teams = state
        .manager
        .bulk_create_teams(actor, id, request.count, &request.name_prefix)
        .await?;
    Ok((StatusCode::CREATED, Json(teams)))
}

pub async fn auto_assign_teams(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<TournamentId>,
    Json(request): Json<AutoAssignRequest>,
) -> ApiResult<Json<AssignmentReport>> {
    Ok(Json(
        state
            .manager
            .auto_assign_teams(actor, id, request.balance_by_skill)
            .await?,
    ))
}

pub async fn withdraw_team(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((id, team_id)): Path<(TournamentId, TeamId)>,
) -> ApiResult<Json<Team>> {
    Ok(Json(state.manager.withdraw_team(actor, id, team_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_accepts_empty_body() {
        let request: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert!(request.user_id.is_none());
        assert_eq!(request.payment_state.unwrap_or_default(), PaymentState::default());
    }

    #[test]
    fn test_bulk_request_default_prefix() {
        let request: BulkTeamsRequest = serde_json::from_str(r#"{"count": 4}"#).unwrap();
        assert_eq!(request.name_prefix, "Team");
    }
}
