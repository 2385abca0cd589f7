//! Mapping of engine errors onto HTTP responses.
//!
//! Every failure is returned as an `ErrorReport` JSON body:
//!
//! ```json
//! {"kind": "team_full", "class": "fix_input", "reason": "Team ... is full (5 players)"}
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use league_engine::{CompetitionError, ErrorClass, ErrorReport};

use crate::{logging, metrics};

/// Errors a handler can return
#[derive(Debug)]
pub enum ApiError {
    /// The engine refused the operation
    Competition(CompetitionError),
    /// No usable `x-user-id` header
    MissingActor,
    /// Request parameters the engine never saw
    BadRequest(String),
}

impl From<CompetitionError> for ApiError {
    fn from(err: CompetitionError) -> Self {
        Self::Competition(err)
    }
}

/// HTTP status for an engine error
pub fn status_for(err: &CompetitionError) -> StatusCode {
    use CompetitionError::*;
    match err {
        TournamentNotFound(_) | TeamNotFound(_) | RegistrationNotFound(_) | MatchNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        Unauthorized { .. } => StatusCode::FORBIDDEN,
        Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        InsufficientTeams { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        InvalidStateTransition { .. }
        | AlreadyRegistered(_)
        | TeamFull { .. }
        | MatchAlreadyTerminal(_)
        | MatchNotTerminal(_)
        | MatchNotReady(_)
        | ConcurrentModification(_) => StatusCode::CONFLICT,
        _ => match err.class() {
            ErrorClass::NeedsAdminAction => StatusCode::CONFLICT,
            ErrorClass::Retry => StatusCode::SERVICE_UNAVAILABLE,
            ErrorClass::Forbidden => StatusCode::FORBIDDEN,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorClass::FixInput => StatusCode::BAD_REQUEST,
        },
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorReport) {
        match self {
            Self::Competition(err) => (status_for(err), err.report()),
            Self::MissingActor => (
                StatusCode::UNAUTHORIZED,
                ErrorReport {
                    kind: "missing_actor",
                    class: ErrorClass::Forbidden,
                    reason: "x-user-id header with a numeric user id is required".to_string(),
                },
            ),
            Self::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                ErrorReport {
                    kind: "bad_request",
                    class: ErrorClass::FixInput,
                    reason: reason.clone(),
                },
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, report) = self.parts();
        metrics::competition_errors_total(report.kind, report.class.as_str());

        match &self {
            Self::Competition(CompetitionError::Unauthorized { user_id, .. }) => {
                logging::log_security_event("forbidden", Some(*user_id), &report.reason);
            }
            Self::Competition(err) if status.is_server_error() => {
                // Full error; the response carries the sanitized message
                tracing::error!(kind = report.kind, "Request failed: {err}");
            }
            _ => tracing::debug!(kind = report.kind, "Request rejected: {}", report.reason),
        }

        (status, Json(report)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use league_engine::tournament::{TournamentStatus, Transition};
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(status_for(&CompetitionError::TournamentNotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&CompetitionError::Unauthorized {
                user_id: 5,
                tournament_id: id,
                action: "publish",
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&CompetitionError::InvalidStateTransition {
                attempted: Transition::Start,
                current: TournamentStatus::Draft,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CompetitionError::InvalidConfiguration("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CompetitionError::MatchesOutstanding { remaining: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CompetitionError::InsufficientTeams { needed: 2, current: 1 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_missing_actor_is_unauthorized() {
        let response = ApiError::MissingActor.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
