//! Competition error types.

use serde::Serialize;
use thiserror::Error;

use crate::{
    bracket::MatchId,
    roster::{RegistrationId, TeamId},
    tournament::{FormationMode, TournamentId, TournamentStatus, Transition, UserId},
};

/// Competition errors
#[derive(Debug, Error)]
pub enum CompetitionError {
    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Team not found
    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    /// Registration not found
    #[error("Registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Lifecycle transition not allowed from the current status
    #[error("Invalid state transition: cannot {attempted} a tournament that is {current}")]
    InvalidStateTransition {
        attempted: Transition,
        current: TournamentStatus,
    },

    /// Not enough eligible teams to build a competition
    #[error("Insufficient teams: need {needed}, have {current}")]
    InsufficientTeams { needed: usize, current: usize },

    /// Format constraints violated (cutoff, meetings, capacity)
    #[error("Invalid format configuration: {0}")]
    InvalidFormatConfiguration(String),

    /// Tournament configuration rejected (dates, fees, capacities)
    #[error("Invalid tournament configuration: {0}")]
    InvalidConfiguration(String),

    /// User already holds an active registration
    #[error("User {0} is already registered")]
    AlreadyRegistered(UserId),

    /// Team roster is at `max_players_per_team`
    #[error("Team {team_id} is full ({max} players)")]
    TeamFull { team_id: TeamId, max: u32 },

    /// Tournament already holds `max_teams` teams
    #[error("Team capacity reached ({0} teams)")]
    TeamCapacityReached(u32),

    /// Roster edits are locked once the competition has started
    #[error("Roster is locked while the tournament is {0}")]
    RosterLocked(TournamentStatus),

    /// Operation belongs to the other formation mode
    #[error("Operation requires {expected:?} formation, tournament uses {actual:?}")]
    FormationModeMismatch {
        expected: FormationMode,
        actual: FormationMode,
    },

    /// Registration or team is not in a state that allows the operation
    #[error("Invalid roster operation: {0}")]
    InvalidRosterOperation(String),

    /// Match already Completed or Forfeit
    #[error("Match {0} is already terminal")]
    MatchAlreadyTerminal(MatchId),

    /// Correction requested on a match that has no result yet
    #[error("Match {0} has no result to correct")]
    MatchNotTerminal(MatchId),

    /// One of the match slots is still TBD
    #[error("Match {0} is waiting for its participants")]
    MatchNotReady(MatchId),

    /// Drawn score where the format needs a winner
    #[error("Match {0} cannot end in a tie")]
    TieNotAllowed(MatchId),

    /// Score above the accepted maximum
    #[error("Score {score} for match {match_id} exceeds the maximum of {max}")]
    ScoreOutOfRange { match_id: MatchId, score: u32, max: u32 },

    /// A team counter would leave its representable range
    #[error("Record of team {0} would overflow")]
    RecordOverflow(TeamId),

    /// Team is not one of the match participants
    #[error("Team {team_id} does not play in match {match_id}")]
    TeamNotInMatch { match_id: MatchId, team_id: TeamId },

    /// Correction would rewrite a downstream match that already has a result
    #[error("Cannot correct match {match_id}: downstream match {downstream_id} is already completed")]
    DownstreamMatchAlreadyCompleted {
        match_id: MatchId,
        downstream_id: MatchId,
    },

    /// Completion attempted with playable matches left
    #[error("{remaining} match(es) still outstanding")]
    MatchesOutstanding { remaining: usize },

    /// Manual tie resolution does not describe a current tied group
    #[error("Invalid tie resolution: {0}")]
    InvalidTieResolution(String),

    /// Authorization collaborator denied the caller
    #[error("User {user_id} is not allowed to {action} tournament {tournament_id}")]
    Unauthorized {
        user_id: UserId,
        tournament_id: TournamentId,
        action: &'static str,
    },

    /// Another writer committed first; the operation may be retried
    #[error("Tournament {0} was modified concurrently")]
    ConcurrentModification(TournamentId),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a caller should do about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request was wrong; fix the input and resend
    FixInput,
    /// Transient race or outage; the same request may succeed later
    Retry,
    /// An administrator has to act before the request can succeed
    NeedsAdminAction,
    /// The caller lacks the required role
    Forbidden,
    /// Server-side failure
    Internal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixInput => "fix_input",
            Self::Retry => "retry",
            Self::NeedsAdminAction => "needs_admin_action",
            Self::Forbidden => "forbidden",
            Self::Internal => "internal",
        }
    }
}

/// Structured `{kind, reason}` error pair handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub class: ErrorClass,
    pub reason: String,
}

impl CompetitionError {
    /// Stable machine-readable name of the error variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TournamentNotFound(_) => "tournament_not_found",
            Self::TeamNotFound(_) => "team_not_found",
            Self::RegistrationNotFound(_) => "registration_not_found",
            Self::MatchNotFound(_) => "match_not_found",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::InsufficientTeams { .. } => "insufficient_teams",
            Self::InvalidFormatConfiguration(_) => "invalid_format_configuration",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::AlreadyRegistered(_) => "already_registered",
            Self::TeamFull { .. } => "team_full",
            Self::TeamCapacityReached(_) => "team_capacity_reached",
            Self::RosterLocked(_) => "roster_locked",
            Self::FormationModeMismatch { .. } => "formation_mode_mismatch",
            Self::InvalidRosterOperation(_) => "invalid_roster_operation",
            Self::MatchAlreadyTerminal(_) => "match_already_terminal",
            Self::MatchNotTerminal(_) => "match_not_terminal",
            Self::MatchNotReady(_) => "match_not_ready",
            Self::TieNotAllowed(_) => "tie_not_allowed",
            Self::ScoreOutOfRange { .. } => "score_out_of_range",
            Self::RecordOverflow(_) => "record_overflow",
            Self::TeamNotInMatch { .. } => "team_not_in_match",
            Self::DownstreamMatchAlreadyCompleted { .. } => "downstream_match_already_completed",
            Self::MatchesOutstanding { .. } => "matches_outstanding",
            Self::InvalidTieResolution(_) => "invalid_tie_resolution",
            Self::Unauthorized { .. } => "unauthorized",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Classify the error as fix-input, retry, or needs-admin-action
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ConcurrentModification(_) | Self::Database(_) => ErrorClass::Retry,
            Self::Unauthorized { .. } => ErrorClass::Forbidden,
            Self::Serialization(_) => ErrorClass::Internal,
            Self::InsufficientTeams { .. }
            | Self::RosterLocked(_)
            | Self::DownstreamMatchAlreadyCompleted { .. }
            | Self::MatchesOutstanding { .. }
            | Self::TeamCapacityReached(_) => ErrorClass::NeedsAdminAction,
            _ => ErrorClass::FixInput,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and serialization errors are sanitized to prevent information
    /// disclosure about the storage layer.
    pub fn client_message(&self) -> String {
        match self {
            CompetitionError::Database(_) => "Internal server error".to_string(),
            CompetitionError::Serialization(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Build the structured report returned to callers
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            class: self.class(),
            reason: self.client_message(),
        }
    }
}

/// Result type for competition operations
pub type CompetitionResult<T> = Result<T, CompetitionError>;
