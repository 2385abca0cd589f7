//! Tournament lifecycle state machine.
//!
//! Every externally triggered operation passes through [`check_transition`]
//! before it touches the roster, the bracket or the match graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::models::TournamentStatus;
use crate::errors::{CompetitionError, CompetitionResult};

/// Requested lifecycle change, or an operation gated by the current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Draft -> Open
    Publish,
    /// Open -> Closed
    CloseRegistration,
    /// Closed -> InProgress
    Start,
    /// InProgress -> Completed
    Complete,
    /// Any non-terminal -> Cancelled
    Cancel,
    /// Any non-terminal -> Postponed
    Postpone,
    /// Postponed -> status it was postponed from
    Resume,
    /// Bracket generation (no status change on its own)
    GenerateBracket,
    /// Match state changes (no status change)
    RecordResult,
    /// New registrations (no status change)
    Register,
    /// Manual ordering of tied teams (no status change)
    ResolveTies,
}

impl Transition {
    /// Whether the transition may fire from `status`
    pub fn allowed_from(&self, status: TournamentStatus) -> bool {
        use TournamentStatus::*;
        match self {
            Self::Publish => status == Draft,
            Self::CloseRegistration => status == Open,
            Self::Start => status == Closed,
            Self::Complete => status == InProgress,
            Self::Cancel => !status.is_terminal(),
            Self::Postpone => !status.is_terminal() && status != Postponed,
            Self::Resume => status == Postponed,
            Self::GenerateBracket => matches!(status, Closed | InProgress),
            Self::RecordResult => status == InProgress,
            Self::Register => status == Open,
            Self::ResolveTies => matches!(status, InProgress | Completed),
        }
    }

    /// Status reached after the transition, `None` for gating-only entries
    /// and for [`Transition::Resume`], whose target depends on history.
    pub fn target(&self) -> Option<TournamentStatus> {
        match self {
            Self::Publish => Some(TournamentStatus::Open),
            Self::CloseRegistration => Some(TournamentStatus::Closed),
            Self::Start => Some(TournamentStatus::InProgress),
            Self::Complete => Some(TournamentStatus::Completed),
            Self::Cancel => Some(TournamentStatus::Cancelled),
            Self::Postpone => Some(TournamentStatus::Postponed),
            Self::Resume
            | Self::GenerateBracket
            | Self::RecordResult
            | Self::Register
            | Self::ResolveTies => None,
        }
    }

    /// Audit action name
    pub fn action(&self) -> &'static str {
        match self {
            Self::Publish => "tournament.publish",
            Self::CloseRegistration => "tournament.close_registration",
            Self::Start => "tournament.start",
            Self::Complete => "tournament.complete",
            Self::Cancel => "tournament.cancel",
            Self::Postpone => "tournament.postpone",
            Self::Resume => "tournament.resume",
            Self::GenerateBracket => "bracket.generate",
            Self::RecordResult => "match.record",
            Self::Register => "registration.create",
            Self::ResolveTies => "standings.resolve_ties",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Publish => "publish",
            Self::CloseRegistration => "close registration for",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Postpone => "postpone",
            Self::Resume => "resume",
            Self::GenerateBracket => "generate a bracket for",
            Self::RecordResult => "record results in",
            Self::Register => "register for",
            Self::ResolveTies => "resolve ties in",
        };
        write!(f, "{verb}")
    }
}

/// Fail with `InvalidStateTransition` unless `transition` is legal from `current`
pub fn check_transition(current: TournamentStatus, transition: Transition) -> CompetitionResult<()> {
    if transition.allowed_from(current) {
        Ok(())
    } else {
        Err(CompetitionError::InvalidStateTransition {
            attempted: transition,
            current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TournamentStatus::*;

    const ALL: [TournamentStatus; 7] = [Draft, Open, Closed, InProgress, Completed, Cancelled, Postponed];

    #[test]
    fn test_forward_path_is_linear() {
        assert!(check_transition(Draft, Transition::Publish).is_ok());
        assert!(check_transition(Open, Transition::CloseRegistration).is_ok());
        assert!(check_transition(Closed, Transition::Start).is_ok());
        assert!(check_transition(InProgress, Transition::Complete).is_ok());

        assert!(check_transition(Draft, Transition::Start).is_err());
        assert!(check_transition(Open, Transition::Complete).is_err());
        assert!(check_transition(Closed, Transition::Publish).is_err());
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for transition in [
            Transition::Publish,
            Transition::CloseRegistration,
            Transition::Start,
            Transition::Complete,
            Transition::Cancel,
            Transition::Postpone,
            Transition::Resume,
            Transition::RecordResult,
            Transition::Register,
        ] {
            assert!(check_transition(Completed, transition).is_err());
            assert!(check_transition(Cancelled, transition).is_err());
        }
    }

    #[test]
    fn test_cancel_and_postpone_from_every_active_state() {
        for status in ALL.into_iter().filter(|s| !s.is_terminal() && *s != Postponed) {
            assert!(Transition::Cancel.allowed_from(status), "{status}");
            assert!(Transition::Postpone.allowed_from(status), "{status}");
        }
        assert!(Transition::Cancel.allowed_from(Postponed));
        assert!(!Transition::Postpone.allowed_from(Postponed));
        assert!(Transition::Resume.allowed_from(Postponed));
        assert!(!Transition::Resume.allowed_from(Open));
    }

    #[test]
    fn test_forward_targets_only_increase() {
        for transition in [
            Transition::Publish,
            Transition::CloseRegistration,
            Transition::Start,
            Transition::Complete,
        ] {
            let target = transition.target().and_then(|s| s.ordinal());
            for status in ALL {
                if transition.allowed_from(status) {
                    assert!(target > status.ordinal());
                }
            }
        }
    }

    #[test]
    fn test_ties_resolvable_after_completion() {
        assert!(Transition::ResolveTies.allowed_from(InProgress));
        assert!(Transition::ResolveTies.allowed_from(Completed));
        assert!(!Transition::ResolveTies.allowed_from(Cancelled));
        assert!(!Transition::ResolveTies.allowed_from(Open));
    }

    #[test]
    fn test_error_names_attempted_and_current() {
        let err = check_transition(Draft, Transition::Complete).unwrap_err();
        assert!(matches!(
            err,
            CompetitionError::InvalidStateTransition {
                attempted: Transition::Complete,
                current: Draft
            }
        ));
    }
}
