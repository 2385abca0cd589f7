//! Fire-and-forget competition notifications.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    bracket::MatchId,
    roster::{RegistrationId, TeamId},
    tournament::{TournamentId, TournamentStatus},
};

/// Something participants may want to hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompetitionEvent {
    StatusChanged {
        tournament_id: TournamentId,
        from: TournamentStatus,
        to: TournamentStatus,
    },
    BracketGenerated {
        tournament_id: TournamentId,
        matches: usize,
    },
    MatchStarted {
        tournament_id: TournamentId,
        match_id: MatchId,
    },
    ResultRecorded {
        tournament_id: TournamentId,
        match_id: MatchId,
        winner: Option<TeamId>,
        corrected: bool,
    },
    RegistrationPromoted {
        tournament_id: TournamentId,
        registration_id: RegistrationId,
    },
    TeamPromoted {
        tournament_id: TournamentId,
        team_id: TeamId,
    },
    /// Standings contain groups only an organizer can order
    TiesNeedResolution {
        tournament_id: TournamentId,
        groups: usize,
    },
}

/// Notification dispatch
///
/// Called after a commit and never awaited; delivery failures stay inside
/// the implementation.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: CompetitionEvent);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: CompetitionEvent) {}
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<CompetitionEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CompetitionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: CompetitionEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("Notification receiver dropped, event discarded");
        }
    }
}
