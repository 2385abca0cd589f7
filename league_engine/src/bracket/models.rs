//! Match graph data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{roster::TeamId, tournament::TournamentId};

/// Match ID type
pub type MatchId = Uuid;

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Forfeit,
}

impl MatchStatus {
    /// Completed and Forfeit are immutable outside the correction path
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Forfeit)
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Forfeit => "forfeit",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "forfeit" => Some(Self::Forfeit),
            _ => None,
        }
    }
}

/// Which part of the competition a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketSide {
    Winners,
    Losers,
    GrandFinal,
    RoundRobin,
}

impl BracketSide {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winners => "winners",
            Self::Losers => "losers",
            Self::GrandFinal => "grand_final",
            Self::RoundRobin => "round_robin",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "winners" => Some(Self::Winners),
            "losers" => Some(Self::Losers),
            "grand_final" => Some(Self::GrandFinal),
            "round_robin" => Some(Self::RoundRobin),
            _ => None,
        }
    }

    /// Short label used in match names ("W2-1", "L3-2", "GF1-1")
    fn label(&self) -> &'static str {
        match self {
            Self::Winners => "W",
            Self::Losers => "L",
            Self::GrandFinal => "GF",
            Self::RoundRobin => "R",
        }
    }
}

/// Home or away position within a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Home,
    Away,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "home" => Some(Self::Home),
            "away" => Some(Self::Away),
            _ => None,
        }
    }
}

/// Forward pointer to a downstream slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    pub match_id: MatchId,
    pub slot: Slot,
}

/// A scheduled or played match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub bracket: BracketSide,
    /// Round within the bracket side (1-indexed)
    pub round: u32,
    /// Position within the round (1-indexed)
    pub match_number: u32,
    pub home_team_id: Option<TeamId>,
    pub away_team_id: Option<TeamId>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub winner_team_id: Option<TeamId>,
    pub loser_team_id: Option<TeamId>,
    pub status: MatchStatus,
    /// Where the winner goes
    pub next: Option<SlotRef>,
    /// Where the loser goes (double elimination)
    pub loser_next: Option<SlotRef>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create an empty scheduled match with a name-based identifier
    ///
    /// The identifier is derived from the tournament and the match position so
    /// that generating the same bracket twice yields the same ids.
    pub fn new(
        tournament_id: TournamentId,
        bracket: BracketSide,
        round: u32,
        match_number: u32,
    ) -> Self {
        Self {
            id: Self::derive_id(tournament_id, bracket, round, match_number),
            tournament_id,
            bracket,
            round,
            match_number,
            home_team_id: None,
            away_team_id: None,
            home_score: None,
            away_score: None,
            winner_team_id: None,
            loser_team_id: None,
            status: MatchStatus::Scheduled,
            next: None,
            loser_next: None,
            completed_at: None,
        }
    }

    /// Deterministic identifier for a bracket position
    pub fn derive_id(
        tournament_id: TournamentId,
        bracket: BracketSide,
        round: u32,
        match_number: u32,
    ) -> MatchId {
        let name = format!("{}{}-{}", bracket.label(), round, match_number);
        Uuid::new_v5(&tournament_id, name.as_bytes())
    }

    /// Human-readable position, e.g. "W2-1"
    pub fn label(&self) -> String {
        format!("{}{}-{}", self.bracket.label(), self.round, self.match_number)
    }

    /// Team in the given slot
    pub fn team_in(&self, slot: Slot) -> Option<TeamId> {
        match slot {
            Slot::Home => self.home_team_id,
            Slot::Away => self.away_team_id,
        }
    }

    /// Assign (or clear) the team in a slot
    pub fn set_team(&mut self, slot: Slot, team_id: Option<TeamId>) {
        match slot {
            Slot::Home => self.home_team_id = team_id,
            Slot::Away => self.away_team_id = team_id,
        }
    }

    /// Slot occupied by `team_id`, if any
    pub fn slot_of(&self, team_id: TeamId) -> Option<Slot> {
        if self.home_team_id == Some(team_id) {
            Some(Slot::Home)
        } else if self.away_team_id == Some(team_id) {
            Some(Slot::Away)
        } else {
            None
        }
    }

    /// Both participants known
    pub fn is_ready(&self) -> bool {
        self.home_team_id.is_some() && self.away_team_id.is_some()
    }

    /// Whether `team_id` plays in this match
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.slot_of(team_id).is_some()
    }

    /// Ordering key: bracket side, round, match number
    pub fn order_key(&self) -> (BracketSide, u32, u32) {
        (self.bracket, self.round, self.match_number)
    }
}

/// Ordered set of matches produced by a generator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    pub matches: Vec<Match>,
}

impl MatchSet {
    pub fn new(mut matches: Vec<Match>) -> Self {
        matches.sort_by_key(Match::order_key);
        Self { matches }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of distinct rounds on the given side
    pub fn rounds(&self, bracket: BracketSide) -> u32 {
        self.matches
            .iter()
            .filter(|m| m.bracket == bracket)
            .map(|m| m.round)
            .max()
            .unwrap_or(0)
    }

    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_ids_are_stable_per_position() {
        let tournament_id = Uuid::new_v4();
        let a = Match::new(tournament_id, BracketSide::Winners, 1, 2);
        let b = Match::new(tournament_id, BracketSide::Winners, 1, 2);
        let c = Match::new(tournament_id, BracketSide::Losers, 1, 2);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.label(), "W1-2");
    }

    #[test]
    fn test_slot_helpers() {
        let mut m = Match::new(Uuid::new_v4(), BracketSide::Winners, 1, 1);
        let home = Uuid::new_v4();
        assert!(!m.is_ready());
        m.set_team(Slot::Home, Some(home));
        assert_eq!(m.slot_of(home), Some(Slot::Home));
        assert_eq!(m.team_in(Slot::Away), None);
        m.set_team(Slot::Away, Some(Uuid::new_v4()));
        assert!(m.is_ready());
    }
}
