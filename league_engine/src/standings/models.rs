//! Standings data models.

use serde::{Deserialize, Serialize};

use crate::{
    roster::{TeamId, TeamRecord},
    tournament::{TournamentFormat, TournamentId},
};

/// One team's line in the standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team_id: TeamId,
    pub team_name: String,
    pub seed: Option<u32>,
    /// `None` while the team is still alive in a bracket or part of a tied group
    pub placement: Option<u32>,
    pub record: TeamRecord,
    /// Placement came from an organizer's tie resolution
    pub manual: bool,
    /// Knocked out (elimination formats)
    pub eliminated: bool,
    /// Placement is within the round-robin playoff cutoff
    pub qualifies_for_playoffs: bool,
}

/// Teams that no configured criterion separates
///
/// Signals that organizer input is needed: the group occupies positions
/// `first_position..=last_position` and can only be ordered with
/// `ResolveTies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiedGroup {
    pub first_position: u32,
    pub last_position: u32,
    pub team_ids: Vec<TeamId>,
}

impl TiedGroup {
    pub fn len(&self) -> usize {
        self.team_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.team_ids.is_empty()
    }

    pub fn contains(&self, team_id: TeamId) -> bool {
        self.team_ids.contains(&team_id)
    }
}

/// Ranked standings plus any unresolved ties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub tournament_id: TournamentId,
    pub format: TournamentFormat,
    pub rows: Vec<StandingRow>,
    pub tied_groups: Vec<TiedGroup>,
}

impl Standings {
    /// No tied group is waiting for manual placement
    pub fn is_resolved(&self) -> bool {
        self.tied_groups.is_empty()
    }

    pub fn row(&self, team_id: TeamId) -> Option<&StandingRow> {
        self.rows.iter().find(|r| r.team_id == team_id)
    }

    pub fn placement_of(&self, team_id: TeamId) -> Option<u32> {
        self.row(team_id).and_then(|r| r.placement)
    }
}

/// Organizer-chosen placement for a team in a tied group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPlacement {
    pub team_id: TeamId,
    pub final_placement: u32,
}
