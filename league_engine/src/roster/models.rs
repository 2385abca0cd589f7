//! Team and registration data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tournament::{ScoringRule, TournamentId, UserId};

/// Team ID type
pub type TeamId = Uuid;

/// Registration ID type
pub type RegistrationId = Uuid;

/// Team status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    /// Holds a slot in the competition
    Registered,
    /// Waiting for a team slot
    Waitlisted,
    /// Left the competition
    Withdrawn,
}

impl TeamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Waitlisted => "waitlisted",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(Self::Registered),
            "waitlisted" => Some(Self::Waitlisted),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }
}

/// Registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Holds a participant slot
    Confirmed,
    /// Waiting for a participant slot
    Waitlisted,
    /// Cancelled by the participant or an organizer
    Withdrawn,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Waitlisted => "waitlisted",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(Self::Confirmed),
            "waitlisted" => Some(Self::Waitlisted),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }
}

/// Payment state owned by the payments service; carried, never interpreted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentState(pub String);

/// Win/loss/tie and goal counters
///
/// Mutated only by the match progression engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points: i32,
    pub goals_for: u32,
    pub goals_against: u32,
}

/// Outcome of one match from a single team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win,
    Loss,
    Tie,
}

impl TeamRecord {
    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    /// The record with one more result, or `None` if a counter would overflow
    pub fn checked_apply(
        &self,
        outcome: MatchOutcome,
        scored: u32,
        conceded: u32,
        scoring: &ScoringRule,
    ) -> Option<Self> {
        let mut next = *self;
        match outcome {
            MatchOutcome::Win => {
                next.wins = next.wins.checked_add(1)?;
                next.points = next.points.checked_add(scoring.win_points)?;
            }
            MatchOutcome::Loss => {
                next.losses = next.losses.checked_add(1)?;
                next.points = next.points.checked_add(scoring.loss_points)?;
            }
            MatchOutcome::Tie => {
                next.ties = next.ties.checked_add(1)?;
                next.points = next.points.checked_add(scoring.tie_points)?;
            }
        }
        next.goals_for = next.goals_for.checked_add(scored)?;
        next.goals_against = next.goals_against.checked_add(conceded)?;
        Some(next)
    }

    /// Remove a result previously added with [`TeamRecord::apply`]
    pub fn revert(&mut self, outcome: MatchOutcome, scored: u32, conceded: u32, scoring: &ScoringRule) {
        match outcome {
            MatchOutcome::Win => {
                self.wins = self.wins.saturating_sub(1);
                self.points -= scoring.win_points;
            }
            MatchOutcome::Loss => {
                self.losses = self.losses.saturating_sub(1);
                self.points -= scoring.loss_points;
            }
            MatchOutcome::Tie => {
                self.ties = self.ties.saturating_sub(1);
                self.points -= scoring.tie_points;
            }
        }
        self.goals_for = self.goals_for.saturating_sub(scored);
        self.goals_against = self.goals_against.saturating_sub(conceded);
    }
}

/// Team in one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub captain_user_id: Option<UserId>,
    /// Creation order within the tournament
    pub sequence: u32,
    /// Bracket seed, assigned at generation time
    pub seed: Option<u32>,
    pub record: TeamRecord,
    pub status: TeamStatus,
    /// Dense 1-based position while waitlisted
    pub waitlist_position: Option<u32>,
    pub final_placement: Option<u32>,
    /// Placement came from an organizer's tie resolution
    pub placement_manual: bool,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(
        tournament_id: TournamentId,
        name: String,
        captain_user_id: Option<UserId>,
        sequence: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            name,
            captain_user_id,
            sequence,
            seed: None,
            record: TeamRecord::default(),
            status: TeamStatus::Registered,
            waitlist_position: None,
            final_placement: None,
            placement_manual: false,
            created_at: now,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.status == TeamStatus::Registered
    }
}

/// One user's entry into a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub team_id: Option<TeamId>,
    pub status: RegistrationStatus,
    /// Higher is stronger; used for balanced auto-assignment
    pub skill_tier: Option<u8>,
    /// Registration order within the tournament
    pub sequence: u32,
    /// Dense 1-based position while waitlisted
    pub waitlist_position: Option<u32>,
    pub payment_state: PaymentState,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(
        tournament_id: TournamentId,
        user_id: UserId,
        skill_tier: Option<u8>,
        sequence: u32,
        payment_state: PaymentState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            user_id,
            team_id: None,
            status: RegistrationStatus::Confirmed,
            skill_tier,
            sequence,
            waitlist_position: None,
            payment_state,
            registered_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Withdrawn
    }
}
