//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{CompetitionError, CompetitionResult};

/// Tournament ID type
pub type TournamentId = Uuid;

/// User ID type (owned by the identity service)
pub type UserId = i64;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Being configured, invisible to participants
    Draft,
    /// Accepting registrations
    Open,
    /// Registration closed, rosters being finalized
    Closed,
    /// Matches being played
    InProgress,
    /// Final placements written
    Completed,
    /// Abandoned
    Cancelled,
    /// Temporarily halted with a new date
    Postponed,
}

impl TournamentStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Postponed => "postponed",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "postponed" => Some(Self::Postponed),
            _ => None,
        }
    }

    /// Completed and Cancelled accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Position in the forward lifecycle, `None` for the side states
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            Self::Draft => Some(0),
            Self::Open => Some(1),
            Self::Closed => Some(2),
            Self::InProgress => Some(3),
            Self::Completed => Some(4),
            Self::Cancelled | Self::Postponed => None,
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::InProgress => "in progress",
            other => other.as_str(),
        };
        write!(f, "{repr}")
    }
}

/// Competition format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

impl TournamentFormat {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleElimination => "single_elimination",
            Self::DoubleElimination => "double_elimination",
            Self::RoundRobin => "round_robin",
        }
    }

    /// Elimination formats build a bracket with forward pointers
    pub fn is_elimination(&self) -> bool {
        !matches!(self, Self::RoundRobin)
    }

    /// Drawn results are legal only where teams collect points
    pub fn allows_ties(&self) -> bool {
        matches!(self, Self::RoundRobin)
    }
}

/// How teams are formed from registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationMode {
    /// Organizers distribute registrations into teams
    OrganizerAssigned,
    /// Captains build their own teams
    PreFormed,
}

/// Points awarded per result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub win_points: i32,
    pub tie_points: i32,
    pub loss_points: i32,
}

impl Default for ScoringRule {
    fn default() -> Self {
        Self {
            win_points: 3,
            tie_points: 1,
            loss_points: 0,
        }
    }
}

/// Tie-break criteria, applied in configured order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    /// Points earned only in matches among the tied teams
    HeadToHead,
    /// Goals for minus goals against
    GoalDifference,
    /// Goals scored
    GoalsFor,
    /// Fewest goals conceded
    GoalsAgainst,
    /// Match wins
    Wins,
}

impl TieBreaker {
    /// Default order used when a tournament does not configure one
    pub fn default_order() -> Vec<TieBreaker> {
        vec![
            TieBreaker::HeadToHead,
            TieBreaker::GoalDifference,
            TieBreaker::GoalsFor,
        ]
    }
}

/// Round-robin specific options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRobinOptions {
    /// How many times each pair meets
    pub meetings: u32,
    /// Number of top teams that advance to playoffs
    pub playoff_cutoff: Option<u32>,
}

impl Default for RoundRobinOptions {
    fn default() -> Self {
        Self {
            meetings: 1,
            playoff_cutoff: None,
        }
    }
}

/// Entry fee declaration (collection happens elsewhere)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryFee {
    /// Amount in minor currency units
    pub amount_cents: i64,
    /// ISO currency code, required when `amount_cents > 0`
    pub currency: Option<String>,
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Competition format
    pub format: TournamentFormat,
    /// Team formation mode
    pub formation_mode: FormationMode,
    /// Maximum number of registered teams
    pub max_teams: u32,
    /// Maximum confirmed registrations, beyond which entries are waitlisted
    pub max_participants: Option<u32>,
    /// Players a team needs to be eligible
    pub min_players_per_team: u32,
    /// Largest allowed roster
    pub max_players_per_team: u32,
    /// Roster edits allowed once play has started
    pub allow_substitutions: bool,
    /// Points per result
    pub scoring: ScoringRule,
    /// Round-robin options
    pub round_robin: RoundRobinOptions,
    /// Ordered tie-break criteria
    pub tie_breakers: Vec<TieBreaker>,
    /// Offer a second grand final when the losers' bracket champion wins the first
    pub grand_final_reset: bool,
    /// Registration closes automatically once this passes
    pub registration_deadline: Option<DateTime<Utc>>,
    /// First match day
    pub start_date: Option<DateTime<Utc>>,
    /// Last match day
    pub end_date: Option<DateTime<Utc>>,
    /// Entry fee declaration
    pub entry_fee: EntryFee,
    /// Venue, recorded as an attribute only
    pub venue: Option<String>,
}

impl TournamentConfig {
    /// Create a configuration with defaults for the given format
    pub fn new(name: String, format: TournamentFormat, max_teams: u32) -> Self {
        Self {
            name,
            format,
            formation_mode: FormationMode::OrganizerAssigned,
            max_teams,
            max_participants: None,
            min_players_per_team: 1,
            max_players_per_team: 1,
            allow_substitutions: false,
            scoring: ScoringRule::default(),
            round_robin: RoundRobinOptions::default(),
            tie_breakers: TieBreaker::default_order(),
            grand_final_reset: true,
            registration_deadline: None,
            start_date: None,
            end_date: None,
            entry_fee: EntryFee::default(),
            venue: None,
        }
    }

    /// Single-elimination knockout
    pub fn single_elimination(name: String, max_teams: u32) -> Self {
        Self::new(name, TournamentFormat::SingleElimination, max_teams)
    }

    /// Double-elimination with a true grand final
    pub fn double_elimination(name: String, max_teams: u32) -> Self {
        Self::new(name, TournamentFormat::DoubleElimination, max_teams)
    }

    /// League where every pair meets `meetings` times
    pub fn round_robin(name: String, max_teams: u32, meetings: u32) -> Self {
        let mut config = Self::new(name, TournamentFormat::RoundRobin, max_teams);
        config.round_robin.meetings = meetings;
        config
    }

    /// Set team size limits
    pub fn with_team_size(mut self, min_players: u32, max_players: u32) -> Self {
        self.min_players_per_team = min_players;
        self.max_players_per_team = max_players;
        self
    }

    /// Set the formation mode
    pub fn with_formation(mut self, mode: FormationMode) -> Self {
        self.formation_mode = mode;
        self
    }

    /// Structural validation, run on create and before every config update
    pub fn validate(&self) -> CompetitionResult<()> {
        if self.name.trim().is_empty() {
            return Err(CompetitionError::InvalidConfiguration(
                "name must not be empty".to_string(),
            ));
        }
        if self.max_teams < 2 {
            return Err(CompetitionError::InvalidConfiguration(
                "max_teams must be at least 2".to_string(),
            ));
        }
        if self.min_players_per_team == 0 {
            return Err(CompetitionError::InvalidConfiguration(
                "min_players_per_team must be at least 1".to_string(),
            ));
        }
        if self.max_players_per_team < self.min_players_per_team {
            return Err(CompetitionError::InvalidConfiguration(format!(
                "max_players_per_team ({}) is below min_players_per_team ({})",
                self.max_players_per_team, self.min_players_per_team
            )));
        }
        if self.max_participants == Some(0) {
            return Err(CompetitionError::InvalidConfiguration(
                "max_participants must be positive".to_string(),
            ));
        }
        let mut seen = Vec::with_capacity(self.tie_breakers.len());
        for criterion in &self.tie_breakers {
            if seen.contains(criterion) {
                return Err(CompetitionError::InvalidConfiguration(format!(
                    "tie breaker {criterion:?} listed twice"
                )));
            }
            seen.push(*criterion);
        }
        self.validate_format()
    }

    /// Format constraints that do not depend on the final team count
    pub fn validate_format(&self) -> CompetitionResult<()> {
        if self.format == TournamentFormat::RoundRobin {
            if !(1..=4).contains(&self.round_robin.meetings) {
                return Err(CompetitionError::InvalidFormatConfiguration(format!(
                    "round robin meetings must be between 1 and 4, got {}",
                    self.round_robin.meetings
                )));
            }
            if let Some(cutoff) = self.round_robin.playoff_cutoff {
                if cutoff < 2 {
                    return Err(CompetitionError::InvalidFormatConfiguration(
                        "playoff cutoff must be at least 2".to_string(),
                    ));
                }
                if cutoff > self.max_teams {
                    return Err(CompetitionError::InvalidFormatConfiguration(format!(
                        "playoff cutoff {cutoff} exceeds max_teams {}",
                        self.max_teams
                    )));
                }
            }
        } else if self.round_robin.playoff_cutoff.is_some() {
            return Err(CompetitionError::InvalidFormatConfiguration(
                "playoff cutoff only applies to round robin".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks required before the tournament becomes visible
    pub fn validate_for_publish(&self) -> CompetitionResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start >= end {
                return Err(CompetitionError::InvalidConfiguration(format!(
                    "start date {start} must be before end date {end}"
                )));
            }
        }
        if let (Some(deadline), Some(start)) = (self.registration_deadline, self.start_date) {
            if deadline > start {
                return Err(CompetitionError::InvalidConfiguration(format!(
                    "registration deadline {deadline} is after start date {start}"
                )));
            }
        }
        if self.entry_fee.amount_cents < 0 {
            return Err(CompetitionError::InvalidConfiguration(
                "entry fee cannot be negative".to_string(),
            ));
        }
        if self.entry_fee.amount_cents > 0
            && self
                .entry_fee
                .currency
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            return Err(CompetitionError::InvalidConfiguration(
                "entry fee requires a currency".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tournament root aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Creator, implicitly the owner
    pub owner_id: UserId,
    /// Tournament configuration
    pub config: TournamentConfig,
    /// Current lifecycle status
    pub status: TournamentStatus,
    /// Status to return to when a postponement is lifted
    pub postponed_from: Option<TournamentStatus>,
    /// Optimistic concurrency version, bumped on every commit
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub registration_closed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub postponed_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create a new draft tournament
    pub fn new(owner_id: UserId, config: TournamentConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            config,
            status: TournamentStatus::Draft,
            postponed_from: None,
            version: 0,
            created_at: now,
            published_at: None,
            registration_closed_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            postponed_at: None,
        }
    }

    /// Registration deadline has passed
    pub fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.config
            .registration_deadline
            .is_some_and(|deadline| deadline <= now)
    }
}
