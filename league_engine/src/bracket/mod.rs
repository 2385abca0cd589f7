//! Bracket and schedule generation.
//!
//! Three structurally different generators share the [`GenerateMatches`]
//! interface and are selected through the [`Generator`] enum:
//! - **Single elimination**: the field is padded to a power of two and seeded
//!   in standard bracket order; byes never become matches, the bye team is
//!   placed straight into its second-round slot
//! - **Double elimination**: winners' and losers' brackets plus a true grand
//!   final, with an optional reset match created on demand
//! - **Round robin**: circle method, every pair meets `meetings` times
//!
//! Generation is deterministic: the same seeded teams always produce the same
//! matches with the same identifiers.
//!
//! ## Example
//!
//! ```
//! use league_engine::bracket::{Generator, GenerateMatches};
//! use league_engine::tournament::TournamentConfig;
//! use uuid::Uuid;
//!
//! let config = TournamentConfig::single_elimination("Cup".to_string(), 8);
//! let teams: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
//!
//! let matches = Generator::for_config(&config)
//!     .generate(Uuid::new_v4(), &teams)
//!     .unwrap();
//! assert_eq!(matches.len(), 4);
//! ```

pub mod double_elim;
pub mod layout;
pub mod models;
pub mod round_robin;
pub mod seeding;
pub mod single_elim;

use enum_dispatch::enum_dispatch;

pub use double_elim::DoubleEliminationBracket;
pub use models::{BracketSide, Match, MatchId, MatchSet, MatchStatus, Slot, SlotRef};
pub use round_robin::RoundRobinSchedule;
pub use single_elim::SingleEliminationBracket;

use crate::{
    errors::{CompetitionError, CompetitionResult},
    roster::TeamId,
    tournament::{TournamentConfig, TournamentFormat, TournamentId},
};

/// Build the match graph for teams given in seed order
#[enum_dispatch]
pub trait GenerateMatches {
    fn generate(&self, tournament_id: TournamentId, seeds: &[TeamId]) -> CompetitionResult<Vec<Match>>;
}

/// Generator selected by the tournament format
#[enum_dispatch(GenerateMatches)]
#[derive(Debug, Clone, Copy)]
pub enum Generator {
    SingleElimination(SingleEliminationBracket),
    DoubleElimination(DoubleEliminationBracket),
    RoundRobin(RoundRobinSchedule),
}

impl Generator {
    pub fn for_config(config: &TournamentConfig) -> Self {
        match config.format {
            TournamentFormat::SingleElimination => SingleEliminationBracket.into(),
            TournamentFormat::DoubleElimination => DoubleEliminationBracket.into(),
            TournamentFormat::RoundRobin => {
                RoundRobinSchedule::new(config.round_robin.meetings).into()
            }
        }
    }
}

/// Check a seeded field against the format before generating
pub fn validate_field(config: &TournamentConfig, team_count: usize) -> CompetitionResult<()> {
    if team_count < 2 {
        return Err(CompetitionError::InsufficientTeams {
            needed: 2,
            current: team_count,
        });
    }
    if team_count > config.max_teams as usize {
        return Err(CompetitionError::InvalidFormatConfiguration(format!(
            "{team_count} teams exceed max_teams {}",
            config.max_teams
        )));
    }
    config.validate_format()?;
    if let Some(cutoff) = config.round_robin.playoff_cutoff {
        if cutoff as usize > team_count {
            return Err(CompetitionError::InvalidFormatConfiguration(format!(
                "playoff cutoff {cutoff} exceeds the {team_count} participating teams"
            )));
        }
    }
    Ok(())
}

/// Validate and generate in one step, returning matches in stable order
pub fn generate(
    config: &TournamentConfig,
    tournament_id: TournamentId,
    seeds: &[TeamId],
) -> CompetitionResult<MatchSet> {
    validate_field(config, seeds.len())?;
    let matches = Generator::for_config(config).generate(tournament_id, seeds)?;
    Ok(MatchSet::new(matches))
}
