//! Round-robin schedule using the circle method.

use super::{
    GenerateMatches,
    models::{BracketSide, Match},
};
use crate::{
    errors::{CompetitionError, CompetitionResult},
    roster::TeamId,
    tournament::TournamentId,
};

/// Every pair meets `meetings` times
#[derive(Debug, Clone, Copy)]
pub struct RoundRobinSchedule {
    pub meetings: u32,
}

impl Default for RoundRobinSchedule {
    fn default() -> Self {
        Self { meetings: 1 }
    }
}

impl RoundRobinSchedule {
    pub fn new(meetings: u32) -> Self {
        Self { meetings }
    }

    /// Pairings for one cycle, as (home, away) per round
    ///
    /// Slot 0 stays fixed while the others rotate. With an odd field slot 0
    /// holds the phantom opponent, so the team drawn against it sits out.
    fn cycle(teams: &[TeamId]) -> Vec<Vec<(TeamId, TeamId)>> {
        if teams.len() < 2 {
            return Vec::new();
        }
        let mut slots: Vec<Option<TeamId>> = Vec::with_capacity(teams.len() + 1);
        if teams.len() % 2 == 1 {
            slots.push(None);
        }
        slots.extend(teams.iter().copied().map(Some));

        let n = slots.len();
        let (fixed, rest) = slots.split_at(1);
        let mut rotating: Vec<Option<TeamId>> = rest.to_vec();

        let mut rounds = Vec::with_capacity(n - 1);
        for round in 0..n - 1 {
            let mut arrangement = Vec::with_capacity(n);
            arrangement.push(fixed[0]);
            arrangement.extend(rotating.iter().copied());

            let mut pairs = Vec::with_capacity(n / 2);
            for i in 0..n / 2 {
                let (a, b) = (arrangement[i], arrangement[n - 1 - i]);
                // Alternate the fixed slot's side so it is not always at home
                let (home, away) = if i == 0 && round % 2 == 1 { (b, a) } else { (a, b) };
                if let (Some(home), Some(away)) = (home, away) {
                    pairs.push((home, away));
                }
            }
            rounds.push(pairs);
            rotating.rotate_right(1);
        }
        rounds
    }
}

impl GenerateMatches for RoundRobinSchedule {
    fn generate(&self, tournament_id: TournamentId, seeds: &[TeamId]) -> CompetitionResult<Vec<Match>> {
        if self.meetings == 0 {
            return Err(CompetitionError::InvalidFormatConfiguration(
                "round robin needs at least one meeting".to_string(),
            ));
        }

        let cycle = Self::cycle(seeds);
        let per_cycle = cycle.len() as u32;
        let mut matches = Vec::new();
        for meeting in 0..self.meetings {
            let swap = meeting % 2 == 1;
            for (offset, pairs) in cycle.iter().enumerate() {
                let round = meeting * per_cycle + offset as u32 + 1;
                for (number, &(home, away)) in pairs.iter().enumerate() {
                    let mut m = Match::new(tournament_id, BracketSide::RoundRobin, round, number as u32 + 1);
                    let (home, away) = if swap { (away, home) } else { (home, away) };
                    m.home_team_id = Some(home);
                    m.away_team_id = Some(away);
                    matches.push(m);
                }
            }
        }
        Ok(matches)
    }
}
