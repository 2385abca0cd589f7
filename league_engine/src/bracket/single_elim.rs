//! Single-elimination knockout bracket.

use super::{
    GenerateMatches,
    layout::{BracketLayout, NodeId, Source},
    models::{BracketSide, Match},
    seeding::{next_power_of_two, seed_positions},
};
use crate::{errors::CompetitionResult, roster::TeamId, tournament::TournamentId};

/// Knockout bracket; N teams play N-1 matches
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleEliminationBracket;

/// Lay out a full winners' bracket for `size` slots
///
/// Returns the node ids of every round, first round first.
pub(crate) fn winners_bracket(layout: &mut BracketLayout, size: usize) -> Vec<Vec<NodeId>> {
    let positions = seed_positions(size);
    let mut rounds: Vec<Vec<NodeId>> = Vec::new();

    let first: Vec<NodeId> = positions
        .chunks(2)
        .map(|pair| {
            layout.add(
                BracketSide::Winners,
                1,
                Source::Seed(pair[0] - 1),
                Source::Seed(pair[1] - 1),
            )
        })
        .collect();
    rounds.push(first);

    let mut round = 1;
    while rounds.last().is_some_and(|r| r.len() > 1) {
        round += 1;
        let previous = rounds.last().cloned().unwrap_or_default();
        let next: Vec<NodeId> = previous
            .chunks(2)
            .map(|pair| {
                layout.add(
                    BracketSide::Winners,
                    round,
                    Source::Winner(pair[0]),
                    Source::Winner(pair[1]),
                )
            })
            .collect();
        rounds.push(next);
    }
    rounds
}

impl GenerateMatches for SingleEliminationBracket {
    fn generate(&self, tournament_id: TournamentId, seeds: &[TeamId]) -> CompetitionResult<Vec<Match>> {
        let mut layout = BracketLayout::new();
        winners_bracket(&mut layout, next_power_of_two(seeds.len()));
        Ok(layout.materialize(tournament_id, seeds))
    }
}
