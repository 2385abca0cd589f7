//! Double-elimination bracket with a true grand final.
//!
//! The losers' bracket alternates two kinds of rounds: drop-in rounds, where
//! survivors meet the teams that just lost in the winners' bracket, and
//! consolidation rounds, where survivors play each other. Drop-in order is
//! reversed on alternating drop-in rounds so that teams do not immediately
//! meet an opponent from the same winners' bracket region again.
//!
//! Only the first grand final is generated up front. The reset match is
//! created by the progression engine if the losers' bracket champion wins it.

use super::{
    GenerateMatches,
    layout::{BracketLayout, NodeId, Source},
    models::{BracketSide, Match},
    seeding::next_power_of_two,
    single_elim::winners_bracket,
};
use crate::{errors::CompetitionResult, roster::TeamId, tournament::TournamentId};

/// Winners' bracket, losers' bracket and grand final
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleEliminationBracket;

fn losers_bracket(layout: &mut BracketLayout, winners: &[Vec<NodeId>]) -> Source {
    let Some(final_round) = winners.last() else {
        return Source::Empty;
    };
    if winners.len() == 1 {
        // Two-team field: the winners' final loser goes straight to the grand final
        return final_round.first().map_or(Source::Empty, |&n| Source::Loser(n));
    }

    let mut round = 1;
    let mut survivors: Vec<Source> = winners[0]
        .chunks(2)
        .map(|pair| {
            Source::Winner(layout.add(
                BracketSide::Losers,
                round,
                Source::Loser(pair[0]),
                Source::Loser(pair[1]),
            ))
        })
        .collect();

    for (stage, drops) in winners.iter().enumerate().skip(1) {
        round += 1;
        let reversed = stage % 2 == 1;
        survivors = survivors
            .iter()
            .enumerate()
            .map(|(i, &survivor)| {
                let dropped = if reversed {
                    drops[drops.len() - 1 - i]
                } else {
                    drops[i]
                };
                Source::Winner(layout.add(
                    BracketSide::Losers,
                    round,
                    survivor,
                    Source::Loser(dropped),
                ))
            })
            .collect();

        if survivors.len() > 1 {
            round += 1;
            survivors = survivors
                .chunks(2)
                .map(|pair| Source::Winner(layout.add(BracketSide::Losers, round, pair[0], pair[1])))
                .collect();
        }
    }

    survivors.first().copied().unwrap_or(Source::Empty)
}

impl GenerateMatches for DoubleEliminationBracket {
    fn generate(&self, tournament_id: TournamentId, seeds: &[TeamId]) -> CompetitionResult<Vec<Match>> {
        let mut layout = BracketLayout::new();
        let winners = winners_bracket(&mut layout, next_power_of_two(seeds.len()));
        let champion_of_losers = losers_bracket(&mut layout, &winners);
        if let Some(&winners_final) = winners.last().and_then(|r| r.first()) {
            layout.add(
                BracketSide::GrandFinal,
                1,
                Source::Winner(winners_final),
                champion_of_losers,
            );
        }
        Ok(layout.materialize(tournament_id, seeds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{MatchSet, Slot};
    use uuid::Uuid;

    fn generate(n: usize) -> (Vec<TeamId>, MatchSet) {
        let teams: Vec<TeamId> = (0..n).map(|_| Uuid::new_v4()).collect();
        let matches = DoubleEliminationBracket
            .generate(Uuid::new_v4(), &teams)
            .unwrap();
        (teams, MatchSet::new(matches))
    }

    #[test]
    fn test_match_count_is_two_n_minus_two() {
        for n in 2..=16 {
            let (_, set) = generate(n);
            assert_eq!(set.len(), 2 * n - 2, "n = {n}");
        }
    }

    #[test]
    fn test_eight_team_structure() {
        let (_, set) = generate(8);
        assert_eq!(set.rounds(BracketSide::Winners), 3);
        assert_eq!(set.rounds(BracketSide::Losers), 4);
        assert_eq!(set.rounds(BracketSide::GrandFinal), 1);

        // Every winners' bracket loser has somewhere to go
        for m in set.matches.iter().filter(|m| m.bracket == BracketSide::Winners) {
            assert!(m.loser_next.is_some(), "{}", m.label());
        }
        // Losers' bracket losses are final
        for m in set.matches.iter().filter(|m| m.bracket == BracketSide::Losers) {
            assert!(m.loser_next.is_none());
            assert!(m.next.is_some());
        }
    }

    #[test]
    fn test_grand_final_pairs_both_champions() {
        let (_, set) = generate(4);
        let grand_final = set
            .matches
            .iter()
            .find(|m| m.bracket == BracketSide::GrandFinal)
            .unwrap();
        let winners_final = set
            .matches
            .iter()
            .find(|m| m.bracket == BracketSide::Winners && m.round == 2)
            .unwrap();
        assert_eq!(winners_final.next.unwrap().match_id, grand_final.id);
        assert_eq!(winners_final.next.unwrap().slot, Slot::Home);
        assert!(grand_final.next.is_none());
        assert!(grand_final.loser_next.is_none());
    }

    #[test]
    fn test_two_teams_meet_again_in_grand_final() {
        let (teams, set) = generate(2);
        assert_eq!(set.len(), 2);
        let opener = &set.matches[0];
        assert_eq!(opener.home_team_id, Some(teams[0]));
        assert_eq!(opener.next.unwrap().slot, Slot::Home);
        assert_eq!(opener.loser_next.unwrap().slot, Slot::Away);
    }
}
