//! Logical bracket layout and bye collapsing.
//!
//! Elimination generators describe a full power-of-two bracket as a list of
//! logical nodes whose sides come from a seed, the winner of an earlier node,
//! or the loser of an earlier node. [`BracketLayout::materialize`] then drops
//! every node that would be a bye: a node with one empty side passes its
//! occupant straight through to wherever its winner was going, and a node
//! with two empty sides vanishes. Only real matches are emitted, with rounds
//! renumbered densely per bracket side and forward pointers wired to the
//! surviving downstream slots.

use std::collections::BTreeMap;

use super::models::{BracketSide, Match, Slot, SlotRef};
use crate::{roster::TeamId, tournament::TournamentId};

/// Index of a node within its layout
pub type NodeId = usize;

/// Where one side of a node gets its team from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Zero-based seed index
    Seed(usize),
    Winner(NodeId),
    Loser(NodeId),
    /// Nobody (padding)
    Empty,
}

#[derive(Debug, Clone)]
struct Node {
    side: BracketSide,
    round: u32,
    home: Source,
    away: Source,
}

#[derive(Debug, Clone, Copy)]
enum Resolved {
    /// Emitted as a match
    Real,
    /// Bye: the single occupant moves on unchanged
    Through(Source),
    Void,
}

/// Logical bracket under construction
#[derive(Debug, Clone, Default)]
pub struct BracketLayout {
    nodes: Vec<Node>,
}

impl BracketLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; sources may only reference nodes added earlier
    pub fn add(&mut self, side: BracketSide, round: u32, home: Source, away: Source) -> NodeId {
        debug_assert!(Self::refers_back(home, self.nodes.len()));
        debug_assert!(Self::refers_back(away, self.nodes.len()));
        self.nodes.push(Node {
            side,
            round,
            home,
            away,
        });
        self.nodes.len() - 1
    }

    fn refers_back(source: Source, next: NodeId) -> bool {
        match source {
            Source::Winner(n) | Source::Loser(n) => n < next,
            Source::Seed(_) | Source::Empty => true,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Emit the real matches for `seeds` (team ids in seed order)
    pub fn materialize(&self, tournament_id: TournamentId, seeds: &[TeamId]) -> Vec<Match> {
        let mut resolved: Vec<Resolved> = Vec::with_capacity(self.nodes.len());
        let mut staged: Vec<(NodeId, Source, Source)> = Vec::new();

        for (id, node) in self.nodes.iter().enumerate() {
            let home = Self::effective(node.home, &resolved, seeds.len());
            let away = Self::effective(node.away, &resolved, seeds.len());
            let outcome = match (home, away) {
                (Source::Empty, Source::Empty) => Resolved::Void,
                (source, Source::Empty) | (Source::Empty, source) => Resolved::Through(source),
                _ => {
                    staged.push((id, home, away));
                    Resolved::Real
                }
            };
            resolved.push(outcome);
        }

        // Dense round numbers per side
        let mut rounds: BTreeMap<BracketSide, Vec<u32>> = BTreeMap::new();
        for (id, _, _) in &staged {
            let node = &self.nodes[*id];
            let list = rounds.entry(node.side).or_default();
            if !list.contains(&node.round) {
                list.push(node.round);
            }
        }
        for list in rounds.values_mut() {
            list.sort_unstable();
        }

        let mut counters: BTreeMap<(BracketSide, u32), u32> = BTreeMap::new();
        let mut node_match: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut matches: Vec<Match> = Vec::with_capacity(staged.len());
        for (id, _, _) in &staged {
            let node = &self.nodes[*id];
            let round = rounds
                .get(&node.side)
                .and_then(|list| list.iter().position(|r| *r == node.round))
                .map_or(node.round, |p| p as u32 + 1);
            let number = counters.entry((node.side, round)).or_insert(0);
            *number += 1;
            node_match.insert(*id, matches.len());
            matches.push(Match::new(tournament_id, node.side, round, *number));
        }

        for (index, (_, home, away)) in staged.iter().enumerate() {
            let target = matches[index].id;
            for (source, slot) in [(*home, Slot::Home), (*away, Slot::Away)] {
                let pointer = SlotRef {
                    match_id: target,
                    slot,
                };
                match source {
                    Source::Seed(seed) => matches[index].set_team(slot, seeds.get(seed).copied()),
                    Source::Winner(node) => {
                        if let Some(&upstream) = node_match.get(&node) {
                            matches[upstream].next = Some(pointer);
                        }
                    }
                    Source::Loser(node) => {
                        if let Some(&upstream) = node_match.get(&node) {
                            matches[upstream].loser_next = Some(pointer);
                        }
                    }
                    Source::Empty => {}
                }
            }
        }

        matches
    }

    fn effective(source: Source, resolved: &[Resolved], seed_count: usize) -> Source {
        match source {
            Source::Seed(seed) if seed < seed_count => source,
            Source::Seed(_) | Source::Empty => Source::Empty,
            Source::Winner(node) => match resolved[node] {
                Resolved::Real => source,
                Resolved::Through(inner) => inner,
                Resolved::Void => Source::Empty,
            },
            Source::Loser(node) => match resolved[node] {
                Resolved::Real => source,
                Resolved::Through(_) | Resolved::Void => Source::Empty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_bye_passes_occupant_through() {
        let mut layout = BracketLayout::new();
        let a = layout.add(BracketSide::Winners, 1, Source::Seed(0), Source::Seed(3));
        let b = layout.add(BracketSide::Winners, 1, Source::Seed(1), Source::Seed(2));
        layout.add(
            BracketSide::Winners,
            2,
            Source::Winner(a),
            Source::Winner(b),
        );

        let seeds: Vec<TeamId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let matches = layout.materialize(Uuid::new_v4(), &seeds);

        assert_eq!(matches.len(), 2);
        let first = &matches[0];
        let last = &matches[1];
        assert_eq!((first.round, first.match_number), (1, 1));
        assert_eq!(first.home_team_id, Some(seeds[1]));
        assert_eq!(last.round, 2);
        assert_eq!(last.home_team_id, Some(seeds[0]));
        assert_eq!(last.away_team_id, None);
        assert_eq!(
            first.next,
            Some(SlotRef {
                match_id: last.id,
                slot: Slot::Away
            })
        );
    }

    #[test]
    fn test_empty_round_is_dropped_from_numbering() {
        let mut layout = BracketLayout::new();
        let a = layout.add(BracketSide::Losers, 1, Source::Empty, Source::Empty);
        layout.add(BracketSide::Losers, 2, Source::Winner(a), Source::Seed(0));
        layout.add(BracketSide::Losers, 3, Source::Seed(0), Source::Seed(1));

        let seeds: Vec<TeamId> = (0..2).map(|_| Uuid::new_v4()).collect();
        let matches = layout.materialize(Uuid::new_v4(), &seeds);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].round, 1);
    }
}
