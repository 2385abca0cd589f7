//! Seeding: ordering teams and placing seeds into bracket positions.

use crate::roster::{Team, TeamId};

/// Smallest power of two that is at least `n` (minimum 2)
pub fn next_power_of_two(n: usize) -> usize {
    n.max(2).next_power_of_two()
}

/// Standard bracket order for a power-of-two field
///
/// Seed 1 and seed 2 can only meet in the final; for 8 slots the order is
/// `[1, 8, 4, 5, 2, 7, 3, 6]`.
pub fn seed_positions(size: usize) -> Vec<usize> {
    let mut positions = vec![1];
    let mut span = 1;
    while span < size {
        span *= 2;
        positions = positions
            .into_iter()
            .flat_map(|seed| [seed, span + 1 - seed])
            .collect();
    }
    positions
}

/// Order participating teams by seed and renumber seeds densely `1..=N`
///
/// Teams with an explicit seed come first (by seed), the rest follow in
/// creation order. Only the teams selected by `participates` are seeded; the
/// others lose any previous seed. Returns team ids in seed order.
pub fn assign_seeds<F>(teams: &mut [Team], participates: F) -> Vec<TeamId>
where
    F: Fn(&Team) -> bool,
{
    let mut order: Vec<usize> = Vec::new();
    for (index, team) in teams.iter_mut().enumerate() {
        if participates(team) {
            order.push(index);
        } else {
            team.seed = None;
        }
    }
    order.sort_by_key(|&i| (teams[i].seed.is_none(), teams[i].seed, teams[i].sequence));

    order
        .into_iter()
        .enumerate()
        .map(|(rank, index)| {
            teams[index].seed = Some(rank as u32 + 1);
            teams[index].id
        })
        .collect()
}
