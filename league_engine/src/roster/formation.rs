//! Team formation from confirmed registrations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::models::{Registration, RegistrationId, RegistrationStatus, Team, TeamId};

/// Outcome of an auto-assignment pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReport {
    /// Registrations placed, in placement order
    pub assigned: Vec<(RegistrationId, TeamId)>,
    /// Registrations that fit nowhere
    pub unassigned: Vec<RegistrationId>,
}

/// Confirmed registrations currently on `team_id`
pub fn member_count(registrations: &[Registration], team_id: TeamId) -> u32 {
    registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Confirmed && r.team_id == Some(team_id))
        .count() as u32
}

/// Whether a team meets the minimum roster size
pub fn meets_minimum(registrations: &[Registration], team_id: TeamId, min_players: u32) -> bool {
    member_count(registrations, team_id) >= min_players
}

/// Distribute unassigned confirmed registrations over registered teams
///
/// Registrations are ordered by registration sequence, or by skill tier
/// (highest first, ties by sequence) when `balance_by_skill` is set. Each one
/// goes to the non-full team with the fewest members, ties broken by team
/// creation order, which keeps team sizes within one of each other.
pub fn auto_assign(
    registrations: &mut [Registration],
    teams: &[Team],
    max_players_per_team: u32,
    balance_by_skill: bool,
) -> AssignmentReport {
    let mut candidates: Vec<&Team> = teams.iter().filter(|t| t.is_registered()).collect();
    candidates.sort_by_key(|t| t.sequence);

    let mut sizes: HashMap<TeamId, u32> = candidates
        .iter()
        .map(|t| (t.id, member_count(registrations, t.id)))
        .collect();

    let mut pending: Vec<usize> = registrations
        .iter()
        .enumerate()
        .filter(|(_, r)| r.status == RegistrationStatus::Confirmed && r.team_id.is_none())
        .map(|(i, _)| i)
        .collect();
    if balance_by_skill {
        pending.sort_by(|&a, &b| {
            let (ra, rb) = (&registrations[a], &registrations[b]);
            rb.skill_tier
                .unwrap_or(0)
                .cmp(&ra.skill_tier.unwrap_or(0))
                .then(ra.sequence.cmp(&rb.sequence))
        });
    } else {
        pending.sort_by_key(|&i| registrations[i].sequence);
    }

    let mut report = AssignmentReport::default();
    for index in pending {
        let target = candidates
            .iter()
            .filter(|t| sizes.get(&t.id).copied().unwrap_or(0) < max_players_per_team)
            .min_by_key(|t| (sizes.get(&t.id).copied().unwrap_or(0), t.sequence))
            .map(|t| t.id);

        let registration = &mut registrations[index];
        match target {
            Some(team_id) => {
                registration.team_id = Some(team_id);
                *sizes.entry(team_id).or_insert(0) += 1;
                report.assigned.push((registration.id, team_id));
            }
            None => report.unassigned.push(registration.id),
        }
    }
    report
}

/// Names for `count` new teams, continuing after `existing` teams
pub fn bulk_team_names(prefix: &str, existing: usize, count: u32) -> Vec<String> {
    (1..=count as usize)
        .map(|n| format!("{} {}", prefix.trim(), existing + n))
        .collect()
}
