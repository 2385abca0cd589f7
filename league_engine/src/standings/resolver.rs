//! Standings computation and tie-break resolution.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::models::{ManualPlacement, StandingRow, Standings, TiedGroup};
use crate::{
    bracket::{BracketSide, Match},
    errors::{CompetitionError, CompetitionResult},
    roster::{Team, TeamId, TeamStatus},
    tournament::{ScoringRule, TieBreaker, Tournament},
};

/// Teams that take part in the standings
///
/// Seeded teams once a bracket exists, otherwise every registered team.
fn participants(teams: &[Team]) -> Vec<&Team> {
    let seeded: Vec<&Team> = teams.iter().filter(|t| t.seed.is_some()).collect();
    let mut list = if seeded.is_empty() {
        teams
            .iter()
            .filter(|t| t.status == TeamStatus::Registered)
            .collect()
    } else {
        seeded
    };
    list.sort_by_key(|t| (t.seed.unwrap_or(u32::MAX), t.sequence));
    list
}

/// Compute standings for the tournament's format
pub fn compute(tournament: &Tournament, teams: &[Team], matches: &[Match]) -> Standings {
    let players = participants(teams);
    let (rows, tied_groups) = if tournament.config.format.is_elimination() {
        (elimination_rows(&players, matches), Vec::new())
    } else {
        round_robin_rows(tournament, &players, matches)
    };
    Standings {
        tournament_id: tournament.id,
        format: tournament.config.format,
        rows,
        tied_groups,
    }
}

fn row(team: &Team) -> StandingRow {
    StandingRow {
        team_id: team.id,
        team_name: team.name.clone(),
        seed: team.seed,
        placement: None,
        record: team.record,
        manual: false,
        eliminated: false,
        qualifies_for_playoffs: false,
    }
}

struct TieBreakContext<'a> {
    teams: HashMap<TeamId, &'a Team>,
    matches: &'a [Match],
    scoring: ScoringRule,
    criteria: &'a [TieBreaker],
}

impl TieBreakContext<'_> {
    /// Points earned only in finished matches among `group`
    fn head_to_head(&self, team_id: TeamId, group: &[TeamId]) -> i64 {
        self.matches
            .iter()
            .filter(|m| m.status.is_terminal() && m.bracket == BracketSide::RoundRobin)
            .filter(|m| m.involves(team_id))
            .filter(|m| {
                let opponent = if m.home_team_id == Some(team_id) {
                    m.away_team_id
                } else {
                    m.home_team_id
                };
                opponent.is_some_and(|o| group.contains(&o))
            })
            .map(|m| {
                let points = match m.winner_team_id {
                    None => self.scoring.tie_points,
                    Some(winner) if winner == team_id => self.scoring.win_points,
                    Some(_) => self.scoring.loss_points,
                };
                i64::from(points)
            })
            .sum()
    }

    /// Criterion value, higher is better
    fn value(&self, criterion: TieBreaker, team_id: TeamId, group: &[TeamId]) -> i64 {
        let Some(team) = self.teams.get(&team_id) else {
            return 0;
        };
        let record = &team.record;
        match criterion {
            TieBreaker::HeadToHead => self.head_to_head(team_id, group),
            TieBreaker::GoalDifference => record.goal_difference(),
            TieBreaker::GoalsFor => i64::from(record.goals_for),
            TieBreaker::GoalsAgainst => -i64::from(record.goals_against),
            TieBreaker::Wins => i64::from(record.wins),
        }
    }

    /// Split `group` into ordered subgroups of equal value
    fn partition<F>(group: &[TeamId], value: F) -> Vec<Vec<TeamId>>
    where
        F: Fn(TeamId) -> i64,
    {
        let mut scored: Vec<(i64, TeamId)> = group.iter().map(|&t| (value(t), t)).collect();
        // Stable: equal values keep their incoming order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut parts: Vec<Vec<TeamId>> = Vec::new();
        let mut last: Option<i64> = None;
        for (v, team_id) in scored {
            match parts.last_mut() {
                Some(part) if last == Some(v) => part.push(team_id),
                _ => parts.push(vec![team_id]),
            }
            last = Some(v);
        }
        parts
    }

    /// Order a points tier, restarting the criteria inside every smaller subgroup
    fn separate(&self, group: Vec<TeamId>) -> Vec<Vec<TeamId>> {
        if group.len() <= 1 {
            return vec![group];
        }
        for &criterion in self.criteria {
            let parts = Self::partition(&group, |t| self.value(criterion, t, &group));
            if parts.len() > 1 {
                return parts.into_iter().flat_map(|part| self.separate(part)).collect();
            }
        }
        vec![group]
    }
}

fn round_robin_rows(
    tournament: &Tournament,
    players: &[&Team],
    matches: &[Match],
) -> (Vec<StandingRow>, Vec<TiedGroup>) {
    let config = &tournament.config;
    let context = TieBreakContext {
        teams: players.iter().map(|t| (t.id, *t)).collect(),
        matches,
        scoring: config.scoring,
        criteria: &config.tie_breakers,
    };

    let ids: Vec<TeamId> = players.iter().map(|t| t.id).collect();
    let tiers = TieBreakContext::partition(&ids, |t| {
        context
            .teams
            .get(&t)
            .map_or(0, |team| i64::from(team.record.points))
    });
    let ranked: Vec<Vec<TeamId>> = tiers
        .into_iter()
        .flat_map(|tier| context.separate(tier))
        .collect();

    let mut rows = Vec::with_capacity(players.len());
    let mut tied_groups = Vec::new();
    let mut position: u32 = 1;
    for group in ranked {
        let size = group.len() as u32;
        let last = position + size - 1;
        let members: Vec<&Team> = group.iter().filter_map(|t| context.teams.get(t).copied()).collect();

        if members.len() == 1 {
            let mut line = row(members[0]);
            line.placement = Some(position);
            rows.push(line);
        } else if let Some(order) = manual_order(&members, position, last) {
            for (team, placement) in order {
                let mut line = row(team);
                line.placement = Some(placement);
                line.manual = true;
                rows.push(line);
            }
        } else {
            for team in &members {
                rows.push(row(team));
            }
            tied_groups.push(TiedGroup {
                first_position: position,
                last_position: last,
                team_ids: group,
            });
        }
        position = last + 1;
    }

    if let Some(cutoff) = config.round_robin.playoff_cutoff {
        for line in &mut rows {
            line.qualifies_for_playoffs = line.placement.is_some_and(|p| p <= cutoff);
        }
    }
    (rows, tied_groups)
}

/// Manual placements that still cover exactly this group's position range
fn manual_order<'a>(members: &[&'a Team], first: u32, last: u32) -> Option<Vec<(&'a Team, u32)>> {
    let mut order = Vec::with_capacity(members.len());
    let mut seen = BTreeSet::new();
    for team in members {
        let placement = team.final_placement.filter(|_| team.placement_manual)?;
        if !(first..=last).contains(&placement) || !seen.insert(placement) {
            return None;
        }
        order.push((*team, placement));
    }
    order.sort_by_key(|(_, p)| *p);
    Some(order)
}

/// Stage at which a loss ends a team's run; later stages rank higher
fn stage(m: &Match) -> (u8, u32) {
    let side = match m.bracket {
        BracketSide::Winners | BracketSide::RoundRobin => 0,
        BracketSide::Losers => 1,
        BracketSide::GrandFinal => 2,
    };
    (side, m.round)
}

fn elimination_rows(players: &[&Team], matches: &[Match]) -> Vec<StandingRow> {
    let knocked_out: HashMap<TeamId, (u8, u32)> = matches
        .iter()
        .filter(|m| m.status.is_terminal() && m.loser_next.is_none())
        .filter_map(|m| m.loser_team_id.map(|loser| (loser, stage(m))))
        .fold(HashMap::new(), |mut acc, (team, at)| {
            let entry = acc.entry(team).or_insert(at);
            *entry = (*entry).max(at);
            acc
        });

    let alive: Vec<&&Team> = players.iter().filter(|t| !knocked_out.contains_key(&t.id)).collect();
    let finished = !matches.is_empty() && matches.iter().all(|m| m.status.is_terminal());

    let mut rows: Vec<StandingRow> = Vec::with_capacity(players.len());
    for team in &alive {
        let mut line = row(team);
        if finished && alive.len() == 1 {
            line.placement = Some(1);
        }
        rows.push(line);
    }

    let mut out: Vec<(&Team, (u8, u32))> = players
        .iter()
        .filter_map(|t| knocked_out.get(&t.id).map(|at| (*t, *at)))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.seed.cmp(&b.0.seed)));

    for (team, at) in &out {
        let better = alive.len() + out.iter().filter(|(_, other)| other > at).count();
        let mut line = row(team);
        line.placement = Some(better as u32 + 1);
        line.eliminated = true;
        rows.push(line);
    }
    rows
}

/// Check that `placements` fully and exactly orders one or more tied groups
pub fn validate_resolution(standings: &Standings, placements: &[ManualPlacement]) -> CompetitionResult<()> {
    if placements.is_empty() {
        return Err(CompetitionError::InvalidTieResolution(
            "no placements given".to_string(),
        ));
    }
    let mut given: HashMap<TeamId, u32> = HashMap::new();
    for p in placements {
        if given.insert(p.team_id, p.final_placement).is_some() {
            return Err(CompetitionError::InvalidTieResolution(format!(
                "team {} listed twice",
                p.team_id
            )));
        }
    }

    let mut covered: HashSet<TeamId> = HashSet::new();
    for group in &standings.tied_groups {
        let listed = group.team_ids.iter().filter(|t| given.contains_key(t)).count();
        if listed == 0 {
            continue;
        }
        if listed != group.len() {
            return Err(CompetitionError::InvalidTieResolution(format!(
                "tied group at positions {}-{} must be resolved as a whole",
                group.first_position, group.last_position
            )));
        }
        let wanted: BTreeSet<u32> = (group.first_position..=group.last_position).collect();
        let chosen: BTreeSet<u32> = group.team_ids.iter().filter_map(|t| given.get(t).copied()).collect();
        if chosen != wanted {
            return Err(CompetitionError::InvalidTieResolution(format!(
                "placements must be exactly {}-{}, each used once",
                group.first_position, group.last_position
            )));
        }
        covered.extend(group.team_ids.iter().copied());
    }

    if let Some(stray) = given.keys().find(|t| !covered.contains(t)) {
        return Err(CompetitionError::InvalidTieResolution(format!(
            "team {stray} is not part of an unresolved tie"
        )));
    }
    Ok(())
}
