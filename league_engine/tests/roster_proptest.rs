/// Property-based tests for roster capacity and bracket structure.
///
/// Arbitrary sequences of sign-ups and withdrawals must keep the waitlists
/// dense and never leave a freed slot unfilled, and generated brackets must
/// give every team exactly one way into the final.
use chrono::Utc;
use league_engine::{
    Competition, Journal,
    authz::{Access, AdminRole},
    bracket::{self, BracketSide, Match, MatchId, MatchSet},
    roster::{PaymentState, RegistrationStatus, TeamId, TeamStatus, waitlist},
    tournament::{TournamentConfig, UserId},
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const OWNER: UserId = 1;

#[derive(Debug, Clone)]
enum RosterOp {
    Register,
    Withdraw(usize),
    CreateTeam,
    WithdrawTeam(usize),
}

fn roster_op() -> impl Strategy<Value = RosterOp> {
    prop_oneof![
        3 => Just(RosterOp::Register),
        2 => any::<usize>().prop_map(RosterOp::Withdraw),
        2 => Just(RosterOp::CreateTeam),
        1 => any::<usize>().prop_map(RosterOp::WithdrawTeam),
    ]
}

fn owner() -> Access {
    Access::new(OWNER, Some(AdminRole::Owner))
}

fn open_competition(max_teams: u32, max_participants: u32) -> Competition {
    let mut config = TournamentConfig::single_elimination("Prop Cup".to_string(), max_teams);
    config.max_participants = Some(max_participants);
    let mut journal = Journal::new();
    let mut competition = Competition::create(OWNER, config, Utc::now(), &mut journal).unwrap();
    competition.publish(&owner(), Utc::now(), &mut journal).unwrap();
    competition
}

fn apply(competition: &mut Competition, op: &RosterOp, next_user: &mut UserId, next_team: &mut u32) {
    let now = Utc::now();
    let mut journal = Journal::new();
    match op {
        RosterOp::Register => {
            let user = *next_user;
            *next_user += 1;
            competition
                .register(&Access::participant(user), user, None, PaymentState::default(), now, &mut journal)
                .unwrap();
        }
        RosterOp::Withdraw(pick) => {
            let active: Vec<_> = competition
                .registrations
                .iter()
                .filter(|r| r.status != RegistrationStatus::Withdrawn)
                .map(|r| r.id)
                .collect();
            if !active.is_empty() {
                let id = active[pick % active.len()];
                competition
                    .withdraw_registration(&owner(), id, now, &mut journal)
                    .unwrap();
            }
        }
        RosterOp::CreateTeam => {
            let name = format!("Squad {next_team}");
            *next_team += 1;
            competition
                .create_team(&owner(), &name, None, now, &mut journal)
                .unwrap();
        }
        RosterOp::WithdrawTeam(pick) => {
            let active: Vec<TeamId> = competition
                .teams
                .iter()
                .filter(|t| t.status != TeamStatus::Withdrawn)
                .map(|t| t.id)
                .collect();
            if !active.is_empty() {
                let id = active[pick % active.len()];
                competition.withdraw_team(&owner(), id, now, &mut journal).unwrap();
            }
        }
    }
}

/// Follow winner pointers from `start` to the match with no successor
fn path_to_final(set: &MatchSet, start: MatchId) -> Vec<MatchId> {
    let mut path = vec![start];
    let mut current = set.get(start).unwrap();
    while let Some(next) = current.next {
        assert!(path.len() <= set.len(), "cycle in winner pointers");
        path.push(next.match_id);
        current = set.get(next.match_id).unwrap();
    }
    path
}

fn team_ids(n: usize) -> Vec<TeamId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

fn initial_slots(matches: &[Match]) -> Vec<TeamId> {
    matches
        .iter()
        .flat_map(|m| [m.home_team_id, m.away_team_id])
        .flatten()
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_waitlists_stay_dense(ops in prop::collection::vec(roster_op(), 1..60)) {
        let (max_teams, max_participants) = (4, 6);
        let mut competition = open_competition(max_teams, max_participants);
        let (mut next_user, mut next_team) = (100, 1);

        for op in &ops {
            apply(&mut competition, op, &mut next_user, &mut next_team);

            prop_assert!(waitlist::is_dense(&competition.registrations));
            prop_assert!(waitlist::is_dense(&competition.teams));

            let confirmed = competition
                .registrations
                .iter()
                .filter(|r| r.status == RegistrationStatus::Confirmed)
                .count();
            let waiting = competition
                .registrations
                .iter()
                .filter(|r| r.status == RegistrationStatus::Waitlisted)
                .count();
            prop_assert!(confirmed <= max_participants as usize);
            if waiting > 0 {
                prop_assert_eq!(confirmed, max_participants as usize);
            }

            let registered = competition.teams.iter().filter(|t| t.status == TeamStatus::Registered).count();
            let waiting_teams = competition.teams.iter().filter(|t| t.status == TeamStatus::Waitlisted).count();
            prop_assert!(registered <= max_teams as usize);
            if waiting_teams > 0 {
                prop_assert_eq!(registered, max_teams as usize);
            }
        }
    }

    #[test]
    fn prop_single_elimination_is_complete(n in 2usize..=64) {
        let config = TournamentConfig::single_elimination("Prop Cup".to_string(), 64);
        let seeds = team_ids(n);
        let set = bracket::generate(&config, Uuid::new_v4(), &seeds).unwrap();

        prop_assert_eq!(set.len(), n - 1);
        let finals: Vec<&Match> = set.matches.iter().filter(|m| m.next.is_none()).collect();
        prop_assert_eq!(finals.len(), 1);
        let final_id = finals[0].id;

        for m in &set.matches {
            prop_assert_eq!(*path_to_final(&set, m.id).last().unwrap(), final_id);
        }

        // Every team is placed exactly once, in its first match or past its bye
        let placed = initial_slots(&set.matches);
        prop_assert_eq!(placed.len(), n);
        let unique: HashSet<TeamId> = placed.iter().copied().collect();
        prop_assert_eq!(unique, seeds.iter().copied().collect::<HashSet<_>>());

        // Each downstream slot has exactly one feeder or one bye occupant
        let mut feeders: HashMap<(MatchId, bool), u32> = HashMap::new();
        for m in &set.matches {
            if let Some(next) = m.next {
                let home = next.slot == bracket::Slot::Home;
                *feeders.entry((next.match_id, home)).or_default() += 1;
            }
        }
        prop_assert!(feeders.values().all(|&c| c == 1));
    }

    #[test]
    fn prop_double_elimination_sizes(n in 2usize..=32) {
        let config = TournamentConfig::double_elimination("Prop Cup".to_string(), 32);
        let seeds = team_ids(n);
        let set = bracket::generate(&config, Uuid::new_v4(), &seeds).unwrap();

        prop_assert_eq!(set.len(), 2 * n - 2);
        prop_assert_eq!(set.rounds(BracketSide::GrandFinal), 1);
        let placed = initial_slots(&set.matches);
        prop_assert_eq!(placed.len(), n);
    }

    #[test]
    fn prop_round_robin_pairs_everyone(n in 2usize..=12, meetings in 1u32..=3) {
        let config = TournamentConfig::round_robin("Prop League".to_string(), 12, meetings);
        let seeds = team_ids(n);
        let set = bracket::generate(&config, Uuid::new_v4(), &seeds).unwrap();

        prop_assert_eq!(set.len(), n * (n - 1) / 2 * meetings as usize);
        let mut pairs: HashMap<(TeamId, TeamId), u32> = HashMap::new();
        for m in &set.matches {
            let (a, b) = (m.home_team_id.unwrap(), m.away_team_id.unwrap());
            prop_assert_ne!(a, b);
            let key = if a < b { (a, b) } else { (b, a) };
            *pairs.entry(key).or_default() += 1;
        }
        prop_assert_eq!(pairs.len(), n * (n - 1) / 2);
        prop_assert!(pairs.values().all(|&c| c == meetings));
    }
}
