//! Result application and downstream propagation.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    bracket::{BracketSide, Match, MatchId, MatchStatus, Slot, SlotRef},
    errors::{CompetitionError, CompetitionResult},
    roster::{MatchOutcome, Team, TeamId},
    tournament::TournamentConfig,
};

/// Highest score accepted for one side of a match
pub const MAX_SCORE: u32 = 9_999;

/// Result submitted for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultInput {
    Score { home: u32, away: u32 },
    Forfeit { forfeiting: TeamId },
}

/// What a result changed, for auditing and notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultChange {
    pub match_id: MatchId,
    /// Match as it was before the change
    pub previous: Match,
    pub winner: Option<TeamId>,
    pub loser: Option<TeamId>,
    /// Downstream matches whose slots were written
    pub downstream: Vec<MatchId>,
    /// Reset grand final created by this result
    pub reset_created: Option<MatchId>,
    /// Reset grand final voided by a correction
    pub reset_removed: Option<MatchId>,
}

/// Applies results to the match graph and team counters
///
/// The only code path that mutates team records.
pub struct ProgressionEngine<'a> {
    matches: &'a mut Vec<Match>,
    teams: &'a mut [Team],
    config: &'a TournamentConfig,
}

impl<'a> ProgressionEngine<'a> {
    pub fn new(matches: &'a mut Vec<Match>, teams: &'a mut [Team], config: &'a TournamentConfig) -> Self {
        Self {
            matches,
            teams,
            config,
        }
    }

    fn index_of(&self, match_id: MatchId) -> CompetitionResult<usize> {
        self.matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or(CompetitionError::MatchNotFound(match_id))
    }

    /// Scheduled -> InProgress; starting an in-progress match is a no-op
    pub fn start_match(&mut self, match_id: MatchId) -> CompetitionResult<()> {
        let index = self.index_of(match_id)?;
        let m = &mut self.matches[index];
        if m.status.is_terminal() {
            return Err(CompetitionError::MatchAlreadyTerminal(match_id));
        }
        if !m.is_ready() {
            return Err(CompetitionError::MatchNotReady(match_id));
        }
        m.status = MatchStatus::InProgress;
        Ok(())
    }

    /// Record a first result for a match
    pub fn enter_result(
        &mut self,
        match_id: MatchId,
        input: ResultInput,
        now: DateTime<Utc>,
    ) -> CompetitionResult<ResultChange> {
        let index = self.index_of(match_id)?;
        if self.matches[index].status.is_terminal() {
            return Err(CompetitionError::MatchAlreadyTerminal(match_id));
        }
        self.validate(index, input)?;
        let previous = self.matches[index].clone();
        let mut change = self.record(index, input, now)?;
        change.previous = previous;
        Ok(change)
    }

    /// Replace the result of a terminal match and re-run propagation
    pub fn correct_result(
        &mut self,
        match_id: MatchId,
        input: ResultInput,
        now: DateTime<Utc>,
    ) -> CompetitionResult<ResultChange> {
        let index = self.index_of(match_id)?;
        if !self.matches[index].status.is_terminal() {
            return Err(CompetitionError::MatchNotTerminal(match_id));
        }
        self.validate(index, input)?;
        for pointer in self.pointers(index) {
            let downstream = self.index_of(pointer.match_id)?;
            if self.matches[downstream].status.is_terminal() {
                return Err(CompetitionError::DownstreamMatchAlreadyCompleted {
                    match_id,
                    downstream_id: pointer.match_id,
                });
            }
        }

        let previous = self.matches[index].clone();
        let reset_removed = self.undo(index)?;
        let index = self.index_of(match_id)?;
        let mut change = self.record(index, input, now)?;
        change.previous = previous;
        change.reset_removed = reset_removed;
        if change.reset_created.is_some() && change.reset_created == change.reset_removed {
            change.reset_created = None;
            change.reset_removed = None;
        }
        info!("Corrected result of match {match_id}");
        Ok(change)
    }

    fn pointers(&self, index: usize) -> Vec<SlotRef> {
        let m = &self.matches[index];
        m.next.into_iter().chain(m.loser_next).collect()
    }

    fn validate(&self, index: usize, input: ResultInput) -> CompetitionResult<()> {
        let m = &self.matches[index];
        if !m.is_ready() {
            return Err(CompetitionError::MatchNotReady(m.id));
        }
        match input {
            ResultInput::Score { home, away } => {
                if let Some(score) = [home, away].into_iter().find(|&s| s > MAX_SCORE) {
                    return Err(CompetitionError::ScoreOutOfRange {
                        match_id: m.id,
                        score,
                        max: MAX_SCORE,
                    });
                }
                if home == away && !self.config.format.allows_ties() {
                    return Err(CompetitionError::TieNotAllowed(m.id));
                }
            }
            ResultInput::Forfeit { forfeiting } => {
                if !m.involves(forfeiting) {
                    return Err(CompetitionError::TeamNotInMatch {
                        match_id: m.id,
                        team_id: forfeiting,
                    });
                }
            }
        }
        Ok(())
    }

    /// Counter effects of a terminal match: (team, outcome, scored, conceded)
    fn effects(m: &Match) -> Vec<(TeamId, MatchOutcome, u32, u32)> {
        let (Some(home), Some(away)) = (m.home_team_id, m.away_team_id) else {
            return Vec::new();
        };
        let home_score = m.home_score.unwrap_or(0);
        let away_score = m.away_score.unwrap_or(0);
        let outcome_for = |team: TeamId| match m.winner_team_id {
            None => MatchOutcome::Tie,
            Some(winner) if winner == team => MatchOutcome::Win,
            Some(_) => MatchOutcome::Loss,
        };
        vec![
            (home, outcome_for(home), home_score, away_score),
            (away, outcome_for(away), away_score, home_score),
        ]
    }

    fn team_mut(&mut self, team_id: TeamId) -> CompetitionResult<&mut Team> {
        self.teams
            .iter_mut()
            .find(|t| t.id == team_id)
            .ok_or(CompetitionError::TeamNotFound(team_id))
    }

    fn record(
        &mut self,
        index: usize,
        input: ResultInput,
        now: DateTime<Utc>,
    ) -> CompetitionResult<ResultChange> {
        let mut m = self.matches[index].clone();
        let (Some(home), Some(away)) = (m.home_team_id, m.away_team_id) else {
            return Err(CompetitionError::MatchNotReady(m.id));
        };
        match input {
            ResultInput::Score {
                home: home_score,
                away: away_score,
            } => {
                m.home_score = Some(home_score);
                m.away_score = Some(away_score);
                let (winner, loser) = match home_score.cmp(&away_score) {
                    std::cmp::Ordering::Greater => (Some(home), Some(away)),
                    std::cmp::Ordering::Less => (Some(away), Some(home)),
                    std::cmp::Ordering::Equal => (None, None),
                };
                m.winner_team_id = winner;
                m.loser_team_id = loser;
                m.status = MatchStatus::Completed;
            }
            ResultInput::Forfeit { forfeiting } => {
                m.home_score = None;
                m.away_score = None;
                let winner = if forfeiting == home { away } else { home };
                m.winner_team_id = Some(winner);
                m.loser_team_id = Some(forfeiting);
                m.status = MatchStatus::Forfeit;
            }
        }
        m.completed_at = Some(now);

        let scoring = self.config.scoring;
        let mut records = Vec::with_capacity(2);
        for (team_id, outcome, scored, conceded) in Self::effects(&m) {
            let record = self
                .team_mut(team_id)?
                .record
                .checked_apply(outcome, scored, conceded, &scoring)
                .ok_or(CompetitionError::RecordOverflow(team_id))?;
            records.push((team_id, record));
        }
        for (team_id, record) in records {
            self.team_mut(team_id)?.record = record;
        }
        self.matches[index] = m.clone();
        let snapshot = m;

        let mut change = ResultChange {
            match_id: snapshot.id,
            previous: snapshot.clone(),
            winner: snapshot.winner_team_id,
            loser: snapshot.loser_team_id,
            downstream: Vec::new(),
            reset_created: None,
            reset_removed: None,
        };

        if self.needs_reset(&snapshot) {
            change.reset_created = Some(self.create_reset(index)?);
        }

        let snapshot = self.matches[index].clone();
        for (pointer, team) in [
            (snapshot.next, snapshot.winner_team_id),
            (snapshot.loser_next, snapshot.loser_team_id),
        ] {
            if let Some(pointer) = pointer {
                let downstream = self.index_of(pointer.match_id)?;
                self.matches[downstream].set_team(pointer.slot, team);
                change.downstream.push(pointer.match_id);
                debug!(
                    "Match {} sent team {:?} to {} ({})",
                    snapshot.label(),
                    team,
                    self.matches[downstream].label(),
                    pointer.slot.as_str()
                );
            }
        }
        Ok(change)
    }

    /// The losers' bracket champion (away side) won the first grand final
    fn needs_reset(&self, m: &Match) -> bool {
        self.config.grand_final_reset
            && m.bracket == BracketSide::GrandFinal
            && m.round == 1
            && m.next.is_none()
            && m.winner_team_id.is_some()
            && m.winner_team_id == m.away_team_id
    }

    fn create_reset(&mut self, index: usize) -> CompetitionResult<MatchId> {
        let first = &self.matches[index];
        let reset = Match::new(first.tournament_id, BracketSide::GrandFinal, 2, 1);
        let reset_id = reset.id;
        let first = &mut self.matches[index];
        first.next = Some(SlotRef {
            match_id: reset_id,
            slot: Slot::Home,
        });
        first.loser_next = Some(SlotRef {
            match_id: reset_id,
            slot: Slot::Away,
        });
        info!("Grand final reset created for tournament {}", first.tournament_id);
        if self.matches.iter().all(|m| m.id != reset_id) {
            self.matches.push(reset);
        }
        Ok(reset_id)
    }

    /// Revert a terminal match to unplayed, clearing what it propagated
    ///
    /// Returns the id of a reset grand final removed along the way.
    fn undo(&mut self, index: usize) -> CompetitionResult<Option<MatchId>> {
        let snapshot = self.matches[index].clone();
        for (team_id, outcome, scored, conceded) in Self::effects(&snapshot) {
            let scoring = self.config.scoring;
            self.team_mut(team_id)?
                .record
                .revert(outcome, scored, conceded, &scoring);
        }

        for pointer in self.pointers(index) {
            let downstream = self.index_of(pointer.match_id)?;
            self.matches[downstream].set_team(pointer.slot, None);
        }

        let mut removed = None;
        if snapshot.bracket == BracketSide::GrandFinal && snapshot.round == 1 {
            if let Some(pointer) = snapshot.next {
                self.matches.retain(|m| m.id != pointer.match_id);
                removed = Some(pointer.match_id);
            }
        }

        let index = self.index_of(snapshot.id)?;
        let m = &mut self.matches[index];
        if removed.is_some() {
            m.next = None;
            m.loser_next = None;
        }
        m.home_score = None;
        m.away_score = None;
        m.winner_team_id = None;
        m.loser_team_id = None;
        m.status = MatchStatus::InProgress;
        m.completed_at = None;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{self, MatchSet};
    use crate::roster::TeamRecord;
    use uuid::Uuid;

    struct Fixture {
        config: TournamentConfig,
        teams: Vec<Team>,
        matches: Vec<Match>,
    }

    impl Fixture {
        fn new(config: TournamentConfig, n: u32) -> Self {
            let tournament_id = Uuid::new_v4();
            let teams: Vec<Team> = (0..n)
                .map(|i| Team::new(tournament_id, format!("T{}", i + 1), None, i, Utc::now()))
                .collect();
            let seeds: Vec<TeamId> = teams.iter().map(|t| t.id).collect();
            let MatchSet { matches } = bracket::generate(&config, tournament_id, &seeds).unwrap();
            Self {
                config,
                teams,
                matches,
            }
        }

        fn engine(&mut self) -> ProgressionEngine<'_> {
            ProgressionEngine::new(&mut self.matches, &mut self.teams, &self.config)
        }

        fn find(&self, side: BracketSide, round: u32, number: u32) -> Match {
            self.matches
                .iter()
                .find(|m| m.order_key() == (side, round, number))
                .cloned()
                .unwrap()
        }

        fn record(&self, team: usize) -> TeamRecord {
            self.teams[team].record
        }

        fn score(&mut self, id: MatchId, home: u32, away: u32) -> ResultChange {
            self.engine()
                .enter_result(id, ResultInput::Score { home, away }, Utc::now())
                .unwrap()
        }
    }

    #[test]
    fn test_winner_propagates_to_next_slot() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let semi = fx.find(BracketSide::Winners, 1, 1);
        let change = fx.score(semi.id, 2, 1);

        let target = semi.next.unwrap();
        let fin = fx.find(BracketSide::Winners, 2, 1);
        assert_eq!(target.match_id, fin.id);
        assert_eq!(fin.team_in(target.slot), semi.home_team_id);
        assert_eq!(change.downstream, vec![fin.id]);
        assert_eq!(fx.record(0).wins, 1);
        assert_eq!(fx.record(3).losses, 1);
    }

    #[test]
    fn test_terminal_match_rejects_second_score() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let semi = fx.find(BracketSide::Winners, 1, 1);
        fx.score(semi.id, 2, 1);
        let err = fx
            .engine()
            .enter_result(semi.id, ResultInput::Score { home: 3, away: 0 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CompetitionError::MatchAlreadyTerminal(_)));
    }

    #[test]
    fn test_tbd_slot_rejects_score() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let fin = fx.find(BracketSide::Winners, 2, 1);
        let err = fx
            .engine()
            .enter_result(fin.id, ResultInput::Score { home: 1, away: 0 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CompetitionError::MatchNotReady(_)));
    }

    #[test]
    fn test_ties_only_in_round_robin() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let semi = fx.find(BracketSide::Winners, 1, 1);
        let err = fx
            .engine()
            .enter_result(semi.id, ResultInput::Score { home: 1, away: 1 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CompetitionError::TieNotAllowed(_)));

        let mut fx = Fixture::new(TournamentConfig::round_robin("League".into(), 4, 1), 4);
        let first = fx.matches[0].clone();
        let change = fx.score(first.id, 1, 1);
        assert_eq!(change.winner, None);
        let home = fx.teams.iter().find(|t| Some(t.id) == first.home_team_id).unwrap();
        assert_eq!(home.record.ties, 1);
        assert_eq!(home.record.points, 1);
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        let mut fx = Fixture::new(TournamentConfig::round_robin("League".into(), 4, 1), 4);
        let first = fx.matches[0].clone();
        let err = fx
            .engine()
            .enter_result(
                first.id,
                ResultInput::Score {
                    home: u32::MAX,
                    away: u32::MAX - 1,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CompetitionError::ScoreOutOfRange { score: u32::MAX, max: MAX_SCORE, .. }
        ));
        assert_eq!(err.class(), crate::errors::ErrorClass::FixInput);
        assert_eq!(fx.matches[0].status, MatchStatus::Scheduled);
        assert!(fx.teams.iter().all(|t| t.record == TeamRecord::default()));

        // The largest accepted score still plays, and a second match for the same team adds up
        fx.score(first.id, MAX_SCORE, MAX_SCORE - 1);
        let home = first.home_team_id.unwrap();
        let next = fx
            .matches
            .iter()
            .find(|m| m.id != first.id && m.involves(home))
            .cloned()
            .unwrap();
        fx.score(next.id, MAX_SCORE, 0);
        let record = fx.teams.iter().find(|t| t.id == home).unwrap().record;
        assert!(record.goals_for >= MAX_SCORE);

        let err = fx
            .engine()
            .correct_result(first.id, ResultInput::Score { home: MAX_SCORE + 1, away: 0 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CompetitionError::ScoreOutOfRange { .. }));
    }

    #[test]
    fn test_counter_overflow_is_rejected() {
        let mut fx = Fixture::new(TournamentConfig::round_robin("League".into(), 2, 1), 2);
        let only = fx.matches[0].clone();
        let home = only.home_team_id.unwrap();
        fx.teams
            .iter_mut()
            .find(|t| t.id == home)
            .unwrap()
            .record
            .goals_for = u32::MAX - 5;
        let err = fx
            .engine()
            .enter_result(only.id, ResultInput::Score { home: 10, away: 0 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CompetitionError::RecordOverflow(team) if team == home));
        assert_eq!(fx.matches[0].status, MatchStatus::Scheduled);
        assert!(fx.teams.iter().all(|t| t.record.played() == 0));
    }

    #[test]
    fn test_forfeit_awards_the_other_team() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let semi = fx.find(BracketSide::Winners, 1, 1);
        let forfeiting = semi.home_team_id.unwrap();
        let change = fx
            .engine()
            .enter_result(semi.id, ResultInput::Forfeit { forfeiting }, Utc::now())
            .unwrap();
        assert_eq!(change.winner, semi.away_team_id);
        assert_eq!(fx.find(BracketSide::Winners, 1, 1).status, MatchStatus::Forfeit);

        // Seed 1 does not play in the other semifinal
        let other = fx.find(BracketSide::Winners, 1, 2);
        let err = fx
            .engine()
            .enter_result(other.id, ResultInput::Forfeit { forfeiting }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CompetitionError::TeamNotInMatch { .. }));
    }

    #[test]
    fn test_correction_rewrites_downstream_slot() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let semi = fx.find(BracketSide::Winners, 1, 1);
        fx.score(semi.id, 2, 1);

        let change = fx
            .engine()
            .correct_result(semi.id, ResultInput::Score { home: 0, away: 3 }, Utc::now())
            .unwrap();
        assert_eq!(change.winner, semi.away_team_id);
        assert_eq!(change.previous.winner_team_id, semi.home_team_id);

        let slot = semi.next.unwrap();
        let fin = fx.find(BracketSide::Winners, 2, 1);
        assert_eq!(fin.team_in(slot.slot), semi.away_team_id);
        assert_eq!(fx.record(0), TeamRecord { losses: 1, goals_against: 3, ..Default::default() });
        assert_eq!(fx.record(3).wins, 1);
    }

    #[test]
    fn test_correction_blocked_by_terminal_downstream() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let semi_a = fx.find(BracketSide::Winners, 1, 1);
        let semi_b = fx.find(BracketSide::Winners, 1, 2);
        fx.score(semi_a.id, 2, 1);
        fx.score(semi_b.id, 2, 1);
        let fin = fx.find(BracketSide::Winners, 2, 1);
        fx.score(fin.id, 1, 0);

        let err = fx
            .engine()
            .correct_result(semi_a.id, ResultInput::Score { home: 0, away: 1 }, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            CompetitionError::DownstreamMatchAlreadyCompleted { downstream_id, .. } if downstream_id == fin.id
        ));
    }

    #[test]
    fn test_correction_requires_terminal_match() {
        let mut fx = Fixture::new(TournamentConfig::single_elimination("Cup".into(), 4), 4);
        let semi = fx.find(BracketSide::Winners, 1, 1);
        let err = fx
            .engine()
            .correct_result(semi.id, ResultInput::Score { home: 1, away: 0 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CompetitionError::MatchNotTerminal(_)));
    }

    fn play_to_grand_final(fx: &mut Fixture) -> Match {
        // 2-team double elimination: winners' final then grand final
        let opener = fx.find(BracketSide::Winners, 1, 1);
        fx.score(opener.id, 3, 0);
        fx.find(BracketSide::GrandFinal, 1, 1)
    }

    #[test]
    fn test_losers_champion_win_creates_reset() {
        let mut fx = Fixture::new(TournamentConfig::double_elimination("Cup".into(), 2), 2);
        let gf = play_to_grand_final(&mut fx);
        assert_eq!(gf.home_team_id, Some(fx.teams[0].id));
        assert_eq!(gf.away_team_id, Some(fx.teams[1].id));

        let change = fx.score(gf.id, 0, 1);
        let reset_id = change.reset_created.unwrap();
        let reset = fx.matches.iter().find(|m| m.id == reset_id).unwrap();
        assert_eq!(reset.order_key(), (BracketSide::GrandFinal, 2, 1));
        assert_eq!(reset.home_team_id, Some(fx.teams[1].id));
        assert_eq!(reset.away_team_id, Some(fx.teams[0].id));
    }

    #[test]
    fn test_no_reset_when_disabled_or_winners_champion_wins() {
        let mut fx = Fixture::new(TournamentConfig::double_elimination("Cup".into(), 2), 2);
        let gf = play_to_grand_final(&mut fx);
        assert!(fx.score(gf.id, 2, 0).reset_created.is_none());

        let mut config = TournamentConfig::double_elimination("Cup".into(), 2);
        config.grand_final_reset = false;
        let mut fx = Fixture::new(config, 2);
        let gf = play_to_grand_final(&mut fx);
        assert!(fx.score(gf.id, 0, 2).reset_created.is_none());
        assert_eq!(fx.matches.len(), 2);
    }

    #[test]
    fn test_correcting_grand_final_voids_reset() {
        let mut fx = Fixture::new(TournamentConfig::double_elimination("Cup".into(), 2), 2);
        let gf = play_to_grand_final(&mut fx);
        let reset_id = fx.score(gf.id, 0, 1).reset_created.unwrap();

        let change = fx
            .engine()
            .correct_result(gf.id, ResultInput::Score { home: 1, away: 0 }, Utc::now())
            .unwrap();
        assert_eq!(change.reset_removed, Some(reset_id));
        assert!(fx.matches.iter().all(|m| m.id != reset_id));
        let gf = fx.find(BracketSide::GrandFinal, 1, 1);
        assert!(gf.next.is_none() && gf.loser_next.is_none());
    }
}
