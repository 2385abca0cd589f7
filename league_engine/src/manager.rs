//! Service facade over the competition aggregate.
//!
//! [`CompetitionManager`] loads a [`Competition`], resolves the caller's
//! role, runs one aggregate operation and commits the result conditionally
//! on the version it loaded. Mutations on the same tournament are serialised
//! by a per-tournament lock; writers in other processes are caught by the
//! version check, in which case the operation is re-run against fresh state.
//! Audit entries and notifications go out only after a successful commit.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::{
    audit::{AuditLogEntry, AuditSink},
    authz::{Access, AdminRole, Authorizer},
    bracket::{Match, MatchId, MatchSet},
    competition::{Competition, Journal},
    config::EngineConfig,
    db::CompetitionRepository,
    errors::{CompetitionError, CompetitionResult},
    notify::Notifier,
    progression::ResultChange,
    roster::{AssignmentReport, PaymentState, Registration, RegistrationId, Team, TeamId},
    standings::{ManualPlacement, Standings},
    tournament::{Tournament, TournamentConfig, TournamentId, TournamentStatus, UserId},
};

/// Competition operations for one deployment
pub struct CompetitionManager {
    repository: Arc<dyn CompetitionRepository>,
    authorizer: Arc<dyn Authorizer>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
}

impl CompetitionManager {
    /// Create a new competition manager
    pub fn new(
        repository: Arc<dyn CompetitionRepository>,
        authorizer: Arc<dyn Authorizer>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            authorizer,
            audit,
            notifier,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn lock_for(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|id, lock| *id == tournament_id || Arc::strong_count(lock) > 1);
        locks.entry(tournament_id).or_default().clone()
    }

    async fn access(&self, competition: &Competition, actor: UserId) -> CompetitionResult<Access> {
        if competition.tournament.owner_id == actor {
            return Ok(Access::new(actor, Some(AdminRole::Owner)));
        }
        let role = self.authorizer.role(actor, competition.id()).await?;
        Ok(Access::new(actor, role))
    }

    /// Write audit entries and dispatch notifications for a committed change
    async fn flush(&self, actor: UserId, tournament_id: TournamentId, journal: Journal, now: DateTime<Utc>) {
        let entries: Vec<AuditLogEntry> = journal
            .entries
            .into_iter()
            .map(|draft| AuditLogEntry::from_draft(draft, actor, tournament_id, now))
            .collect();
        if !entries.is_empty() {
            if let Err(e) = self.audit.append(&entries).await {
                warn!(
                    "Failed to write {} audit entries for tournament {tournament_id}: {e}",
                    entries.len()
                );
            }
        }
        for event in journal.events {
            self.notifier.notify(event);
        }
    }

    fn should_retry(&self, err: &CompetitionError, attempt: u32, tournament_id: TournamentId) -> bool {
        if matches!(err, CompetitionError::ConcurrentModification(_)) && attempt <= self.config.max_commit_retries {
            warn!("Tournament {tournament_id} changed underneath us, retrying (attempt {attempt})");
            true
        } else {
            false
        }
    }

    /// Load, apply `op`, commit; re-run on a lost race
    ///
    /// An operation that records nothing in its journal changed nothing and
    /// is not committed.
    async fn mutate<T, F>(&self, tournament_id: TournamentId, actor: UserId, mut op: F) -> CompetitionResult<T>
    where
        F: FnMut(&mut Competition, &Access, DateTime<Utc>, &mut Journal) -> CompetitionResult<T> + Send,
        T: Send,
    {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut competition = self.repository.load(tournament_id).await?;
            let now = Utc::now();

            let mut implied = Journal::new();
            if competition.apply_deadline(now, &mut implied)? {
                let expected = competition.tournament.version;
                competition.tournament.version = expected + 1;
                match self.repository.save(&competition, expected).await {
                    Ok(()) => self.flush(actor, tournament_id, implied, now).await,
                    Err(e) if self.should_retry(&e, attempt, tournament_id) => continue,
                    Err(e) => return Err(e),
                }
            }

            let access = self.access(&competition, actor).await?;
            let expected = competition.tournament.version;
            competition.tournament.version = expected + 1;
            let mut journal = Journal::new();
            let output = op(&mut competition, &access, now, &mut journal)?;
            if journal.entries.is_empty() {
                debug!("No changes to commit for tournament {tournament_id}");
                return Ok(output);
            }

            match self.repository.save(&competition, expected).await {
                Ok(()) => {
                    self.flush(actor, tournament_id, journal, now).await;
                    return Ok(output);
                }
                Err(e) if self.should_retry(&e, attempt, tournament_id) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Create a draft tournament owned by `actor`
    pub async fn create_tournament(&self, actor: UserId, config: TournamentConfig) -> CompetitionResult<Tournament> {
        let now = Utc::now();
        let mut journal = Journal::new();
        let competition = Competition::create(actor, config, now, &mut journal)?;
        self.repository.create(&competition).await?;
        self.flush(actor, competition.id(), journal, now).await;
        info!("Tournament {} created by {actor}", competition.id());
        Ok(competition.tournament)
    }

    pub async fn publish_tournament(&self, actor: UserId, tournament_id: TournamentId) -> CompetitionResult<Tournament> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.publish(access, now, journal)?;
            Ok(c.tournament.clone())
        })
        .await
    }

    pub async fn close_registration(&self, actor: UserId, tournament_id: TournamentId) -> CompetitionResult<Tournament> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.close_registration(access, now, journal)?;
            Ok(c.tournament.clone())
        })
        .await
    }

    /// Start the tournament and generate its bracket atomically
    ///
    /// Concurrent or repeated calls all return the same match set.
    pub async fn start_tournament(&self, actor: UserId, tournament_id: TournamentId) -> CompetitionResult<MatchSet> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.start(access, now, journal)
        })
        .await
    }

    pub async fn complete_tournament(&self, actor: UserId, tournament_id: TournamentId) -> CompetitionResult<Standings> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.complete(access, now, journal)
        })
        .await
    }

    pub async fn cancel_tournament(&self, actor: UserId, tournament_id: TournamentId) -> CompetitionResult<Tournament> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.cancel(access, now, journal)?;
            Ok(c.tournament.clone())
        })
        .await
    }

    pub async fn postpone_tournament(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        new_start: DateTime<Utc>,
    ) -> CompetitionResult<Tournament> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.postpone(access, new_start, now, journal)?;
            Ok(c.tournament.clone())
        })
        .await
    }

    pub async fn resume_tournament(&self, actor: UserId, tournament_id: TournamentId) -> CompetitionResult<Tournament> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.resume(access, now, journal)?;
            Ok(c.tournament.clone())
        })
        .await
    }

    // ---------------------------------------------------------------------
    // Roster
    // ---------------------------------------------------------------------

    pub async fn register(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        user_id: UserId,
        skill_tier: Option<u8>,
        payment_state: PaymentState,
    ) -> CompetitionResult<Registration> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.register(access, user_id, skill_tier, payment_state.clone(), now, journal)
        })
        .await
    }

    pub async fn withdraw_registration(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        registration_id: RegistrationId,
    ) -> CompetitionResult<Registration> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.withdraw_registration(access, registration_id, now, journal)
        })
        .await
    }

    pub async fn create_team(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        name: &str,
        captain_user_id: Option<UserId>,
    ) -> CompetitionResult<Team> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.create_team(access, name, captain_user_id, now, journal)
        })
        .await
    }

    pub async fn withdraw_team(&self, actor: UserId, tournament_id: TournamentId, team_id: TeamId) -> CompetitionResult<Team> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.withdraw_team(access, team_id, now, journal)
        })
        .await
    }

    pub async fn assign_team(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        registration_id: RegistrationId,
        team_id: TeamId,
    ) -> CompetitionResult<Registration> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.assign_team(access, registration_id, team_id, now, journal)
        })
        .await
    }

    pub async fn auto_assign_teams(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        balance_by_skill: bool,
    ) -> CompetitionResult<AssignmentReport> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.auto_assign_teams(access, balance_by_skill, now, journal)
        })
        .await
    }

    pub async fn bulk_create_teams(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        count: u32,
        name_prefix: &str,
    ) -> CompetitionResult<Vec<Team>> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.bulk_create_teams(access, count, name_prefix, now, journal)
        })
        .await
    }

    // ---------------------------------------------------------------------
    // Bracket and matches
    // ---------------------------------------------------------------------

    pub async fn generate_bracket(&self, actor: UserId, tournament_id: TournamentId) -> CompetitionResult<MatchSet> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.generate_bracket(access, now, journal)
        })
        .await
    }

    pub async fn start_match(&self, actor: UserId, tournament_id: TournamentId, match_id: MatchId) -> CompetitionResult<Match> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.start_match(access, match_id, now, journal)
        })
        .await
    }

    pub async fn enter_score(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        match_id: MatchId,
        home_score: u32,
        away_score: u32,
    ) -> CompetitionResult<ResultChange> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.enter_score(access, match_id, home_score, away_score, now, journal)
        })
        .await
    }

    pub async fn record_forfeit(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        match_id: MatchId,
        forfeiting_team_id: TeamId,
    ) -> CompetitionResult<ResultChange> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.record_forfeit(access, match_id, forfeiting_team_id, now, journal)
        })
        .await
    }

    pub async fn correct_score(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        match_id: MatchId,
        home_score: u32,
        away_score: u32,
    ) -> CompetitionResult<ResultChange> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.correct_score(access, match_id, home_score, away_score, now, journal)
        })
        .await
    }

    // ---------------------------------------------------------------------
    // Standings and reads
    // ---------------------------------------------------------------------

    /// Ranked standings plus unresolved tied groups
    pub async fn get_standings(&self, tournament_id: TournamentId) -> CompetitionResult<Standings> {
        Ok(self.repository.load(tournament_id).await?.standings())
    }

    pub async fn resolve_ties(
        &self,
        actor: UserId,
        tournament_id: TournamentId,
        placements: &[ManualPlacement],
    ) -> CompetitionResult<Standings> {
        self.mutate(tournament_id, actor, |c, access, now, journal| {
            c.resolve_ties(access, placements, now, journal)
        })
        .await
    }

    /// Whole aggregate: tournament, teams, registrations, matches
    pub async fn get_competition(&self, tournament_id: TournamentId) -> CompetitionResult<Competition> {
        self.repository.load(tournament_id).await
    }

    pub async fn get_tournament(&self, tournament_id: TournamentId) -> CompetitionResult<Tournament> {
        Ok(self.repository.load(tournament_id).await?.tournament)
    }

    pub async fn list_matches(&self, tournament_id: TournamentId) -> CompetitionResult<MatchSet> {
        Ok(self.repository.load(tournament_id).await?.match_set())
    }

    pub async fn list_tournaments(&self, status: Option<TournamentStatus>) -> CompetitionResult<Vec<Tournament>> {
        self.repository.list(status).await
    }
}
