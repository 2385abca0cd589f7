//! Shared fixtures for the manager integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use league_engine::{
    CompetitionManager, EngineConfig,
    audit::MemoryAuditSink,
    authz::StaticAuthorizer,
    bracket::Match,
    db::MemoryRepository,
    notify::{ChannelNotifier, CompetitionEvent},
    roster::PaymentState,
    tournament::{TournamentConfig, TournamentId, UserId},
};
use tokio::sync::mpsc::UnboundedReceiver;

pub const OWNER: UserId = 1;

/// First user id handed out to generated participants
pub const FIRST_PLAYER: UserId = 100;

pub struct Harness {
    pub manager: CompetitionManager,
    pub repository: Arc<MemoryRepository>,
    pub audit: Arc<MemoryAuditSink>,
    pub authorizer: Arc<StaticAuthorizer>,
    pub events: UnboundedReceiver<CompetitionEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::sharing(Arc::new(MemoryRepository::new()), Arc::new(MemoryAuditSink::new()))
    }

    /// A second worker over the same store
    pub fn sharing(repository: Arc<MemoryRepository>, audit: Arc<MemoryAuditSink>) -> Self {
        let authorizer = Arc::new(StaticAuthorizer::new());
        let (notifier, events) = ChannelNotifier::new();
        let manager = CompetitionManager::new(
            repository.clone(),
            authorizer.clone(),
            audit.clone(),
            Arc::new(notifier),
            EngineConfig::default(),
        );
        Self {
            manager,
            repository,
            audit,
            authorizer,
            events,
        }
    }

    pub fn drain_events(&mut self) -> Vec<CompetitionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Published tournament with `teams` one-player teams, registration closed
    pub async fn closed_tournament(&self, config: TournamentConfig, teams: u32) -> TournamentId {
        let m = &self.manager;
        let tournament = m.create_tournament(OWNER, config).await.unwrap();
        let id = tournament.id;
        m.publish_tournament(OWNER, id).await.unwrap();
        m.bulk_create_teams(OWNER, id, teams, "Team").await.unwrap();
        for user in FIRST_PLAYER..FIRST_PLAYER + teams as UserId {
            m.register(user, id, user, None, PaymentState::default())
                .await
                .unwrap();
        }
        let report = m.auto_assign_teams(OWNER, id, false).await.unwrap();
        assert!(report.unassigned.is_empty());
        m.close_registration(OWNER, id).await.unwrap();
        id
    }

    /// Next playable match in bracket order
    pub async fn next_playable(&self, id: TournamentId) -> Option<Match> {
        self.manager
            .list_matches(id)
            .await
            .unwrap()
            .matches
            .into_iter()
            .find(|m| m.is_ready() && !m.status.is_terminal())
    }

    /// Play every match in bracket order with the score chosen by `score`
    ///
    /// Returns the number of matches played.
    pub async fn play_out<F>(&self, id: TournamentId, score: F) -> usize
    where
        F: Fn(&Match) -> (u32, u32),
    {
        let mut played = 0;
        while let Some(m) = self.next_playable(id).await {
            let (home, away) = score(&m);
            self.manager
                .enter_score(OWNER, id, m.id, home, away)
                .await
                .unwrap();
            played += 1;
        }
        played
    }
}
