//! In-memory `CompetitionRepository`, used by tests and the `memory` backend.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::CompetitionRepository;
use crate::{
    competition::Competition,
    errors::{CompetitionError, CompetitionResult},
    tournament::{Tournament, TournamentId, TournamentStatus},
};

/// Aggregates held in a map, with the same version check as the database
#[derive(Debug, Default)]
pub struct MemoryRepository {
    competitions: RwLock<HashMap<TournamentId, Competition>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.competitions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.competitions.read().await.is_empty()
    }
}

#[async_trait]
impl CompetitionRepository for MemoryRepository {
    async fn create(&self, competition: &Competition) -> CompetitionResult<()> {
        let mut competitions = self.competitions.write().await;
        let id = competition.tournament.id;
        if competitions.contains_key(&id) {
            return Err(CompetitionError::ConcurrentModification(id));
        }
        competitions.insert(id, competition.clone());
        Ok(())
    }

    async fn load(&self, tournament_id: TournamentId) -> CompetitionResult<Competition> {
        self.competitions
            .read()
            .await
            .get(&tournament_id)
            .cloned()
            .ok_or(CompetitionError::TournamentNotFound(tournament_id))
    }

    async fn save(&self, competition: &Competition, expected_version: i64) -> CompetitionResult<()> {
        let mut competitions = self.competitions.write().await;
        let id = competition.tournament.id;
        let stored = competitions
            .get_mut(&id)
            .ok_or(CompetitionError::TournamentNotFound(id))?;
        if stored.tournament.version != expected_version {
            return Err(CompetitionError::ConcurrentModification(id));
        }
        *stored = competition.clone();
        Ok(())
    }

    async fn list(&self, status: Option<TournamentStatus>) -> CompetitionResult<Vec<Tournament>> {
        let mut tournaments: Vec<Tournament> = self
            .competitions
            .read()
            .await
            .values()
            .map(|c| c.tournament.clone())
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect();
        tournaments.sort_by_key(|t| (t.created_at, t.id));
        Ok(tournaments)
    }
}
