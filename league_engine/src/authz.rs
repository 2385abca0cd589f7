//! Tournament roles and permission checks.
//!
//! Identity lives outside this crate. An [`Authorizer`] answers which
//! administrative role, if any, a user holds on a tournament; the owner is
//! always treated as [`AdminRole::Owner`]. Users without a role act as
//! participants.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::{
    errors::{CompetitionError, CompetitionResult},
    tournament::{TournamentId, UserId},
};

/// Administrative role on a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Owner,
    Admin,
    /// May only start matches and record results
    Scorekeeper,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Scorekeeper => "scorekeeper",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "scorekeeper" => Some(Self::Scorekeeper),
            _ => None,
        }
    }
}

/// Role lookup
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn role(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
    ) -> CompetitionResult<Option<AdminRole>>;
}

/// Caller identity resolved for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub actor: UserId,
    pub role: Option<AdminRole>,
}

impl Access {
    pub fn new(actor: UserId, role: Option<AdminRole>) -> Self {
        Self { actor, role }
    }

    /// Caller without an administrative role
    pub fn participant(actor: UserId) -> Self {
        Self::new(actor, None)
    }

    /// Owner or admin
    pub fn is_organizer(&self) -> bool {
        matches!(self.role, Some(AdminRole::Owner | AdminRole::Admin))
    }

    /// Any administrative role may record results
    pub fn can_score(&self) -> bool {
        self.role.is_some()
    }

    fn deny(&self, tournament_id: TournamentId, action: &'static str) -> CompetitionError {
        CompetitionError::Unauthorized {
            user_id: self.actor,
            tournament_id,
            action,
        }
    }

    pub fn require_organizer(
        &self,
        tournament_id: TournamentId,
        action: &'static str,
    ) -> CompetitionResult<()> {
        if self.is_organizer() {
            Ok(())
        } else {
            Err(self.deny(tournament_id, action))
        }
    }

    pub fn require_scorer(
        &self,
        tournament_id: TournamentId,
        action: &'static str,
    ) -> CompetitionResult<()> {
        if self.can_score() {
            Ok(())
        } else {
            Err(self.deny(tournament_id, action))
        }
    }

    /// The caller acts on their own behalf, or is an organizer
    pub fn require_self_or_organizer(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
        action: &'static str,
    ) -> CompetitionResult<()> {
        if self.actor == user_id || self.is_organizer() {
            Ok(())
        } else {
            Err(self.deny(tournament_id, action))
        }
    }
}

/// In-memory role table
#[derive(Debug, Default)]
pub struct StaticAuthorizer {
    grants: RwLock<HashMap<(TournamentId, UserId), AdminRole>>,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, tournament_id: TournamentId, user_id: UserId, role: AdminRole) {
        self.grants
            .write()
            .await
            .insert((tournament_id, user_id), role);
    }

    pub async fn revoke(&self, tournament_id: TournamentId, user_id: UserId) {
        self.grants.write().await.remove(&(tournament_id, user_id));
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn role(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
    ) -> CompetitionResult<Option<AdminRole>> {
        Ok(self
            .grants
            .read()
            .await
            .get(&(tournament_id, user_id))
            .copied())
    }
}

/// Role lookup in the `tournament_roles` table
#[derive(Clone)]
pub struct PgAuthorizer {
    pool: Arc<PgPool>,
}

impl PgAuthorizer {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authorizer for PgAuthorizer {
    async fn role(
        &self,
        user_id: UserId,
        tournament_id: TournamentId,
    ) -> CompetitionResult<Option<AdminRole>> {
        let row = sqlx::query(
            "SELECT role FROM tournament_roles WHERE tournament_id = $1 AND user_id = $2",
        )
        .bind(tournament_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.and_then(|r| AdminRole::parse(r.get::<String, _>("role").as_str())))
    }
}
