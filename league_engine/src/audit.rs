//! Append-only audit trail.
//!
//! Every committed mutation produces one or more [`AuditLogEntry`] records.
//! Domain code only builds [`AuditDraft`]s; the manager stamps actor,
//! tournament and time onto them after the commit and hands them to an
//! [`AuditSink`]. The core never reads the trail back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    errors::CompetitionResult,
    tournament::{TournamentId, UserId},
};

/// Kind of entity an audit entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tournament,
    Team,
    Registration,
    Match,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tournament => "tournament",
            Self::Team => "team",
            Self::Registration => "registration",
            Self::Match => "match",
        }
    }
}

/// Audit record before actor, tournament and time are known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDraft {
    pub action: String,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl AuditDraft {
    pub fn new(action: impl Into<String>, entity_kind: EntityKind, entity_id: Uuid) -> Self {
        Self {
            action: action.into(),
            entity_kind,
            entity_id,
            before: None,
            after: None,
        }
    }

    /// Attach the entity state prior to the change
    pub fn before<T: Serialize>(mut self, value: &T) -> CompetitionResult<Self> {
        self.before = Some(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Attach the entity state after the change
    pub fn after<T: Serialize>(mut self, value: &T) -> CompetitionResult<Self> {
        self.after = Some(serde_json::to_value(value)?);
        Ok(self)
    }
}

/// Persisted audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor: UserId,
    pub action: String,
    pub tournament_id: TournamentId,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn from_draft(
        draft: AuditDraft,
        actor: UserId,
        tournament_id: TournamentId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor,
            action: draft.action,
            tournament_id,
            entity_kind: draft.entity_kind,
            entity_id: draft.entity_id,
            before: draft.before,
            after: draft.after,
            timestamp,
        }
    }
}

/// Write-only destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append entries in order
    async fn append(&self, entries: &[AuditLogEntry]) -> CompetitionResult<()>;
}

/// Audit sink that keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().await.clone()
    }

    /// Entries whose action matches `action`
    pub async fn with_action(&self, action: &str) -> Vec<AuditLogEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entries: &[AuditLogEntry]) -> CompetitionResult<()> {
        self.entries.lock().await.extend_from_slice(entries);
        Ok(())
    }
}

/// Audit sink backed by the `audit_log` table
#[derive(Clone)]
pub struct PgAuditSink {
    pool: Arc<PgPool>,
}

impl PgAuditSink {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, entries: &[AuditLogEntry]) -> CompetitionResult<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO audit_log (id, actor_user_id, action, tournament_id, entity_kind, entity_id, before_state, after_state, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(entry.id)
            .bind(entry.actor)
            .bind(&entry.action)
            .bind(entry.tournament_id)
            .bind(entry.entity_kind.as_str())
            .bind(entry.entity_id)
            .bind(&entry.before)
            .bind(&entry.after)
            .bind(entry.timestamp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_captures_states() {
        let id = Uuid::new_v4();
        let draft = AuditDraft::new("team.create", EntityKind::Team, id)
            .after(&serde_json::json!({"name": "Rovers"}))
            .unwrap();
        assert!(draft.before.is_none());
        assert_eq!(draft.after.unwrap()["name"], "Rovers");
    }

    #[tokio::test]
    async fn test_memory_sink_appends_in_order() {
        let sink = MemoryAuditSink::new();
        let tournament_id = Uuid::new_v4();
        let now = Utc::now();
        let entries: Vec<AuditLogEntry> = ["tournament.publish", "tournament.close_registration"]
            .into_iter()
            .map(|action| {
                AuditLogEntry::from_draft(
                    AuditDraft::new(action, EntityKind::Tournament, tournament_id),
                    7,
                    tournament_id,
                    now,
                )
            })
            .collect();

        sink.append(&entries).await.unwrap();

        let stored = sink.entries().await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].action, "tournament.publish");
        assert_eq!(stored[1].actor, 7);
        assert_eq!(sink.with_action("tournament.publish").await.len(), 1);
    }
}
