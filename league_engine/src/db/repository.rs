//! Repository trait for the competition aggregate and its PostgreSQL
//! implementation.
//!
//! The aggregate is committed as one unit: tournament row, teams,
//! registrations and matches inside a single transaction, conditional on the
//! version the caller loaded. Match forward pointers are stored with the
//! matches so the bracket survives restarts without being regenerated.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    bracket::{BracketSide, Match, MatchStatus, Slot, SlotRef},
    competition::Competition,
    errors::{CompetitionError, CompetitionResult},
    roster::{PaymentState, Registration, RegistrationStatus, Team, TeamRecord, TeamStatus},
    tournament::{Tournament, TournamentId, TournamentStatus},
};

/// Transactional storage for [`Competition`] aggregates
#[async_trait]
pub trait CompetitionRepository: Send + Sync {
    /// Store a new aggregate
    async fn create(&self, competition: &Competition) -> CompetitionResult<()>;

    /// Load an aggregate, failing with `TournamentNotFound`
    async fn load(&self, tournament_id: TournamentId) -> CompetitionResult<Competition>;

    /// Commit an aggregate whose stored version is still `expected_version`
    ///
    /// `competition.tournament.version` carries the new version. A stale
    /// `expected_version` fails with `ConcurrentModification` and leaves the
    /// store untouched.
    async fn save(&self, competition: &Competition, expected_version: i64) -> CompetitionResult<()>;

    /// Tournaments, optionally filtered by status, oldest first
    async fn list(&self, status: Option<TournamentStatus>) -> CompetitionResult<Vec<Tournament>>;
}

fn decode_error(column: &str, value: &str) -> CompetitionError {
    CompetitionError::Database(sqlx::Error::Decode(
        format!("invalid {column}: {value:?}").into(),
    ))
}

/// Map a unique violation to a lost optimistic-concurrency race
fn conflict(err: sqlx::Error, tournament_id: TournamentId) -> CompetitionError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return CompetitionError::ConcurrentModification(tournament_id);
        }
    }
    CompetitionError::Database(err)
}

/// Counters are `INTEGER` columns; negative values never come from this crate
fn to_u32(value: i32, column: &str) -> CompetitionResult<u32> {
    u32::try_from(value).map_err(|_| decode_error(column, &value.to_string()))
}

fn opt_u32(value: Option<i32>, column: &str) -> CompetitionResult<Option<u32>> {
    value.map(|v| to_u32(v, column)).transpose()
}

fn to_i32(value: u32, column: &str) -> Result<i32, sqlx::Error> {
    i32::try_from(value)
        .map_err(|_| sqlx::Error::Encode(format!("{column} out of range: {value}").into()))
}

fn opt_i32(value: Option<u32>, column: &str) -> Result<Option<i32>, sqlx::Error> {
    value.map(|v| to_i32(v, column)).transpose()
}

/// Default PostgreSQL implementation of `CompetitionRepository`
#[derive(Clone)]
pub struct PgCompetitionRepository {
    pool: Arc<PgPool>,
}

impl PgCompetitionRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn tournament_from_row(row: &PgRow) -> CompetitionResult<Tournament> {
        let status: String = row.get("status");
        let postponed_from: Option<String> = row.get("postponed_from");
        Ok(Tournament {
            id: row.get("id"),
            owner_id: row.get("owner_user_id"),
            config: serde_json::from_value(row.get("config"))?,
            status: TournamentStatus::parse(&status).ok_or_else(|| decode_error("status", &status))?,
            postponed_from: match postponed_from {
                Some(value) => Some(
                    TournamentStatus::parse(&value)
                        .ok_or_else(|| decode_error("postponed_from", &value))?,
                ),
                None => None,
            },
            version: row.get("version"),
            created_at: row.get("created_at"),
            published_at: row.get("published_at"),
            registration_closed_at: row.get("registration_closed_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
            cancelled_at: row.get("cancelled_at"),
            postponed_at: row.get("postponed_at"),
        })
    }

    fn team_from_row(row: &PgRow) -> CompetitionResult<Team> {
        let status: String = row.get("status");
        Ok(Team {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            name: row.get("name"),
            captain_user_id: row.get("captain_user_id"),
            sequence: to_u32(row.get("sequence"), "sequence")?,
            seed: opt_u32(row.get("seed"), "seed")?,
            record: TeamRecord {
                wins: to_u32(row.get("wins"), "wins")?,
                losses: to_u32(row.get("losses"), "losses")?,
                ties: to_u32(row.get("ties"), "ties")?,
                points: row.get("points"),
                goals_for: to_u32(row.get("goals_for"), "goals_for")?,
                goals_against: to_u32(row.get("goals_against"), "goals_against")?,
            },
            status: TeamStatus::parse(&status).ok_or_else(|| decode_error("team status", &status))?,
            waitlist_position: opt_u32(row.get("waitlist_position"), "waitlist_position")?,
            final_placement: opt_u32(row.get("final_placement"), "final_placement")?,
            placement_manual: row.get("placement_manual"),
            created_at: row.get("created_at"),
        })
    }

    fn registration_from_row(row: &PgRow) -> CompetitionResult<Registration> {
        let status: String = row.get("status");
        Ok(Registration {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            user_id: row.get("user_id"),
            team_id: row.get("team_id"),
            status: RegistrationStatus::parse(&status)
                .ok_or_else(|| decode_error("registration status", &status))?,
            skill_tier: row
                .get::<Option<i16>, _>("skill_tier")
                .map(|v| u8::try_from(v).map_err(|_| decode_error("skill_tier", &v.to_string())))
                .transpose()?,
            sequence: to_u32(row.get("sequence"), "sequence")?,
            waitlist_position: opt_u32(row.get("waitlist_position"), "waitlist_position")?,
            payment_state: PaymentState(row.get("payment_state")),
            registered_at: row.get("registered_at"),
        })
    }

    fn slot_ref(match_id: Option<Uuid>, slot: Option<String>) -> CompetitionResult<Option<SlotRef>> {
        match (match_id, slot) {
            (Some(match_id), Some(slot)) => Ok(Some(SlotRef {
                match_id,
                slot: Slot::parse(&slot).ok_or_else(|| decode_error("slot", &slot))?,
            })),
            _ => Ok(None),
        }
    }

    fn match_from_row(row: &PgRow) -> CompetitionResult<Match> {
        let bracket: String = row.get("bracket");
        let status: String = row.get("status");
        Ok(Match {
            id: row.get("id"),
            tournament_id: row.get("tournament_id"),
            bracket: BracketSide::parse(&bracket).ok_or_else(|| decode_error("bracket", &bracket))?,
            round: to_u32(row.get("round"), "round")?,
            match_number: to_u32(row.get("match_number"), "match_number")?,
            home_team_id: row.get("home_team_id"),
            away_team_id: row.get("away_team_id"),
            home_score: opt_u32(row.get("home_score"), "home_score")?,
            away_score: opt_u32(row.get("away_score"), "away_score")?,
            winner_team_id: row.get("winner_team_id"),
            loser_team_id: row.get("loser_team_id"),
            status: MatchStatus::parse(&status).ok_or_else(|| decode_error("match status", &status))?,
            next: Self::slot_ref(row.get("next_match_id"), row.get("next_slot"))?,
            loser_next: Self::slot_ref(row.get("loser_next_match_id"), row.get("loser_next_slot"))?,
            completed_at: row.get("completed_at"),
        })
    }

    async fn write_children(
        tx: &mut Transaction<'_, Postgres>,
        competition: &Competition,
    ) -> Result<(), sqlx::Error> {
        for team in &competition.teams {
            sqlx::query(
                r#"
                INSERT INTO teams (id, tournament_id, name, captain_user_id, sequence, seed,
                                   wins, losses, ties, points, goals_for, goals_against,
                                   status, waitlist_position, final_placement, placement_manual, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    captain_user_id = EXCLUDED.captain_user_id,
                    seed = EXCLUDED.seed,
                    wins = EXCLUDED.wins,
                    losses = EXCLUDED.losses,
                    ties = EXCLUDED.ties,
                    points = EXCLUDED.points,
                    goals_for = EXCLUDED.goals_for,
                    goals_against = EXCLUDED.goals_against,
                    status = EXCLUDED.status,
                    waitlist_position = EXCLUDED.waitlist_position,
                    final_placement = EXCLUDED.final_placement,
                    placement_manual = EXCLUDED.placement_manual
                "#,
            )
            .bind(team.id)
            .bind(team.tournament_id)
            .bind(&team.name)
            .bind(team.captain_user_id)
            .bind(to_i32(team.sequence, "sequence")?)
            .bind(opt_i32(team.seed, "seed")?)
            .bind(to_i32(team.record.wins, "wins")?)
            .bind(to_i32(team.record.losses, "losses")?)
            .bind(to_i32(team.record.ties, "ties")?)
            .bind(team.record.points)
            .bind(to_i32(team.record.goals_for, "goals_for")?)
            .bind(to_i32(team.record.goals_against, "goals_against")?)
            .bind(team.status.as_str())
            .bind(opt_i32(team.waitlist_position, "waitlist_position")?)
            .bind(opt_i32(team.final_placement, "final_placement")?)
            .bind(team.placement_manual)
            .bind(team.created_at)
            .execute(&mut **tx)
            .await?;
        }

        for registration in &competition.registrations {
            sqlx::query(
                r#"
                INSERT INTO registrations (id, tournament_id, user_id, team_id, status, skill_tier,
                                           sequence, waitlist_position, payment_state, registered_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO UPDATE SET
                    team_id = EXCLUDED.team_id,
                    status = EXCLUDED.status,
                    skill_tier = EXCLUDED.skill_tier,
                    waitlist_position = EXCLUDED.waitlist_position,
                    payment_state = EXCLUDED.payment_state
                "#,
            )
            .bind(registration.id)
            .bind(registration.tournament_id)
            .bind(registration.user_id)
            .bind(registration.team_id)
            .bind(registration.status.as_str())
            .bind(registration.skill_tier.map(i16::from))
            .bind(to_i32(registration.sequence, "sequence")?)
            .bind(opt_i32(registration.waitlist_position, "waitlist_position")?)
            .bind(&registration.payment_state.0)
            .bind(registration.registered_at)
            .execute(&mut **tx)
            .await?;
        }

        // Voided reset finals disappear from the aggregate
        let match_ids: Vec<Uuid> = competition.matches.iter().map(|m| m.id).collect();
        sqlx::query("DELETE FROM matches WHERE tournament_id = $1 AND NOT (id = ANY($2))")
            .bind(competition.tournament.id)
            .bind(&match_ids)
            .execute(&mut **tx)
            .await?;

        for m in &competition.matches {
            sqlx::query(
                r#"
                INSERT INTO matches (id, tournament_id, bracket, round, match_number,
                                     home_team_id, away_team_id, home_score, away_score,
                                     winner_team_id, loser_team_id, status,
                                     next_match_id, next_slot, loser_next_match_id, loser_next_slot, completed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                ON CONFLICT (id) DO UPDATE SET
                    home_team_id = EXCLUDED.home_team_id,
                    away_team_id = EXCLUDED.away_team_id,
                    home_score = EXCLUDED.home_score,
                    away_score = EXCLUDED.away_score,
                    winner_team_id = EXCLUDED.winner_team_id,
                    loser_team_id = EXCLUDED.loser_team_id,
                    status = EXCLUDED.status,
                    next_match_id = EXCLUDED.next_match_id,
                    next_slot = EXCLUDED.next_slot,
                    loser_next_match_id = EXCLUDED.loser_next_match_id,
                    loser_next_slot = EXCLUDED.loser_next_slot,
                    completed_at = EXCLUDED.completed_at
                "#,
            )
            .bind(m.id)
            .bind(m.tournament_id)
            .bind(m.bracket.as_str())
            .bind(to_i32(m.round, "round")?)
            .bind(to_i32(m.match_number, "match_number")?)
            .bind(m.home_team_id)
            .bind(m.away_team_id)
            .bind(opt_i32(m.home_score, "home_score")?)
            .bind(opt_i32(m.away_score, "away_score")?)
            .bind(m.winner_team_id)
            .bind(m.loser_team_id)
            .bind(m.status.as_str())
            .bind(m.next.map(|p| p.match_id))
            .bind(m.next.map(|p| p.slot.as_str()))
            .bind(m.loser_next.map(|p| p.match_id))
            .bind(m.loser_next.map(|p| p.slot.as_str()))
            .bind(m.completed_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

const TOURNAMENT_COLUMNS: &str = "id, owner_user_id, status, postponed_from, config, version, created_at, \
     published_at, registration_closed_at, started_at, completed_at, cancelled_at, postponed_at";

#[async_trait]
impl CompetitionRepository for PgCompetitionRepository {
    async fn create(&self, competition: &Competition) -> CompetitionResult<()> {
        let t = &competition.tournament;
        let config_json = serde_json::to_value(&t.config)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO tournaments (id, owner_user_id, name, format, status, postponed_from, config, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(t.id)
        .bind(t.owner_id)
        .bind(&t.config.name)
        .bind(t.config.format.as_str())
        .bind(t.status.as_str())
        .bind(t.postponed_from.map(|s| s.as_str()))
        .bind(config_json)
        .bind(t.version)
        .bind(t.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict(e, t.id))?;

        Self::write_children(&mut tx, competition)
            .await
            .map_err(|e| conflict(e, t.id))?;
        tx.commit().await?;
        Ok(())
    }

    async fn load(&self, tournament_id: TournamentId) -> CompetitionResult<Competition> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(CompetitionError::TournamentNotFound(tournament_id))?;
        let tournament = Self::tournament_from_row(&row)?;

        let teams = sqlx::query(
            "SELECT id, tournament_id, name, captain_user_id, sequence, seed, wins, losses, ties, points,
                    goals_for, goals_against, status, waitlist_position, final_placement, placement_manual, created_at
             FROM teams WHERE tournament_id = $1 ORDER BY sequence",
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?
        .iter()
        .map(Self::team_from_row)
        .collect::<CompetitionResult<Vec<_>>>()?;

        let registrations = sqlx::query(
            "SELECT id, tournament_id, user_id, team_id, status, skill_tier, sequence, waitlist_position,
                    payment_state, registered_at
             FROM registrations WHERE tournament_id = $1 ORDER BY sequence",
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?
        .iter()
        .map(Self::registration_from_row)
        .collect::<CompetitionResult<Vec<_>>>()?;

        let mut matches = sqlx::query(
            "SELECT id, tournament_id, bracket, round, match_number, home_team_id, away_team_id,
                    home_score, away_score, winner_team_id, loser_team_id, status,
                    next_match_id, next_slot, loser_next_match_id, loser_next_slot, completed_at
             FROM matches WHERE tournament_id = $1",
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?
        .iter()
        .map(Self::match_from_row)
        .collect::<CompetitionResult<Vec<_>>>()?;
        matches.sort_by_key(Match::order_key);

        Ok(Competition {
            tournament,
            teams,
            registrations,
            matches,
        })
    }

    async fn save(&self, competition: &Competition, expected_version: i64) -> CompetitionResult<()> {
        let t = &competition.tournament;
        let config_json = serde_json::to_value(&t.config)?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE tournaments
            SET name = $3, status = $4, postponed_from = $5, config = $6, version = $7,
                published_at = $8, registration_closed_at = $9, started_at = $10,
                completed_at = $11, cancelled_at = $12, postponed_at = $13, updated_at = NOW()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(t.id)
        .bind(expected_version)
        .bind(&t.config.name)
        .bind(t.status.as_str())
        .bind(t.postponed_from.map(|s| s.as_str()))
        .bind(config_json)
        .bind(t.version)
        .bind(t.published_at)
        .bind(t.registration_closed_at)
        .bind(t.started_at)
        .bind(t.completed_at)
        .bind(t.cancelled_at)
        .bind(t.postponed_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM tournaments WHERE id = $1")
                .bind(t.id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            return Err(if exists {
                CompetitionError::ConcurrentModification(t.id)
            } else {
                CompetitionError::TournamentNotFound(t.id)
            });
        }

        Self::write_children(&mut tx, competition)
            .await
            .map_err(|e| conflict(e, t.id))?;
        tx.commit().await.map_err(|e| conflict(e, t.id))?;
        Ok(())
    }

    async fn list(&self, status: Option<TournamentStatus>) -> CompetitionResult<Vec<Tournament>> {
        let rows = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE $1::TEXT IS NULL OR status = $1
             ORDER BY created_at"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(Self::tournament_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_columns_reject_out_of_range_values() {
        assert_eq!(to_i32(9_999, "home_score").unwrap(), 9_999);
        assert!(matches!(to_i32(u32::MAX, "goals_for"), Err(sqlx::Error::Encode(_))));
        assert!(opt_i32(Some(i32::MAX as u32 + 1), "away_score").is_err());
        assert_eq!(opt_i32(None, "away_score").unwrap(), None);

        assert_eq!(to_u32(7, "wins").unwrap(), 7);
        assert!(matches!(
            to_u32(-1, "goals_against"),
            Err(CompetitionError::Database(sqlx::Error::Decode(_)))
        ));
        assert!(opt_u32(Some(-5), "seed").is_err());
    }
}
