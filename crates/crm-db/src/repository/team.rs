//! SurrealDB implementation of [`TeamRepository`].
//!
//! Memberships are `member_of` edges from `user` to `team`. Deleting a team
//! cascades, inside one transaction, to every record and role it owns.

use chrono::{DateTime, Utc};
use crm_core::error::{CrmError, CrmResult};
use crm_core::models::team::{CreateTeam, Team, UpdateTeam};
use crm_core::models::user::User;
use crm_core::repository::{PaginatedResult, Pagination, TeamRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::support::{CountRow, first_count, parse_uuid};
use super::user::UserRowWithId;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct TeamRow {
    owner_id: String,
    name: String,
    personal_team: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TeamRowWithId {
    record_id: String,
    owner_id: String,
    name: String,
    personal_team: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Membership edge projected to the team id and join time.
#[derive(Debug, SurrealValue)]
struct MembershipRow {
    team_id: String,
    #[allow(dead_code)]
    joined_at: DateTime<Utc>,
}

impl TeamRow {
    fn into_team(self, id: Uuid) -> Result<Team, DbError> {
        Ok(Team {
            id,
            owner_id: parse_uuid(&self.owner_id, "owner")?,
            name: self.name,
            personal_team: self.personal_team,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TeamRowWithId {
    fn try_into_team(self) -> Result<Team, DbError> {
        Ok(Team {
            id: parse_uuid(&self.record_id, "team")?,
            owner_id: parse_uuid(&self.owner_id, "owner")?,
            name: self.name,
            personal_team: self.personal_team,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Team repository.
#[derive(Clone)]
pub struct SurrealTeamRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTeamRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count(&self, query: &'static str, id: Uuid) -> Result<u64, DbError> {
        let mut result = self.db.query(query).bind(("id", id.to_string())).await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(first_count(rows))
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), DbError> {
        let total = self
            .count(
                "SELECT count() AS total FROM user \
                 WHERE id = type::record('user', $id) GROUP ALL",
                user_id,
            )
            .await?;
        if total == 0 {
            return Err(DbError::not_found("user", user_id));
        }
        Ok(())
    }

    async fn ensure_team(&self, team_id: Uuid) -> Result<(), DbError> {
        let total = self
            .count(
                "SELECT count() AS total FROM team \
                 WHERE id = type::record('team', $id) GROUP ALL",
                team_id,
            )
            .await?;
        if total == 0 {
            return Err(DbError::not_found("team", team_id));
        }
        Ok(())
    }
}

impl<C: Connection> TeamRepository for SurrealTeamRepository<C> {
    async fn create(&self, input: CreateTeam) -> CrmResult<Team> {
        self.ensure_user(input.owner_id).await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let owner_id_str = input.owner_id.to_string();

        // The team and the owner's membership are written together or not
        // at all. RELATE requires literal record-id syntax, so the UUIDs are
        // embedded directly.
        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('team', $id) SET \
             owner_id = $owner_id, name = $name, \
             personal_team = $personal_team; \
             RELATE user:`{owner_id_str}` -> member_of -> team:`{id_str}`; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .bind(("owner_id", owner_id_str))
            .bind(("name", input.name))
            .bind(("personal_team", input.personal_team))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("team", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> CrmResult<Team> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('team', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("team", &id_str))?;

        Ok(row.into_team(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateTeam) -> CrmResult<Team> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('team', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("team", e))?;

        let rows: Vec<TeamRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("team", &id_str))?;

        Ok(row.into_team(id)?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        self.ensure_team(id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE activity WHERE team_id = $team_id; \
                 DELETE deal WHERE team_id = $team_id; \
                 DELETE contact WHERE team_id = $team_id; \
                 DELETE company WHERE team_id = $team_id; \
                 DELETE grants WHERE in IN \
                     (SELECT VALUE id FROM role WHERE team_id = $team_id); \
                 DELETE has_role WHERE out IN \
                     (SELECT VALUE id FROM role WHERE team_id = $team_id); \
                 DELETE role WHERE team_id = $team_id; \
                 DELETE member_of WHERE out = type::record('team', $team_id); \
                 UPDATE user SET current_team_id = NONE \
                     WHERE current_team_id = $team_id; \
                 DELETE type::record('team', $team_id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("team_id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("team", e))?;

        info!(team_id = %id, "Team deleted with all owned records");

        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> CrmResult<Vec<Team>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(out) AS team_id, joined_at FROM member_of \
                 WHERE in = type::record('user', $user_id) \
                 ORDER BY joined_at ASC; \
                 SELECT meta::id(id) AS record_id, * FROM team \
                 WHERE id IN (\
                     SELECT VALUE out FROM member_of \
                     WHERE in = type::record('user', $user_id)\
                 );",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let memberships: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<TeamRowWithId> = result.take(1).map_err(DbError::from)?;

        let mut teams = rows
            .into_iter()
            .map(|row| row.try_into_team())
            .collect::<Result<Vec<_>, DbError>>()?;

        // Oldest membership first.
        let order: Vec<String> = memberships.into_iter().map(|m| m.team_id).collect();
        teams.sort_by_key(|team| {
            let id = team.id.to_string();
            order.iter().position(|t| *t == id).unwrap_or(usize::MAX)
        });

        Ok(teams)
    }

    async fn personal_team(&self, user_id: Uuid) -> CrmResult<Option<Team>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM team \
                 WHERE owner_id = $owner_id AND personal_team = true \
                 ORDER BY created_at ASC LIMIT 1",
            )
            .bind(("owner_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TeamRowWithId> = result.take(0).map_err(DbError::from)?;
        let team = rows
            .into_iter()
            .next()
            .map(|row| row.try_into_team())
            .transpose()?;

        Ok(team)
    }

    async fn add_member(&self, team_id: Uuid, user_id: Uuid) -> CrmResult<()> {
        self.ensure_team(team_id).await?;
        self.ensure_user(user_id).await?;

        if self.is_member(team_id, user_id).await? {
            return Err(CrmError::AlreadyExists {
                entity: "membership".into(),
            });
        }

        let query = format!("RELATE user:`{user_id}` -> member_of -> team:`{team_id}`;");

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("membership", e))?;

        Ok(())
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> CrmResult<()> {
        if !self.is_member(team_id, user_id).await? {
            return Err(DbError::not_found("membership", format!("{team_id}/{user_id}")).into());
        }

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE has_role WHERE in = type::record('user', $user_id) \
                     AND out IN (SELECT VALUE id FROM role WHERE team_id = $team_id); \
                 DELETE member_of WHERE in = type::record('user', $user_id) \
                     AND out = type::record('team', $team_id); \
                 UPDATE type::record('user', $user_id) SET current_team_id = NONE \
                     WHERE current_team_id = $team_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("membership", e))?;

        Ok(())
    }

    async fn is_member(&self, team_id: Uuid, user_id: Uuid) -> CrmResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM member_of \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('team', $team_id) GROUP ALL",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_count(rows) > 0)
    }

    async fn get_members(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> CrmResult<PaginatedResult<User>> {
        let team_id_str = team_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM member_of \
                 WHERE out = type::record('team', $team_id) GROUP ALL",
            )
            .bind(("team_id", team_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE id IN (\
                     SELECT VALUE in FROM member_of \
                     WHERE out = type::record('team', $team_id)\
                 ) \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("team_id", team_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
