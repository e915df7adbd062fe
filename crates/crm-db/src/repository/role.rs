//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::role::{CreateRole, Role, UpdateRole};
use crm_core::repository::{PaginatedResult, Pagination, RoleRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{CountRow, ensure_in_team, first_count, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    team_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    team_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Result<Role, DbError> {
        Ok(Role {
            id,
            team_id: parse_uuid(&self.team_id, "team")?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid(&self.record_id, "role")?,
            team_id: parse_uuid(&self.team_id, "team")?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> CrmResult<Role> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 team_id = $team_id, \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", input.team_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("role", e))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", &id_str))?;

        Ok(row.into_role(id)?)
    }

    async fn get_by_id(&self, team_id: Uuid, id: Uuid) -> CrmResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('role', $id) \
                 WHERE team_id = $team_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", &id_str))?;

        Ok(row.into_role(id)?)
    }

    async fn update(&self, team_id: Uuid, id: Uuid, input: UpdateRole) -> CrmResult<Role> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {} \
             WHERE team_id = $team_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("role", e))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", &id_str))?;

        Ok(row.into_role(id)?)
    }

    async fn delete(&self, team_id: Uuid, id: Uuid) -> CrmResult<()> {
        ensure_in_team(&self.db, "role", team_id, id).await?;

        let id_str = id.to_string();

        let query = format!(
            "BEGIN TRANSACTION; \
             DELETE has_role WHERE out = role:`{id_str}`; \
             DELETE grants WHERE in = role:`{id_str}`; \
             DELETE type::record('role', $id) WHERE team_id = $team_id; \
             COMMIT TRANSACTION;"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("role", e))?;

        Ok(())
    }

    async fn list(&self, team_id: Uuid, pagination: Pagination) -> CrmResult<PaginatedResult<Role>> {
        let team_id_str = team_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM role \
                 WHERE team_id = $team_id GROUP ALL",
            )
            .bind(("team_id", team_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE team_id = $team_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("team_id", team_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn assign_to_user(&self, team_id: Uuid, user_id: Uuid, role_id: Uuid) -> CrmResult<()> {
        ensure_in_team(&self.db, "role", team_id, role_id).await?;

        let query = format!("RELATE user:`{user_id}` -> has_role -> role:`{role_id}`;");

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("role assignment", e))?;

        Ok(())
    }

    async fn unassign_from_user(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CrmResult<()> {
        ensure_in_team(&self.db, "role", team_id, role_id).await?;

        self.db
            .query(
                "DELETE has_role WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('role', $role_id)",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("role assignment", e))?;

        Ok(())
    }

    async fn get_user_roles(&self, team_id: Uuid, user_id: Uuid) -> CrmResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE team_id = $team_id \
                 AND id IN (\
                     SELECT VALUE out FROM has_role \
                     WHERE in = type::record('user', $user_id)\
                 ) \
                 ORDER BY created_at ASC",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let roles = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(roles)
    }
}
