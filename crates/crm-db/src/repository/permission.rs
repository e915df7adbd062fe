//! SurrealDB implementation of [`PermissionRepository`].
//!
//! Permissions form one global catalog keyed by ability name. They reach a
//! user only through `grants` edges on roles the user holds in a team.

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::permission::{CreatePermission, Permission};
use crm_core::repository::{PaginatedResult, Pagination, PermissionRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{CountRow, ensure_in_team, first_count, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid(&self.record_id, "permission")?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn ensure_exists(&self, id: Uuid) -> Result<(), DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM permission \
                 WHERE id = type::record('permission', $id) GROUP ALL",
            )
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        if first_count(rows) == 0 {
            return Err(DbError::not_found("permission", id));
        }
        Ok(())
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> CrmResult<Permission> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("permission", e))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission", &id_str))?;

        Ok(Permission {
            id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        })
    }

    async fn get_by_name(&self, name: &str) -> CrmResult<Permission> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission", format!("name={name}")))?;

        Ok(row.try_into_permission()?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        self.ensure_exists(id).await?;

        let id_str = id.to_string();
        let query = format!(
            "DELETE grants WHERE out = permission:`{id_str}`; \
             DELETE type::record('permission', $id);"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("permission", e))?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> CrmResult<PaginatedResult<Permission>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM permission GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn grant_to_role(
        &self,
        team_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> CrmResult<()> {
        ensure_in_team(&self.db, "role", team_id, role_id).await?;
        self.ensure_exists(permission_id).await?;

        let query = format!("RELATE role:`{role_id}` -> grants -> permission:`{permission_id}`;");

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("grant", e))?;

        Ok(())
    }

    async fn revoke_from_role(
        &self,
        team_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> CrmResult<()> {
        ensure_in_team(&self.db, "role", team_id, role_id).await?;

        self.db
            .query(
                "DELETE grants WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $permission_id)",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("permission_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("grant", e))?;

        Ok(())
    }

    async fn get_role_permissions(
        &self,
        team_id: Uuid,
        role_id: Uuid,
    ) -> CrmResult<Vec<Permission>> {
        ensure_in_team(&self.db, "role", team_id, role_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let permissions = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(permissions)
    }

    async fn get_user_permission_names(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> CrmResult<Vec<String>> {
        // user -> has_role -> role (in this team only) -> grants -> permission
        let mut result = self
            .db
            .query(
                "SELECT VALUE name FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in IN (\
                         SELECT VALUE id FROM role \
                         WHERE team_id = $team_id \
                         AND id IN (\
                             SELECT VALUE out FROM has_role \
                             WHERE in = type::record('user', $user_id)\
                         )\
                     )\
                 )",
            )
            .bind(("team_id", team_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut names: Vec<String> = result.take(0).map_err(DbError::from)?;
        names.sort();
        names.dedup();

        Ok(names)
    }
}
