//! SurrealDB implementation of [`UserRepository`].
//!
//! Plaintext passwords are hashed through [`Passwords`] before they reach
//! the database. A pepper, if any, is fixed at construction time.

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::user::{CreateUser, UpdateUser, User};
use crm_core::password::Passwords;
use crm_core::repository::{PaginatedResult, Pagination, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{CountRow, first_count, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    name: String,
    email: String,
    password_hash: String,
    is_super_admin: bool,
    current_team_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(crate) struct UserRowWithId {
    record_id: String,
    name: String,
    email: String,
    password_hash: String,
    is_super_admin: bool,
    current_team_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            is_super_admin: self.is_super_admin,
            current_team_id: parse_opt_uuid(self.current_team_id, "team")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    pub(crate) fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            is_super_admin: self.is_super_admin,
            current_team_id: parse_opt_uuid(self.current_team_id, "team")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    passwords: Passwords,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            passwords: Passwords::default(),
        }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: Option<String>) -> Self {
        Self {
            db,
            passwords: Passwords::new(pepper),
        }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<User, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        row.into_user(id)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> CrmResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let password_hash = self.passwords.hash(&input.password)?;

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 name = $name, email = $email, \
                 password_hash = $password_hash, \
                 is_super_admin = $is_super_admin, \
                 current_team_id = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("is_super_admin", input.is_super_admin))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CrmResult<User> {
        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_email(&self, email: &str) -> CrmResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE email = $email",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("email={email}")))?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> CrmResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.is_super_admin.is_some() {
            sets.push("is_super_admin = $is_super_admin");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('user', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(is_super_admin) = input.is_super_admin {
            builder = builder.bind(("is_super_admin", is_super_admin));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn set_current_team(&self, id: Uuid, team_id: Option<Uuid>) -> CrmResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 current_team_id = $team_id, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.map(|t| t.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", &id_str))?;

        Ok(row.into_user(id)?)
    }

    async fn delete(&self, id: Uuid) -> CrmResult<()> {
        let id_str = id.to_string();

        // Drop the user's edges first, then the user record.
        let query = format!(
            "DELETE member_of WHERE in = user:`{id_str}`; \
             DELETE has_role WHERE in = user:`{id_str}`; \
             DELETE type::record('user', $id);"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("user", e))?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> CrmResult<PaginatedResult<User>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM user GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
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
