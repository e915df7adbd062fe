//! SurrealDB implementation of the team-scoped Contact repository.

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::contact::{Contact, CreateContact, UpdateContact};
use crm_core::repository::{PaginatedResult, Pagination, TeamScopedRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{
    self, CountRow, ensure_refs_in_team, first_count, parse_opt_uuid, parse_uuid,
};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ContactRow {
    team_id: String,
    company_id: Option<String>,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    position: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ContactRowWithId {
    record_id: String,
    team_id: String,
    company_id: Option<String>,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    position: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContactRow {
    fn into_contact(self, id: Uuid) -> Result<Contact, DbError> {
        Ok(Contact {
            id,
            team_id: parse_uuid(&self.team_id, "team")?,
            company_id: parse_opt_uuid(self.company_id, "company")?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            position: self.position,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ContactRowWithId {
    fn try_into_contact(self) -> Result<Contact, DbError> {
        Ok(Contact {
            id: parse_uuid(&self.record_id, "contact")?,
            team_id: parse_uuid(&self.team_id, "team")?,
            company_id: parse_opt_uuid(self.company_id, "company")?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            position: self.position,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Contact repository.
/// References cleared when a contact is deleted.
const REFERRERS: &[(&str, &str)] = &[("deal", "contact_id"), ("activity", "contact_id")];

#[derive(Clone)]
pub struct SurrealContactRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealContactRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TeamScopedRepository for SurrealContactRepository<C> {
    type Record = Contact;
    type Create = CreateContact;
    type Update = UpdateContact;

    async fn create(&self, team_id: Uuid, input: CreateContact) -> CrmResult<Contact> {
        ensure_refs_in_team(&self.db, team_id, &[("company", input.company_id)]).await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('contact', $id) SET \
                 team_id = $team_id, company_id = $company_id, \
                 first_name = $first_name, last_name = $last_name, \
                 email = $email, phone = $phone, position = $position",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .bind(("company_id", input.company_id.map(|c| c.to_string())))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("email", input.email))
            .bind(("phone", input.phone))
            .bind(("position", input.position))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("contact", e))?;

        let rows: Vec<ContactRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("contact", &id_str))?;

        Ok(row.into_contact(id)?)
    }

    async fn get_by_id(&self, team_id: Uuid, id: Uuid) -> CrmResult<Contact> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('contact', $id) \
                 WHERE team_id = $team_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ContactRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("contact", &id_str))?;

        Ok(row.into_contact(id)?)
    }

    async fn update(&self, team_id: Uuid, id: Uuid, input: UpdateContact) -> CrmResult<Contact> {
        ensure_refs_in_team(&self.db, team_id, &[("company", input.company_id.flatten())]).await?;

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.company_id.is_some() {
            sets.push("company_id = $company_id");
        }
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.position.is_some() {
            sets.push("position = $position");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('contact', $id) SET {} \
             WHERE team_id = $team_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()));

        if let Some(company_id) = input.company_id {
            builder = builder.bind(("company_id", company_id.map(|c| c.to_string())));
        }
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(position) = input.position {
            builder = builder.bind(("position", position));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("contact", e))?;

        let rows: Vec<ContactRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("contact", &id_str))?;

        Ok(row.into_contact(id)?)
    }

    async fn delete(&self, team_id: Uuid, id: Uuid) -> CrmResult<()> {
        support::delete_in_team(&self.db, "contact", team_id, &[id], REFERRERS).await?;
        Ok(())
    }

    async fn delete_many(&self, team_id: Uuid, ids: &[Uuid]) -> CrmResult<usize> {
        Ok(support::delete_in_team(&self.db, "contact", team_id, ids, REFERRERS).await?)
    }

    async fn list(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> CrmResult<PaginatedResult<Contact>> {
        let team_id_str = team_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM contact \
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
                "SELECT meta::id(id) AS record_id, * FROM contact \
                 WHERE team_id = $team_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("team_id", team_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ContactRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_contact())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn owner_of(&self, id: Uuid) -> CrmResult<Option<Uuid>> {
        Ok(support::owner_of(&self.db, "contact", id).await?)
    }
}
