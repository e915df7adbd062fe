//! SurrealDB implementation of the team-scoped Company repository.

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::company::{Company, CreateCompany, UpdateCompany};
use crm_core::repository::{PaginatedResult, Pagination, TeamScopedRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{self, CountRow, first_count, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CompanyRow {
    team_id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    address: Option<String>,
    industry: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CompanyRowWithId {
    record_id: String,
    team_id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    website: Option<String>,
    address: Option<String>,
    industry: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_company(self, id: Uuid) -> Result<Company, DbError> {
        Ok(Company {
            id,
            team_id: parse_uuid(&self.team_id, "team")?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            website: self.website,
            address: self.address,
            industry: self.industry,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl CompanyRowWithId {
    fn try_into_company(self) -> Result<Company, DbError> {
        Ok(Company {
            id: parse_uuid(&self.record_id, "company")?,
            team_id: parse_uuid(&self.team_id, "team")?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            website: self.website,
            address: self.address,
            industry: self.industry,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Company repository.
/// References cleared when a company is deleted.
const REFERRERS: &[(&str, &str)] = &[
    ("contact", "company_id"),
    ("deal", "company_id"),
    ("activity", "company_id"),
];

#[derive(Clone)]
pub struct SurrealCompanyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCompanyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TeamScopedRepository for SurrealCompanyRepository<C> {
    type Record = Company;
    type Create = CreateCompany;
    type Update = UpdateCompany;

    async fn create(&self, team_id: Uuid, input: CreateCompany) -> CrmResult<Company> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('company', $id) SET \
                 team_id = $team_id, name = $name, \
                 email = $email, phone = $phone, website = $website, \
                 address = $address, industry = $industry",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("phone", input.phone))
            .bind(("website", input.website))
            .bind(("address", input.address))
            .bind(("industry", input.industry))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("company", e))?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("company", &id_str))?;

        Ok(row.into_company(id)?)
    }

    async fn get_by_id(&self, team_id: Uuid, id: Uuid) -> CrmResult<Company> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('company', $id) \
                 WHERE team_id = $team_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("company", &id_str))?;

        Ok(row.into_company(id)?)
    }

    async fn update(&self, team_id: Uuid, id: Uuid, input: UpdateCompany) -> CrmResult<Company> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.website.is_some() {
            sets.push("website = $website");
        }
        if input.address.is_some() {
            sets.push("address = $address");
        }
        if input.industry.is_some() {
            sets.push("industry = $industry");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('company', $id) SET {} \
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
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(website) = input.website {
            builder = builder.bind(("website", website));
        }
        if let Some(address) = input.address {
            builder = builder.bind(("address", address));
        }
        if let Some(industry) = input.industry {
            builder = builder.bind(("industry", industry));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("company", e))?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("company", &id_str))?;

        Ok(row.into_company(id)?)
    }

    async fn delete(&self, team_id: Uuid, id: Uuid) -> CrmResult<()> {
        support::delete_in_team(&self.db, "company", team_id, &[id], REFERRERS).await?;
        Ok(())
    }

    async fn delete_many(&self, team_id: Uuid, ids: &[Uuid]) -> CrmResult<usize> {
        Ok(support::delete_in_team(&self.db, "company", team_id, ids, REFERRERS).await?)
    }

    async fn list(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> CrmResult<PaginatedResult<Company>> {
        let team_id_str = team_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM company \
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
                "SELECT meta::id(id) AS record_id, * FROM company \
                 WHERE team_id = $team_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("team_id", team_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CompanyRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_company())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn owner_of(&self, id: Uuid) -> CrmResult<Option<Uuid>> {
        Ok(support::owner_of(&self.db, "company", id).await?)
    }
}
