//! SurrealDB implementation of the team-scoped Deal repository.

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::deal::{CreateDeal, Deal, DealStage, UpdateDeal};
use crm_core::repository::{PaginatedResult, Pagination, TeamScopedRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{
    self, CountRow, ensure_refs_in_team, first_count, parse_opt_uuid, parse_uuid,
};
use crate::error::DbError;

fn parse_stage(s: &str) -> Result<DealStage, DbError> {
    match s {
        "Prospecting" => Ok(DealStage::Prospecting),
        "Qualification" => Ok(DealStage::Qualification),
        "Proposal" => Ok(DealStage::Proposal),
        "Negotiation" => Ok(DealStage::Negotiation),
        "ClosedWon" => Ok(DealStage::ClosedWon),
        "ClosedLost" => Ok(DealStage::ClosedLost),
        other => Err(DbError::Decode(format!("unknown deal stage: {other}"))),
    }
}

fn stage_to_str(s: DealStage) -> &'static str {
    match s {
        DealStage::Prospecting => "Prospecting",
        DealStage::Qualification => "Qualification",
        DealStage::Proposal => "Proposal",
        DealStage::Negotiation => "Negotiation",
        DealStage::ClosedWon => "ClosedWon",
        DealStage::ClosedLost => "ClosedLost",
    }
}

#[derive(Debug, SurrealValue)]
struct DealRow {
    team_id: String,
    company_id: Option<String>,
    contact_id: Option<String>,
    title: String,
    amount_cents: i64,
    currency: String,
    stage: String,
    expected_close_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct DealRowWithId {
    record_id: String,
    team_id: String,
    company_id: Option<String>,
    contact_id: Option<String>,
    title: String,
    amount_cents: i64,
    currency: String,
    stage: String,
    expected_close_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DealRow {
    fn into_deal(self, id: Uuid) -> Result<Deal, DbError> {
        Ok(Deal {
            id,
            team_id: parse_uuid(&self.team_id, "team")?,
            company_id: parse_opt_uuid(self.company_id, "company")?,
            contact_id: parse_opt_uuid(self.contact_id, "contact")?,
            title: self.title,
            amount_cents: self.amount_cents,
            currency: self.currency,
            stage: parse_stage(&self.stage)?,
            expected_close_at: self.expected_close_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DealRowWithId {
    fn try_into_deal(self) -> Result<Deal, DbError> {
        let id = parse_uuid(&self.record_id, "deal")?;
        DealRow {
            team_id: self.team_id,
            company_id: self.company_id,
            contact_id: self.contact_id,
            title: self.title,
            amount_cents: self.amount_cents,
            currency: self.currency,
            stage: self.stage,
            expected_close_at: self.expected_close_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_deal(id)
    }
}

/// SurrealDB implementation of the Deal repository.
const REFERRERS: &[(&str, &str)] = &[("activity", "deal_id")];

#[derive(Clone)]
pub struct SurrealDealRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDealRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TeamScopedRepository for SurrealDealRepository<C> {
    type Record = Deal;
    type Create = CreateDeal;
    type Update = UpdateDeal;

    async fn create(&self, team_id: Uuid, input: CreateDeal) -> CrmResult<Deal> {
        ensure_refs_in_team(
            &self.db,
            team_id,
            &[("company", input.company_id), ("contact", input.contact_id)],
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('deal', $id) SET \
                 team_id = $team_id, \
                 company_id = $company_id, contact_id = $contact_id, \
                 title = $title, amount_cents = $amount_cents, \
                 currency = $currency, stage = $stage, \
                 expected_close_at = $expected_close_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .bind(("company_id", input.company_id.map(|c| c.to_string())))
            .bind(("contact_id", input.contact_id.map(|c| c.to_string())))
            .bind(("title", input.title))
            .bind(("amount_cents", input.amount_cents))
            .bind(("currency", input.currency))
            .bind(("stage", stage_to_str(input.stage)))
            .bind(("expected_close_at", input.expected_close_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("deal", e))?;

        let rows: Vec<DealRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("deal", &id_str))?;

        Ok(row.into_deal(id)?)
    }

    async fn get_by_id(&self, team_id: Uuid, id: Uuid) -> CrmResult<Deal> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('deal', $id) \
                 WHERE team_id = $team_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DealRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("deal", &id_str))?;

        Ok(row.into_deal(id)?)
    }

    async fn update(&self, team_id: Uuid, id: Uuid, input: UpdateDeal) -> CrmResult<Deal> {
        ensure_refs_in_team(
            &self.db,
            team_id,
            &[
                ("company", input.company_id.flatten()),
                ("contact", input.contact_id.flatten()),
            ],
        )
        .await?;

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.company_id.is_some() {
            sets.push("company_id = $company_id");
        }
        if input.contact_id.is_some() {
            sets.push("contact_id = $contact_id");
        }
        if input.title.is_some() {
            sets.push("title = $title");
        }
        if input.amount_cents.is_some() {
            sets.push("amount_cents = $amount_cents");
        }
        if input.currency.is_some() {
            sets.push("currency = $currency");
        }
        if input.stage.is_some() {
            sets.push("stage = $stage");
        }
        if input.expected_close_at.is_some() {
            sets.push("expected_close_at = $expected_close_at");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('deal', $id) SET {} \
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
        if let Some(contact_id) = input.contact_id {
            builder = builder.bind(("contact_id", contact_id.map(|c| c.to_string())));
        }
        if let Some(title) = input.title {
            builder = builder.bind(("title", title));
        }
        if let Some(amount_cents) = input.amount_cents {
            builder = builder.bind(("amount_cents", amount_cents));
        }
        if let Some(currency) = input.currency {
            builder = builder.bind(("currency", currency));
        }
        if let Some(stage) = input.stage {
            builder = builder.bind(("stage", stage_to_str(stage)));
        }
        if let Some(expected_close_at) = input.expected_close_at {
            builder = builder.bind(("expected_close_at", expected_close_at));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("deal", e))?;

        let rows: Vec<DealRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("deal", &id_str))?;

        Ok(row.into_deal(id)?)
    }

    async fn delete(&self, team_id: Uuid, id: Uuid) -> CrmResult<()> {
        support::delete_in_team(&self.db, "deal", team_id, &[id], REFERRERS).await?;
        Ok(())
    }

    async fn delete_many(&self, team_id: Uuid, ids: &[Uuid]) -> CrmResult<usize> {
        Ok(support::delete_in_team(&self.db, "deal", team_id, ids, REFERRERS).await?)
    }

    async fn list(&self, team_id: Uuid, pagination: Pagination) -> CrmResult<PaginatedResult<Deal>> {
        let team_id_str = team_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM deal \
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
                "SELECT meta::id(id) AS record_id, * FROM deal \
                 WHERE team_id = $team_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("team_id", team_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DealRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_deal())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn owner_of(&self, id: Uuid) -> CrmResult<Option<Uuid>> {
        Ok(support::owner_of(&self.db, "deal", id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_strings_match_schema_assertion() {
        for stage in [
            DealStage::Prospecting,
            DealStage::Qualification,
            DealStage::Proposal,
            DealStage::Negotiation,
            DealStage::ClosedWon,
            DealStage::ClosedLost,
        ] {
            let name = stage_to_str(stage);
            assert!(crate::schema_v1().contains(&format!("'{name}'")));
            assert_eq!(parse_stage(name).unwrap(), stage);
        }
        assert!(parse_stage("Won").is_err());
    }
}
