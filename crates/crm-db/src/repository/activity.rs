//! SurrealDB implementation of the team-scoped Activity repository.

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::activity::{Activity, ActivityKind, CreateActivity, UpdateActivity};
use crm_core::repository::{PaginatedResult, Pagination, TeamScopedRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{
    self, CountRow, ensure_refs_in_team, first_count, parse_opt_uuid, parse_uuid,
};
use crate::error::DbError;

fn parse_kind(s: &str) -> Result<ActivityKind, DbError> {
    match s {
        "Call" => Ok(ActivityKind::Call),
        "Email" => Ok(ActivityKind::Email),
        "Meeting" => Ok(ActivityKind::Meeting),
        "Task" => Ok(ActivityKind::Task),
        "Note" => Ok(ActivityKind::Note),
        other => Err(DbError::Decode(format!("unknown activity kind: {other}"))),
    }
}

fn kind_to_str(k: ActivityKind) -> &'static str {
    match k {
        ActivityKind::Call => "Call",
        ActivityKind::Email => "Email",
        ActivityKind::Meeting => "Meeting",
        ActivityKind::Task => "Task",
        ActivityKind::Note => "Note",
    }
}

#[derive(Debug, SurrealValue)]
struct ActivityRow {
    team_id: String,
    kind: String,
    subject: String,
    description: Option<String>,
    due_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    company_id: Option<String>,
    contact_id: Option<String>,
    deal_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ActivityRowWithId {
    record_id: String,
    team_id: String,
    kind: String,
    subject: String,
    description: Option<String>,
    due_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    company_id: Option<String>,
    contact_id: Option<String>,
    deal_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ActivityRow {
    fn into_activity(self, id: Uuid) -> Result<Activity, DbError> {
        Ok(Activity {
            id,
            team_id: parse_uuid(&self.team_id, "team")?,
            kind: parse_kind(&self.kind)?,
            subject: self.subject,
            description: self.description,
            due_at: self.due_at,
            completed_at: self.completed_at,
            company_id: parse_opt_uuid(self.company_id, "company")?,
            contact_id: parse_opt_uuid(self.contact_id, "contact")?,
            deal_id: parse_opt_uuid(self.deal_id, "deal")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ActivityRowWithId {
    fn try_into_activity(self) -> Result<Activity, DbError> {
        Ok(Activity {
            id: parse_uuid(&self.record_id, "activity")?,
            team_id: parse_uuid(&self.team_id, "team")?,
            kind: parse_kind(&self.kind)?,
            subject: self.subject,
            description: self.description,
            due_at: self.due_at,
            completed_at: self.completed_at,
            company_id: parse_opt_uuid(self.company_id, "company")?,
            contact_id: parse_opt_uuid(self.contact_id, "contact")?,
            deal_id: parse_opt_uuid(self.deal_id, "deal")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Activity repository.
#[derive(Clone)]
pub struct SurrealActivityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealActivityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TeamScopedRepository for SurrealActivityRepository<C> {
    type Record = Activity;
    type Create = CreateActivity;
    type Update = UpdateActivity;

    async fn create(&self, team_id: Uuid, input: CreateActivity) -> CrmResult<Activity> {
        ensure_refs_in_team(
            &self.db,
            team_id,
            &[
                ("company", input.company_id),
                ("contact", input.contact_id),
                ("deal", input.deal_id),
            ],
        )
        .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('activity', $id) SET \
                 team_id = $team_id, kind = $kind, \
                 subject = $subject, description = $description, \
                 due_at = $due_at, completed_at = NONE, \
                 company_id = $company_id, contact_id = $contact_id, \
                 deal_id = $deal_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .bind(("kind", kind_to_str(input.kind)))
            .bind(("subject", input.subject))
            .bind(("description", input.description))
            .bind(("due_at", input.due_at))
            .bind(("company_id", input.company_id.map(|c| c.to_string())))
            .bind(("contact_id", input.contact_id.map(|c| c.to_string())))
            .bind(("deal_id", input.deal_id.map(|d| d.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("activity", e))?;

        let rows: Vec<ActivityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("activity", &id_str))?;

        Ok(row.into_activity(id)?)
    }

    async fn get_by_id(&self, team_id: Uuid, id: Uuid) -> CrmResult<Activity> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('activity', $id) \
                 WHERE team_id = $team_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActivityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("activity", &id_str))?;

        Ok(row.into_activity(id)?)
    }

    async fn update(
        &self,
        team_id: Uuid,
        id: Uuid,
        input: UpdateActivity,
    ) -> CrmResult<Activity> {
        ensure_refs_in_team(
            &self.db,
            team_id,
            &[
                ("company", input.company_id.flatten()),
                ("contact", input.contact_id.flatten()),
                ("deal", input.deal_id.flatten()),
            ],
        )
        .await?;

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.kind.is_some() {
            sets.push("kind = $kind");
        }
        if input.subject.is_some() {
            sets.push("subject = $subject");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.due_at.is_some() {
            sets.push("due_at = $due_at");
        }
        if input.completed_at.is_some() {
            sets.push("completed_at = $completed_at");
        }
        if input.company_id.is_some() {
            sets.push("company_id = $company_id");
        }
        if input.contact_id.is_some() {
            sets.push("contact_id = $contact_id");
        }
        if input.deal_id.is_some() {
            sets.push("deal_id = $deal_id");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('activity', $id) SET {} \
             WHERE team_id = $team_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("team_id", team_id.to_string()));

        if let Some(kind) = input.kind {
            builder = builder.bind(("kind", kind_to_str(kind)));
        }
        if let Some(subject) = input.subject {
            builder = builder.bind(("subject", subject));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(due_at) = input.due_at {
            builder = builder.bind(("due_at", due_at));
        }
        if let Some(completed_at) = input.completed_at {
            builder = builder.bind(("completed_at", completed_at));
        }
        if let Some(company_id) = input.company_id {
            builder = builder.bind(("company_id", company_id.map(|c| c.to_string())));
        }
        if let Some(contact_id) = input.contact_id {
            builder = builder.bind(("contact_id", contact_id.map(|c| c.to_string())));
        }
        if let Some(deal_id) = input.deal_id {
            builder = builder.bind(("deal_id", deal_id.map(|d| d.to_string())));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("activity", e))?;

        let rows: Vec<ActivityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("activity", &id_str))?;

        Ok(row.into_activity(id)?)
    }

    async fn delete(&self, team_id: Uuid, id: Uuid) -> CrmResult<()> {
        support::delete_in_team(&self.db, "activity", team_id, &[id], &[]).await?;
        Ok(())
    }

    async fn delete_many(&self, team_id: Uuid, ids: &[Uuid]) -> CrmResult<usize> {
        Ok(support::delete_in_team(&self.db, "activity", team_id, ids, &[]).await?)
    }

    async fn list(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> CrmResult<PaginatedResult<Activity>> {
        let team_id_str = team_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM activity \
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
                "SELECT meta::id(id) AS record_id, * FROM activity \
                 WHERE team_id = $team_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("team_id", team_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActivityRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_activity())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn owner_of(&self, id: Uuid) -> CrmResult<Option<Uuid>> {
        Ok(support::owner_of(&self.db, "activity", id).await?)
    }
}
