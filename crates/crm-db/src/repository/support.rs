//! Helpers shared by the repository implementations.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

/// Row struct for owner lookups.
#[derive(Debug, SurrealValue)]
pub(crate) struct TeamIdRow {
    pub(crate) team_id: String,
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(value: Option<String>, what: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(&v, what)).transpose()
}

pub(crate) fn first_count(rows: Vec<CountRow>) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

/// Fail with `NotFound` unless `id` names a `table` record owned by
/// `team_id`. Used to keep cross-record references inside one team.
pub(crate) async fn ensure_in_team<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    team_id: Uuid,
    id: Uuid,
) -> Result<(), DbError> {
    let mut result = db
        .query(
            "SELECT count() AS total FROM type::table($table) \
             WHERE id = type::record($table, $id) \
             AND team_id = $team_id GROUP ALL",
        )
        .bind(("table", table))
        .bind(("id", id.to_string()))
        .bind(("team_id", team_id.to_string()))
        .await?;

    let rows: Vec<CountRow> = result.take(0)?;
    if first_count(rows) == 0 {
        return Err(DbError::not_found(table, id));
    }
    Ok(())
}

/// Check every optional reference against the owning team.
pub(crate) async fn ensure_refs_in_team<C: Connection>(
    db: &Surreal<C>,
    team_id: Uuid,
    refs: &[(&'static str, Option<Uuid>)],
) -> Result<(), DbError> {
    for (table, id) in refs {
        if let Some(id) = id {
            ensure_in_team(db, table, team_id, *id).await?;
        }
    }
    Ok(())
}

/// Unscoped lookup of the team owning a record.
pub(crate) async fn owner_of<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: Uuid,
) -> Result<Option<Uuid>, DbError> {
    let mut result = db
        .query("SELECT team_id FROM type::record($table, $id)")
        .bind(("table", table))
        .bind(("id", id.to_string()))
        .await?;

    let rows: Vec<TeamIdRow> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(|row| parse_uuid(&row.team_id, "team"))
        .transpose()
}

/// Delete the `table` records in `ids` owned by `team_id`.
///
/// Ownership of every id is checked before anything is touched. The
/// deletion and the clearing of each `(referrer, column)` reference held by
/// the same team's records then run in a single transaction.
pub(crate) async fn delete_in_team<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    team_id: Uuid,
    ids: &[Uuid],
    referrers: &[(&'static str, &'static str)],
) -> Result<usize, DbError> {
    let mut wanted: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    wanted.sort();
    wanted.dedup();
    if wanted.is_empty() {
        return Ok(0);
    }

    let mut result = db
        .query(format!(
            "SELECT VALUE meta::id(id) FROM {table} \
             WHERE team_id = $team_id AND meta::id(id) IN $ids"
        ))
        .bind(("team_id", team_id.to_string()))
        .bind(("ids", wanted.clone()))
        .await?;
    let present: Vec<String> = result.take(0)?;
    if let Some(missing) = wanted.iter().find(|id| !present.contains(id)) {
        return Err(DbError::not_found(table, missing));
    }

    let mut query = String::from("BEGIN TRANSACTION; ");
    for (referrer, column) in referrers {
        query.push_str(&format!(
            "UPDATE {referrer} SET {column} = NONE \
             WHERE team_id = $team_id AND {column} IN $ids; "
        ));
    }
    query.push_str(&format!(
        "DELETE {table} WHERE team_id = $team_id AND meta::id(id) IN $ids; \
         COMMIT TRANSACTION;"
    ));

    db.query(query)
        .bind(("team_id", team_id.to_string()))
        .bind(("ids", wanted.clone()))
        .await?
        .check()
        .map_err(|e| DbError::from_check(table, e))?;

    Ok(wanted.len())
}
