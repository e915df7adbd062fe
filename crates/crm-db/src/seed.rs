//! Permission catalog seeding.

use crm_core::Ability;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;

/// Insert every catalog ability that is not yet stored as a permission.
///
/// Returns the number of permissions created. Safe to call on every start.
pub async fn ensure_permission_catalog<C: Connection>(db: &Surreal<C>) -> Result<u64, DbError> {
    let mut result = db.query("SELECT VALUE name FROM permission").await?;
    let existing: Vec<String> = result.take(0)?;

    let mut created = 0;
    for ability in Ability::catalog() {
        let name = ability.to_string();
        if existing.contains(&name) {
            continue;
        }

        db.query(
            "CREATE type::record('permission', $id) SET \
             name = $name, description = $description",
        )
        .bind(("id", uuid::Uuid::new_v4().to_string()))
        .bind(("description", format!("Allows {} on {}", ability.action, ability.entity)))
        .bind(("name", name))
        .await?
        .check()
        .map_err(|e| DbError::from_check("permission", e))?;

        created += 1;
    }

    if created > 0 {
        info!(created, "Permission catalog seeded");
    }

    Ok(created)
}
