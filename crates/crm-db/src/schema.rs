//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as strings.
//! Enums are stored as strings with ASSERT constraints. Every team-owned
//! table has a `(team_id, ...)` index backing its scoped lookups.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD is_super_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD current_team_id ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Teams (global scope, the tenant boundary)
-- =======================================================================
DEFINE TABLE team SCHEMAFULL;
DEFINE FIELD owner_id ON TABLE team TYPE string;
DEFINE FIELD name ON TABLE team TYPE string;
DEFINE FIELD personal_team ON TABLE team TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE team TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE team TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_team_owner ON TABLE team COLUMNS owner_id;

-- =======================================================================
-- Roles (team scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD team_id ON TABLE role TYPE string;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_team_name ON TABLE role \
    COLUMNS team_id, name UNIQUE;

-- =======================================================================
-- Permissions (global catalog of abilities)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_name ON TABLE permission \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Companies (team scope)
-- =======================================================================
DEFINE TABLE company SCHEMAFULL;
DEFINE FIELD team_id ON TABLE company TYPE string;
DEFINE FIELD name ON TABLE company TYPE string;
DEFINE FIELD email ON TABLE company TYPE option<string>;
DEFINE FIELD phone ON TABLE company TYPE option<string>;
DEFINE FIELD website ON TABLE company TYPE option<string>;
DEFINE FIELD address ON TABLE company TYPE option<string>;
DEFINE FIELD industry ON TABLE company TYPE option<string>;
DEFINE FIELD created_at ON TABLE company TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE company TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_company_team_name ON TABLE company \
    COLUMNS team_id, name;
DEFINE INDEX idx_company_team_created ON TABLE company \
    COLUMNS team_id, created_at;

-- =======================================================================
-- Contacts (team scope)
-- =======================================================================
DEFINE TABLE contact SCHEMAFULL;
DEFINE FIELD team_id ON TABLE contact TYPE string;
DEFINE FIELD company_id ON TABLE contact TYPE option<string>;
DEFINE FIELD first_name ON TABLE contact TYPE string;
DEFINE FIELD last_name ON TABLE contact TYPE string;
DEFINE FIELD email ON TABLE contact TYPE option<string>;
DEFINE FIELD phone ON TABLE contact TYPE option<string>;
DEFINE FIELD position ON TABLE contact TYPE option<string>;
DEFINE FIELD created_at ON TABLE contact TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE contact TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_contact_team_name ON TABLE contact \
    COLUMNS team_id, last_name, first_name;
DEFINE INDEX idx_contact_team_company ON TABLE contact \
    COLUMNS team_id, company_id;
DEFINE INDEX idx_contact_team_created ON TABLE contact \
    COLUMNS team_id, created_at;

-- =======================================================================
-- Deals (team scope)
-- =======================================================================
DEFINE TABLE deal SCHEMAFULL;
DEFINE FIELD team_id ON TABLE deal TYPE string;
DEFINE FIELD company_id ON TABLE deal TYPE option<string>;
DEFINE FIELD contact_id ON TABLE deal TYPE option<string>;
DEFINE FIELD title ON TABLE deal TYPE string;
DEFINE FIELD amount_cents ON TABLE deal TYPE int;
DEFINE FIELD currency ON TABLE deal TYPE string;
DEFINE FIELD stage ON TABLE deal TYPE string \
    ASSERT $value IN ['Prospecting', 'Qualification', 'Proposal', \
    'Negotiation', 'ClosedWon', 'ClosedLost'];
DEFINE FIELD expected_close_at ON TABLE deal TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE deal TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE deal TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_deal_team_stage ON TABLE deal \
    COLUMNS team_id, stage;
DEFINE INDEX idx_deal_team_created ON TABLE deal \
    COLUMNS team_id, created_at;

-- =======================================================================
-- Activities (team scope)
-- =======================================================================
DEFINE TABLE activity SCHEMAFULL;
DEFINE FIELD team_id ON TABLE activity TYPE string;
DEFINE FIELD kind ON TABLE activity TYPE string \
    ASSERT $value IN ['Call', 'Email', 'Meeting', 'Task', 'Note'];
DEFINE FIELD subject ON TABLE activity TYPE string;
DEFINE FIELD description ON TABLE activity TYPE option<string>;
DEFINE FIELD due_at ON TABLE activity TYPE option<datetime>;
DEFINE FIELD completed_at ON TABLE activity TYPE option<datetime>;
DEFINE FIELD company_id ON TABLE activity TYPE option<string>;
DEFINE FIELD contact_id ON TABLE activity TYPE option<string>;
DEFINE FIELD deal_id ON TABLE activity TYPE option<string>;
DEFINE FIELD created_at ON TABLE activity TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE activity TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_activity_team_due ON TABLE activity \
    COLUMNS team_id, due_at;
DEFINE INDEX idx_activity_team_created ON TABLE activity \
    COLUMNS team_id, created_at;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Team membership
DEFINE TABLE member_of TYPE RELATION SCHEMAFULL;
DEFINE FIELD joined_at ON TABLE member_of TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_of_pair ON TABLE member_of \
    COLUMNS in, out UNIQUE;

-- User -> Role assignment (roles are team-scoped)
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;
DEFINE INDEX idx_has_role_pair ON TABLE has_role \
    COLUMNS in, out UNIQUE;

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;
DEFINE INDEX idx_grants_pair ON TABLE grants \
    COLUMNS in, out UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
