//! CRM Database: SurrealDB connection management, schema migrations and
//! repository implementations for the `crm-core` traits.
//!
//! Every team-owned table carries a non-null `team_id` column indexed
//! together with its natural sort column, and every team-scoped repository
//! method filters on it inside the query.

mod connection;
mod error;
pub mod repository;
mod schema;
mod seed;

pub use connection::{DbConfig, DbManager, Prepared};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
pub use seed::ensure_permission_catalog;
