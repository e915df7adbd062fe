//! Database-specific error types and conversions.

use crm_core::error::CrmError;
use crm_core::password::PasswordError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Classify a statement error returned by `Response::check`.
    ///
    /// Unique index violations are reported by SurrealDB as
    /// "Database index `...` already contains ...".
    pub(crate) fn from_check(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            Self::Conflict {
                entity: entity.into(),
            }
        } else {
            Self::Query(message)
        }
    }
}

impl From<DbError> for CrmError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CrmError::NotFound { entity, id },
            DbError::Conflict { entity } => CrmError::AlreadyExists { entity },
            DbError::Password(err) => err.into(),
            other => CrmError::Database(other.to_string()),
        }
    }
}
