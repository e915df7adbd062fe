//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog entry for one ability. Permissions are global; roles are what
/// bind them to a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Canonical `{action}:{entity}` string (see [`crate::Ability`]).
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub description: String,
}
