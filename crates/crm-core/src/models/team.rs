//! Team domain model.
//!
//! Teams are the isolation boundary. Every domain record belongs to exactly
//! one team, and users act on records only through a team they are a
//! member of.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A team is an isolated tenant owning its own companies, contacts, deals,
/// activities and roles.
///
/// Every user gets a personal team at registration. Shared teams are created
/// explicitly and can have any number of members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: Uuid,
    /// The user who created the team. Always a member.
    pub owner_id: Uuid,
    pub name: String,
    /// `true` for the single-user team created at registration.
    pub personal_team: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    pub owner_id: Uuid,
    pub name: String,
    pub personal_team: bool,
}

/// Fields that can be updated on an existing team.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTeam {
    pub name: Option<String>,
}

/// A user's membership in a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}
