//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Team-scoped repositories require a
//! `team_id` parameter and must apply it inside the storage query itself, so
//! a record owned by another team is never loaded, modified or deleted.

use uuid::Uuid;

use crate::ability::Entity;
use crate::error::CrmResult;
use crate::models::{
    permission::{CreatePermission, Permission},
    role::{CreateRole, Role, UpdateRole},
    team::{CreateTeam, Team, UpdateTeam},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users & Teams (global scope)
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CrmResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CrmResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = CrmResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = CrmResult<User>> + Send;
    /// Point the user's remembered team at `team_id` (or clear it).
    fn set_current_team(
        &self,
        id: Uuid,
        team_id: Option<Uuid>,
    ) -> impl Future<Output = CrmResult<User>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CrmResult<PaginatedResult<User>>> + Send;
}

pub trait TeamRepository: Send + Sync {
    /// Create a team and make its owner the first member.
    fn create(&self, input: CreateTeam) -> impl Future<Output = CrmResult<Team>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CrmResult<Team>> + Send;
    fn update(&self, id: Uuid, input: UpdateTeam)
    -> impl Future<Output = CrmResult<Team>> + Send;
    /// Delete the team together with every record, role and membership it
    /// owns.
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;

    /// Teams the user belongs to, oldest membership first.
    fn list_for_user(&self, user_id: Uuid) -> impl Future<Output = CrmResult<Vec<Team>>> + Send;

    /// The user's personal team, if it still exists.
    fn personal_team(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = CrmResult<Option<Team>>> + Send;

    fn add_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;

    /// Remove a membership along with the member's role assignments in the
    /// team.
    fn remove_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;

    fn is_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CrmResult<bool>> + Send;

    fn get_members(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CrmResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Roles & Permissions
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = CrmResult<Role>> + Send;
    fn get_by_id(&self, team_id: Uuid, id: Uuid)
    -> impl Future<Output = CrmResult<Role>> + Send;
    fn update(
        &self,
        team_id: Uuid,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = CrmResult<Role>> + Send;
    fn delete(&self, team_id: Uuid, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    fn list(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CrmResult<PaginatedResult<Role>>> + Send;

    /// Assign a team role to a user.
    fn assign_to_user(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;

    fn unassign_from_user(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;

    /// Roles the user holds within the given team only.
    fn get_user_roles(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CrmResult<Vec<Role>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = CrmResult<Permission>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = CrmResult<Permission>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CrmResult<PaginatedResult<Permission>>> + Send;

    /// Grant a permission to a team role (creates a `grants` edge).
    fn grant_to_role(
        &self,
        team_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;

    fn revoke_from_role(
        &self,
        team_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;

    fn get_role_permissions(
        &self,
        team_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CrmResult<Vec<Permission>>> + Send;

    /// Names of every permission granted to the user through the roles it
    /// holds in `team_id`. Duplicates are removed.
    fn get_user_permission_names(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CrmResult<Vec<String>>> + Send;
}

// ---------------------------------------------------------------------------
// Team-owned domain records
// ---------------------------------------------------------------------------

/// A domain record that always belongs to exactly one team.
pub trait TeamOwned {
    const ENTITY: Entity;

    fn id(&self) -> Uuid;
    fn team_id(&self) -> Uuid;
}

/// Uniform CRUD over a team-owned record type.
///
/// `create` receives the owning team separately from the input, and the
/// update input has no team field, so a record's team can be stamped once
/// and never changed.
pub trait TeamScopedRepository: Send + Sync {
    type Record: TeamOwned + Send;
    type Create: Send;
    type Update: Send;

    fn create(
        &self,
        team_id: Uuid,
        input: Self::Create,
    ) -> impl Future<Output = CrmResult<Self::Record>> + Send;

    /// `NotFound` if the record is absent or belongs to another team.
    fn get_by_id(
        &self,
        team_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<Self::Record>> + Send;

    fn update(
        &self,
        team_id: Uuid,
        id: Uuid,
        input: Self::Update,
    ) -> impl Future<Output = CrmResult<Self::Record>> + Send;

    /// `NotFound` (never a silent no-op) if nothing was deleted.
    fn delete(&self, team_id: Uuid, id: Uuid) -> impl Future<Output = CrmResult<()>> + Send;

    /// Delete every record in `ids` in one transaction. `NotFound`, with
    /// nothing deleted, if any id is absent or owned by another team.
    /// Returns the number of distinct records deleted.
    fn delete_many(
        &self,
        team_id: Uuid,
        ids: &[Uuid],
    ) -> impl Future<Output = CrmResult<usize>> + Send;

    fn list(
        &self,
        team_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CrmResult<PaginatedResult<Self::Record>>> + Send;

    /// Unscoped lookup of the owning team. Only the super-admin scope bypass
    /// may call this.
    fn owner_of(&self, id: Uuid) -> impl Future<Output = CrmResult<Option<Uuid>>> + Send;
}

macro_rules! team_owned {
    ($ty:ty, $entity:expr) => {
        impl TeamOwned for $ty {
            const ENTITY: Entity = $entity;

            fn id(&self) -> Uuid {
                self.id
            }

            fn team_id(&self) -> Uuid {
                self.team_id
            }
        }
    };
}

team_owned!(crate::models::company::Company, Entity::Company);
team_owned!(crate::models::contact::Contact, Entity::Contact);
team_owned!(crate::models::deal::Deal, Entity::Deal);
team_owned!(crate::models::activity::Activity, Entity::Activity);
team_owned!(Role, Entity::Role);
