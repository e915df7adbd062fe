//! Team lifecycle: creation, switching, membership, role assignment and
//! deletion.

use crm_core::error::{CrmError, CrmResult};
use crm_core::models::team::{CreateTeam, Team};
use crm_core::models::user::User;
use crm_core::repository::{PermissionRepository, RoleRepository, TeamRepository, UserRepository};
use crm_core::{Ability, Action, Entity};
use tracing::info;
use uuid::Uuid;

use crate::context::TenantContext;
use crate::error::AccessError;
use crate::gate::PermissionGate;

pub struct TeamService<U, T, R, P>
where
    U: UserRepository,
    T: TeamRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    users: U,
    teams: T,
    roles: R,
    gate: PermissionGate<P>,
}

impl<U, T, R, P> TeamService<U, T, R, P>
where
    U: UserRepository,
    T: TeamRepository,
    R: RoleRepository,
    P: PermissionRepository,
{
    pub fn new(users: U, teams: T, roles: R, gate: PermissionGate<P>) -> Self {
        Self {
            users,
            teams,
            roles,
            gate,
        }
    }

    /// Create a shared team owned by the actor and switch the actor to it.
    pub async fn create_team(&self, ctx: &TenantContext, name: &str) -> CrmResult<Team> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CrmError::Validation {
                message: "team name must not be empty".into(),
            });
        }

        let team = self
            .teams
            .create(CreateTeam {
                owner_id: ctx.actor_id(),
                name: name.to_string(),
                personal_team: false,
            })
            .await?;
        self.users
            .set_current_team(ctx.actor_id(), Some(team.id))
            .await?;

        info!(team_id = %team.id, owner_id = %ctx.actor_id(), "Team created");

        Ok(team)
    }

    /// Remember `team_id` as the actor's current team. Members only.
    pub async fn switch_team(&self, actor_id: Uuid, team_id: Uuid) -> CrmResult<User> {
        if !self.teams.is_member(team_id, actor_id).await? {
            return Err(AccessError::NotAMember.into());
        }
        self.users.set_current_team(actor_id, Some(team_id)).await
    }

    pub async fn add_member(&self, ctx: &TenantContext, user_id: Uuid) -> CrmResult<()> {
        self.ensure_can_manage(ctx).await?;
        self.teams.add_member(ctx.team_id(), user_id).await?;

        info!(team_id = %ctx.team_id(), user_id = %user_id, "Member added");
        Ok(())
    }

    /// Remove a member. Their roles in the team go with them. The owner
    /// cannot be removed.
    pub async fn remove_member(&self, ctx: &TenantContext, user_id: Uuid) -> CrmResult<()> {
        let team = self.ensure_can_manage(ctx).await?;
        if team.owner_id == user_id {
            return Err(CrmError::Validation {
                message: "the team owner cannot be removed".into(),
            });
        }

        self.teams.remove_member(team.id, user_id).await?;

        info!(team_id = %team.id, user_id = %user_id, "Member removed");
        Ok(())
    }

    pub async fn assign_role(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CrmResult<()> {
        self.ensure_role_change(ctx, user_id, role_id).await?;
        self.roles
            .assign_to_user(ctx.team_id(), user_id, role_id)
            .await?;

        info!(team_id = %ctx.team_id(), user_id = %user_id, role_id = %role_id, "Role assigned");
        Ok(())
    }

    pub async fn revoke_role(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CrmResult<()> {
        self.ensure_role_change(ctx, user_id, role_id).await?;
        self.roles
            .unassign_from_user(ctx.team_id(), user_id, role_id)
            .await?;

        info!(team_id = %ctx.team_id(), user_id = %user_id, role_id = %role_id, "Role revoked");
        Ok(())
    }

    /// Delete the active team and everything it owns. Owner only. Personal
    /// teams cannot be deleted.
    pub async fn delete_team(&self, ctx: &TenantContext) -> CrmResult<()> {
        let team = self.teams.get_by_id(ctx.team_id()).await?;
        if team.owner_id != ctx.actor_id() {
            return Err(AccessError::OwnerOnly {
                action: "delete the team",
            }
            .into());
        }
        if team.personal_team {
            return Err(CrmError::Validation {
                message: "personal teams cannot be deleted".into(),
            });
        }

        self.teams.delete(team.id).await
    }

    /// The owner always manages membership; anyone else needs `update:Team`.
    async fn ensure_can_manage(&self, ctx: &TenantContext) -> CrmResult<Team> {
        let team = self.teams.get_by_id(ctx.team_id()).await?;
        if team.owner_id == ctx.actor_id() {
            return Ok(team);
        }

        let ability = Ability::new(Action::Update, Entity::Team);
        if !self.gate.allows(ctx, ability).await? {
            return Err(AccessError::Forbidden { ability }.into());
        }
        Ok(team)
    }

    async fn ensure_role_change(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CrmResult<()> {
        let ability = Ability::new(Action::Update, Entity::Role);
        if !self.gate.allows(ctx, ability).await? {
            return Err(AccessError::Forbidden { ability }.into());
        }

        if !self.teams.is_member(ctx.team_id(), user_id).await? {
            return Err(CrmError::not_found("user", user_id));
        }
        self.roles.get_by_id(ctx.team_id(), role_id).await?;
        Ok(())
    }
}
