//! Tenant context resolution.
//!
//! Resolution only reads membership data. An explicit team selector is
//! honored only for members; without one the actor's remembered team, then
//! personal team, then oldest membership is used.

use crm_core::error::{CrmError, CrmResult};
use crm_core::models::user::User;
use crm_core::repository::{TeamRepository, UserRepository};
use tracing::debug;
use uuid::Uuid;

use crate::context::{Resolution, TenantContext};
use crate::error::AccessError;

/// Determines the active team for a request.
pub struct TenantResolver<U: UserRepository, T: TeamRepository> {
    users: U,
    teams: T,
}

impl<U: UserRepository, T: TeamRepository> TenantResolver<U, T> {
    pub fn new(users: U, teams: T) -> Self {
        Self { users, teams }
    }

    /// Resolve the active team for `actor_id`.
    ///
    /// - No actor, or an actor that no longer exists: `AuthenticationFailed`.
    /// - A `selector` naming a team the actor is not a member of (or one
    ///   that does not exist): `AuthorizationDenied`.
    pub async fn resolve(
        &self,
        actor_id: Option<Uuid>,
        selector: Option<Uuid>,
    ) -> CrmResult<Resolution> {
        let actor_id = actor_id.ok_or(AccessError::Unauthenticated)?;
        let actor = self.load_actor(actor_id).await?;

        if let Some(team_id) = selector {
            if !self.teams.is_member(team_id, actor.id).await? {
                debug!(actor_id = %actor.id, team_id = %team_id, "Team selector rejected");
                return Err(AccessError::NotAMember.into());
            }
            return Ok(self.active(&actor, team_id));
        }

        if let Some(team_id) = actor.current_team_id {
            if self.teams.is_member(team_id, actor.id).await? {
                return Ok(self.active(&actor, team_id));
            }
        }

        if let Some(team) = self.teams.personal_team(actor.id).await? {
            return Ok(self.active(&actor, team.id));
        }

        if let Some(team) = self.teams.list_for_user(actor.id).await?.first() {
            return Ok(self.active(&actor, team.id));
        }

        debug!(actor_id = %actor.id, "Actor has no team");
        Ok(Resolution::NoTenant { actor_id: actor.id })
    }

    async fn load_actor(&self, actor_id: Uuid) -> CrmResult<User> {
        match self.users.get_by_id(actor_id).await {
            Ok(user) => Ok(user),
            Err(CrmError::NotFound { .. }) => Err(AccessError::UnknownActor.into()),
            Err(e) => Err(e),
        }
    }

    fn active(&self, actor: &User, team_id: Uuid) -> Resolution {
        debug!(actor_id = %actor.id, team_id = %team_id, "Tenant resolved");
        Resolution::Active(TenantContext::new(actor.id, team_id, actor.is_super_admin))
    }
}
