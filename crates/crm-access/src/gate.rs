//! The role/permission gate.
//!
//! An actor's abilities in a team are the union of the permissions granted
//! to every role it holds in that team. Matching is exact on the
//! `{action}:{entity}` string. An actor without roles is denied everything.
//!
//! A deny is `Ok(false)`. Callers decide what error to raise.

use crm_core::Ability;
use crm_core::error::CrmResult;
use crm_core::repository::{PermissionRepository, TeamOwned};
use tracing::{debug, info};

use crate::config::AccessConfig;
use crate::context::TenantContext;

/// Decides whether the actor of a [`TenantContext`] may perform an ability.
#[derive(Clone)]
pub struct PermissionGate<P: PermissionRepository> {
    permissions: P,
    super_admin_bypass: bool,
}

impl<P: PermissionRepository> PermissionGate<P> {
    pub fn new(permissions: P, config: &AccessConfig) -> Self {
        Self {
            permissions,
            super_admin_bypass: config.super_admin_bypasses_gate,
        }
    }

    /// Whether the actor may perform `ability` in the active team.
    pub async fn allows(&self, ctx: &TenantContext, ability: Ability) -> CrmResult<bool> {
        if self.bypasses(ctx, ability) {
            return Ok(true);
        }

        let granted = self
            .permissions
            .get_user_permission_names(ctx.team_id(), ctx.actor_id())
            .await?;
        let wanted = ability.to_string();
        let allowed = granted.iter().any(|name| *name == wanted);

        debug!(
            actor_id = %ctx.actor_id(),
            team_id = %ctx.team_id(),
            ability = %ability,
            allowed,
            "Permission gate decision"
        );

        Ok(allowed)
    }

    /// Whether the actor may perform `ability` on `target`.
    ///
    /// Denies when the target is a different entity than the ability names,
    /// or when the target belongs to a team other than the active one.
    pub async fn allows_on<R: TeamOwned>(
        &self,
        ctx: &TenantContext,
        ability: Ability,
        target: &R,
    ) -> CrmResult<bool> {
        if R::ENTITY != ability.entity {
            debug!(ability = %ability, target = %R::ENTITY, "Ability does not match target entity");
            return Ok(false);
        }

        if self.bypasses(ctx, ability) {
            return Ok(true);
        }

        if target.team_id() != ctx.team_id() {
            debug!(
                actor_id = %ctx.actor_id(),
                team_id = %ctx.team_id(),
                target_id = %target.id(),
                "Target belongs to another team"
            );
            return Ok(false);
        }

        self.allows(ctx, ability).await
    }

    /// Every ability the actor holds in the active team, sorted.
    pub async fn effective_permissions(&self, ctx: &TenantContext) -> CrmResult<Vec<String>> {
        if self.super_admin_bypass && ctx.is_super_admin() {
            let mut all: Vec<String> = Ability::catalog().map(|a| a.to_string()).collect();
            all.sort();
            return Ok(all);
        }

        let mut names = self
            .permissions
            .get_user_permission_names(ctx.team_id(), ctx.actor_id())
            .await?;
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn bypasses(&self, ctx: &TenantContext, ability: Ability) -> bool {
        if !(self.super_admin_bypass && ctx.is_super_admin()) {
            return false;
        }
        info!(
            target: "crm::audit",
            actor_id = %ctx.actor_id(),
            team_id = %ctx.team_id(),
            ability = %ability,
            "Super-admin bypassed permission gate"
        );
        true
    }
}
