//! The resolved tenant for one request.

use crm_core::error::{CrmError, CrmResult};
use uuid::Uuid;

/// An actor together with the team that is active for the current request.
///
/// Only [`crate::TenantResolver`] constructs one, so holding a context means
/// the actor was verified to be a member of `team_id` at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    actor_id: Uuid,
    team_id: Uuid,
    is_super_admin: bool,
}

impl TenantContext {
    pub(crate) fn new(actor_id: Uuid, team_id: Uuid, is_super_admin: bool) -> Self {
        Self {
            actor_id,
            team_id,
            is_super_admin,
        }
    }

    pub fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    pub fn team_id(&self) -> Uuid {
        self.team_id
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }
}

/// Outcome of tenant resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Active(TenantContext),
    /// The actor is authenticated but belongs to no team.
    NoTenant { actor_id: Uuid },
}

impl Resolution {
    /// The active context, or [`CrmError::TenantContext`] when the actor has
    /// no team to work in.
    pub fn require(self) -> CrmResult<TenantContext> {
        match self {
            Resolution::Active(ctx) => Ok(ctx),
            Resolution::NoTenant { .. } => Err(CrmError::TenantContext),
        }
    }

    pub fn context(&self) -> Option<&TenantContext> {
        match self {
            Resolution::Active(ctx) => Some(ctx),
            Resolution::NoTenant { .. } => None,
        }
    }
}
