//! Team scoping for domain records.
//!
//! A [`ScopedStore`] binds a [`TeamScopedRepository`] to one
//! [`TenantContext`]. Every call passes the active team down to the
//! repository, which filters on it inside the query. Records owned by other
//! teams surface as `NotFound`, exactly like absent ones.

use std::collections::{BTreeMap, HashSet};

use crm_core::error::{CrmError, CrmResult};
use crm_core::repository::{PaginatedResult, Pagination, TeamOwned, TeamScopedRepository};
use tracing::warn;
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::context::TenantContext;

pub struct ScopedStore<R: TeamScopedRepository> {
    repo: R,
    ctx: TenantContext,
    super_admin_bypass: bool,
}

impl<R: TeamScopedRepository> ScopedStore<R> {
    pub fn new(repo: R, ctx: TenantContext, config: &AccessConfig) -> Self {
        Self {
            repo,
            ctx,
            super_admin_bypass: config.super_admin_bypasses_scope,
        }
    }

    pub fn context(&self) -> &TenantContext {
        &self.ctx
    }

    pub async fn list(&self, pagination: Pagination) -> CrmResult<PaginatedResult<R::Record>> {
        self.repo.list(self.ctx.team_id(), pagination).await
    }

    pub async fn get(&self, id: Uuid) -> CrmResult<R::Record> {
        let team_id = self.team_for(id).await?;
        self.repo.get_by_id(team_id, id).await
    }

    /// Load every record in `ids`, failing with `NotFound` on the first one
    /// outside the active team. Duplicate ids are loaded once.
    pub async fn get_many(&self, ids: &[Uuid]) -> CrmResult<Vec<R::Record>> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if seen.insert(*id) {
                records.push(self.get(*id).await?);
            }
        }
        Ok(records)
    }

    /// Create a record owned by the active team.
    pub async fn create(&self, input: R::Create) -> CrmResult<R::Record> {
        self.repo.create(self.ctx.team_id(), input).await
    }

    pub async fn update(&self, id: Uuid, input: R::Update) -> CrmResult<R::Record> {
        let team_id = self.team_for(id).await?;
        self.repo.update(team_id, id, input).await
    }

    pub async fn delete(&self, id: Uuid) -> CrmResult<()> {
        let team_id = self.team_for(id).await?;
        self.repo.delete(team_id, id).await
    }

    /// Delete every record in `ids`. A single foreign or absent id fails the
    /// batch before anything is deleted; the repository removes the rest in
    /// one transaction per owning team.
    pub async fn delete_many(&self, ids: &[Uuid]) -> CrmResult<usize> {
        let records = self.get_many(ids).await?;

        let mut by_team: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();
        for record in &records {
            by_team.entry(record.team_id()).or_default().push(record.id());
        }

        let mut deleted = 0;
        for (team_id, team_ids) in &by_team {
            deleted += self.repo.delete_many(*team_id, team_ids).await?;
        }
        Ok(deleted)
    }

    /// Team to query for `id`. Always the active team, unless the actor is a
    /// super-admin and the scope bypass is enabled.
    async fn team_for(&self, id: Uuid) -> CrmResult<Uuid> {
        if !(self.super_admin_bypass && self.ctx.is_super_admin()) {
            return Ok(self.ctx.team_id());
        }

        let entity = <R::Record as TeamOwned>::ENTITY;
        let owner = self
            .repo
            .owner_of(id)
            .await?
            .ok_or_else(|| CrmError::not_found(entity.table(), id))?;

        if owner != self.ctx.team_id() {
            warn!(
                target: "crm::audit",
                actor_id = %self.ctx.actor_id(),
                team_id = %self.ctx.team_id(),
                owner_team_id = %owner,
                entity = %entity,
                record_id = %id,
                "Super-admin bypassed team scope"
            );
        }

        Ok(owner)
    }
}
