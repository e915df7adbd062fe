//! Scoped and permission-checked access to one domain record type.
//!
//! Every operation loads through the [`ScopedStore`] first, then consults the
//! [`PermissionGate`], and only then performs its side effect. A denied
//! operation changes nothing.

use crm_core::error::CrmResult;
use crm_core::repository::{
    PaginatedResult, Pagination, PermissionRepository, TeamOwned, TeamScopedRepository,
};
use crm_core::{Ability, Action, Entity};
use uuid::Uuid;

use crate::context::TenantContext;
use crate::error::AccessError;
use crate::gate::PermissionGate;
use crate::scope::ScopedStore;

pub struct GuardedStore<R: TeamScopedRepository, P: PermissionRepository> {
    scope: ScopedStore<R>,
    gate: PermissionGate<P>,
}

impl<R: TeamScopedRepository, P: PermissionRepository> GuardedStore<R, P> {
    pub fn new(scope: ScopedStore<R>, gate: PermissionGate<P>) -> Self {
        Self { scope, gate }
    }

    pub fn context(&self) -> &TenantContext {
        self.scope.context()
    }

    pub async fn list(&self, pagination: Pagination) -> CrmResult<PaginatedResult<R::Record>> {
        self.authorize(Action::ViewAny).await?;
        self.scope.list(pagination).await
    }

    pub async fn get(&self, id: Uuid) -> CrmResult<R::Record> {
        let record = self.scope.get(id).await?;
        self.authorize_on(Action::View, &record).await?;
        Ok(record)
    }

    pub async fn create(&self, input: R::Create) -> CrmResult<R::Record> {
        self.authorize(Action::Create).await?;
        self.scope.create(input).await
    }

    pub async fn update(&self, id: Uuid, input: R::Update) -> CrmResult<R::Record> {
        let record = self.scope.get(id).await?;
        self.authorize_on(Action::Update, &record).await?;
        self.scope.update(id, input).await
    }

    pub async fn delete(&self, id: Uuid) -> CrmResult<()> {
        let record = self.scope.get(id).await?;
        self.authorize_on(Action::Delete, &record).await?;
        self.scope.delete(id).await
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> CrmResult<usize> {
        self.scope.get_many(ids).await?;
        self.authorize(Action::DeleteAny).await?;
        self.scope.delete_many(ids).await
    }

    fn ability(action: Action) -> Ability {
        let entity: Entity = <R::Record as TeamOwned>::ENTITY;
        Ability::new(action, entity)
    }

    async fn authorize(&self, action: Action) -> CrmResult<()> {
        let ability = Self::ability(action);
        if self.gate.allows(self.scope.context(), ability).await? {
            Ok(())
        } else {
            Err(AccessError::Forbidden { ability }.into())
        }
    }

    async fn authorize_on(&self, action: Action, record: &R::Record) -> CrmResult<()> {
        let ability = Self::ability(action);
        if self
            .gate
            .allows_on(self.scope.context(), ability, record)
            .await?
        {
            Ok(())
        } else {
            Err(AccessError::Forbidden { ability }.into())
        }
    }
}
