//! Tenant and user administration.

use std::sync::Arc;

use chatgate_auth::{hash_password, Principal, Role, User, UserPatch};
use chatgate_core::{non_blank, Tenant, TenantId, UserId};

use super::provision_user;
use crate::error::{ServiceError, ServiceResult};
use crate::provider::{ChatProvider, ProviderIdentity};
use crate::saga::MembershipCoordinator;
use crate::scope::TenantScope;
use crate::store::CredentialStore;

#[derive(Debug, Clone)]
pub struct NewUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn ChatProvider>,
    membership: MembershipCoordinator,
}

impl DirectoryService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn ChatProvider>,
        membership: MembershipCoordinator,
    ) -> Self {
        Self {
            store,
            provider,
            membership,
        }
    }

    fn scope(&self, caller: &Principal) -> TenantScope<'_> {
        TenantScope::new(self.store.as_ref(), caller.tenant_id)
    }

    // ── tenants ────────────────────────────────────────────────────────────

    pub async fn create_tenant(&self, name: &str) -> ServiceResult<Tenant> {
        let tenant = Tenant::new(non_blank("name", name)?);
        self.store.create_tenant(&tenant).await?;
        tracing::info!(tenant_id = %tenant.id, name = %tenant.name, "tenant created");
        Ok(tenant)
    }

    pub async fn list_tenants(&self) -> ServiceResult<Vec<Tenant>> {
        Ok(self.store.list_tenants().await?)
    }

    pub async fn get_tenant(&self, id: TenantId) -> ServiceResult<Tenant> {
        self.store.find_tenant(id).await?.ok_or(ServiceError::NotFound)
    }

    // ── users ──────────────────────────────────────────────────────────────

    /// Create a user in the caller's tenant.
    pub async fn create_user(&self, caller: &Principal, input: NewUserInput) -> ServiceResult<User> {
        if input.password.is_empty() {
            return Err(ServiceError::validation("password cannot be empty"));
        }
        let hash = hash_password(&input.password)?;
        let user = User::new(caller.tenant_id, &input.email, &input.name, hash, input.role)?;
        provision_user(self.store.as_ref(), self.provider.as_ref(), &user).await?;
        tracing::info!(tenant_id = %user.tenant_id, user_id = %user.id, created_by = %caller.user_id, "user created");
        Ok(user)
    }

    pub async fn list_users(&self, caller: &Principal) -> ServiceResult<Vec<User>> {
        self.scope(caller).users().await
    }

    /// Apply `patch`, then re-mirror the identity so the provider role follows.
    ///
    /// A provider failure leaves the local update in place and surfaces
    /// `RemoteSyncFailed`; repeating the request converges.
    pub async fn update_user(
        &self,
        caller: &Principal,
        id: UserId,
        patch: UserPatch,
    ) -> ServiceResult<User> {
        if patch.is_empty() {
            return Err(ServiceError::validation("no fields to update"));
        }
        let mut user = self.scope(caller).user(id).await?;
        patch.apply(&mut user)?;

        if self.store.update_user(&user).await? == 0 {
            return Err(ServiceError::NotFound);
        }

        if let Err(err) = self
            .provider
            .upsert_identity(&ProviderIdentity::for_user(&user))
            .await
        {
            tracing::error!(user_id = %user.id, error = %err, "provider identity update failed");
            return Err(ServiceError::RemoteSyncFailed(err.to_string()));
        }
        Ok(user)
    }

    /// Leave every channel through the membership saga, then delete the row.
    pub async fn delete_user(&self, caller: &Principal, id: UserId) -> ServiceResult<()> {
        let scope = self.scope(caller);
        let user = scope.user(id).await?;

        for channel in scope.channels_for_user(user.id).await? {
            self.membership
                .remove_member(channel.id, user.id, caller.tenant_id)
                .await?;
        }

        if self.store.delete_user(user.id, caller.tenant_id).await? == 0 {
            return Err(ServiceError::NotFound);
        }
        tracing::info!(tenant_id = %caller.tenant_id, user_id = %user.id, deleted_by = %caller.user_id, "user deleted");
        Ok(())
    }
}
