//! Channel membership saga.
//!
//! Add member:
//! 1. Resolve channel and user inside the caller's tenant
//! 2. Insert the local membership row
//! 3. Add the user on the provider
//!
//! Compensating action: delete the local row if step 3 fails.
//!
//! Remove member:
//! 1. Resolve the channel inside the caller's tenant
//! 2. Delete the local row (absent is fine)
//! 3. Remove the user on the provider, always
//!
//! No compensation on removal: a failed provider call leaves the user
//! locally removed and surfaces `RemoteSyncFailed`.

use std::sync::Arc;

use chrono::Utc;

use chatgate_auth::User;
use chatgate_channels::ChannelMember;
use chatgate_core::{ChannelId, TenantId, UserId};

use crate::error::{ServiceError, ServiceResult};
use crate::provider::ChatProvider;
use crate::scope::TenantScope;
use crate::store::{CredentialStore, StoreError, UNIQUE_CHANNEL_MEMBER};

#[derive(Clone)]
pub struct MembershipCoordinator {
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) provider: Arc<dyn ChatProvider>,
}

impl MembershipCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>, provider: Arc<dyn ChatProvider>) -> Self {
        Self { store, provider }
    }

    pub(crate) fn scope(&self, tenant_id: TenantId) -> TenantScope<'_> {
        TenantScope::new(self.store.as_ref(), tenant_id)
    }

    pub async fn add_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> ServiceResult<ChannelMember> {
        let scope = self.scope(tenant_id);
        let channel = scope.channel(channel_id).await?;
        let user = scope.user(user_id).await?;

        if self
            .store
            .find_member(channel.id, user.id, tenant_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::AlreadyMember);
        }

        let member = ChannelMember::join(&channel, user.id, Utc::now());
        match self.store.create_member(&member).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(UNIQUE_CHANNEL_MEMBER)) => {
                return Err(ServiceError::AlreadyMember);
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(err) = self.provider.add_members(&channel.remote_id, &[user.id]).await {
            tracing::warn!(
                tenant_id = %tenant_id,
                channel_id = %channel.id,
                user_id = %user.id,
                error = %err,
                "provider add_members failed; removing local membership"
            );
            if let Err(undo) = self.store.delete_member(channel.id, user.id, tenant_id).await {
                tracing::error!(
                    channel_id = %channel.id,
                    user_id = %user.id,
                    error = %undo,
                    "compensation failed; local membership left without provider membership"
                );
            }
            return Err(ServiceError::RemoteSyncFailed(err.to_string()));
        }

        tracing::info!(tenant_id = %tenant_id, channel_id = %channel.id, user_id = %user.id, "member added");
        Ok(member)
    }

    pub async fn remove_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> ServiceResult<()> {
        let channel = self.scope(tenant_id).channel(channel_id).await?;

        let removed = self.store.delete_member(channel.id, user_id, tenant_id).await?;

        if let Err(err) = self.provider.remove_members(&channel.remote_id, &[user_id]).await {
            tracing::error!(
                tenant_id = %tenant_id,
                channel_id = %channel.id,
                user_id = %user_id,
                local_rows = removed,
                error = %err,
                "provider remove_members failed after local removal"
            );
            return Err(ServiceError::RemoteSyncFailed(err.to_string()));
        }

        tracing::info!(tenant_id = %tenant_id, channel_id = %channel.id, user_id = %user_id, local_rows = removed, "member removed");
        Ok(())
    }

    /// Local check only; the provider is not consulted.
    pub async fn is_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> ServiceResult<bool> {
        Ok(self
            .store
            .find_member(channel_id, user_id, tenant_id)
            .await?
            .is_some())
    }

    pub async fn list_members(
        &self,
        channel_id: ChannelId,
        tenant_id: TenantId,
    ) -> ServiceResult<Vec<User>> {
        let scope = self.scope(tenant_id);
        let channel = scope.channel(channel_id).await?;
        scope.members(&channel).await
    }
}

#[cfg(test)]
mod tests {
    use chatgate_auth::Role;

    use super::*;
    use crate::provider::ProviderOp;
    use crate::saga::fixtures::Harness;

    #[tokio::test]
    async fn add_member_syncs_both_sides() {
        let h = Harness::new();
        let tenant = TenantId::new();
        let admin = h.user(tenant, "admin@acme.io", Role::Admin).await;
        let bob = h.user(tenant, "bob@acme.io", Role::Member).await;
        let channel = h.channel(&admin).await;

        h.coordinator.add_member(channel.id, bob.id, tenant).await.unwrap();

        assert!(h.coordinator.is_member(channel.id, bob.id, tenant).await.unwrap());
        let remote = h.provider.channel_members(&channel.remote_id).unwrap();
        assert!(remote.contains(&bob.id));
    }

    #[tokio::test]
    async fn second_add_is_already_member_and_changes_nothing() {
        let h = Harness::new();
        let tenant = TenantId::new();
        let admin = h.user(tenant, "admin@acme.io", Role::Admin).await;
        let bob = h.user(tenant, "bob@acme.io", Role::Member).await;
        let channel = h.channel(&admin).await;
        h.coordinator.add_member(channel.id, bob.id, tenant).await.unwrap();
        let rows = h.store.member_count();
        let calls = h.provider.calls(ProviderOp::AddMembers);

        let err = h.coordinator.add_member(channel.id, bob.id, tenant).await.unwrap_err();

        assert_eq!(err, ServiceError::AlreadyMember);
        assert_eq!(h.store.member_count(), rows);
        assert_eq!(h.provider.calls(ProviderOp::AddMembers), calls);
    }

    #[tokio::test]
    async fn unique_constraint_catches_duplicate_missed_by_lookup() {
        use std::sync::Arc;

        use crate::provider::InMemoryChatProvider;
        use crate::saga::fixtures::{FaultyStore, StoreFault};

        let store = Arc::new(FaultyStore::new(StoreFault::MemberLookupMisses));
        let provider = Arc::new(InMemoryChatProvider::new());
        let coordinator = MembershipCoordinator::new(store.clone(), provider.clone());
        let tenant = TenantId::new();
        let admin = User::new(tenant, "admin@acme.io", "Admin", "hash".into(), Role::Admin).unwrap();
        let bob = User::new(tenant, "bob@acme.io", "Bob", "hash".into(), Role::Member).unwrap();
        store.create_user(&admin).await.unwrap();
        store.create_user(&bob).await.unwrap();
        let new = chatgate_channels::NewChannel::new("general", None, tenant, admin.id).unwrap();
        let channel = coordinator.create_channel_with_stream_backing(new).await.unwrap();
        coordinator.add_member(channel.id, bob.id, tenant).await.unwrap();
        let rows = store.inner.member_count();
        let calls = provider.calls(ProviderOp::AddMembers);

        let err = coordinator.add_member(channel.id, bob.id, tenant).await.unwrap_err();

        assert_eq!(err, ServiceError::AlreadyMember);
        assert_eq!(store.inner.member_count(), rows);
        assert_eq!(provider.calls(ProviderOp::AddMembers), calls);
    }

    #[tokio::test]
    async fn provider_failure_on_add_leaves_no_local_row() {
        let h = Harness::new();
        let tenant = TenantId::new();
        let admin = h.user(tenant, "admin@acme.io", Role::Admin).await;
        let bob = h.user(tenant, "bob@acme.io", Role::Member).await;
        let channel = h.channel(&admin).await;
        h.provider.fail_on(ProviderOp::AddMembers);

        let err = h.coordinator.add_member(channel.id, bob.id, tenant).await.unwrap_err();

        assert!(matches!(err, ServiceError::RemoteSyncFailed(_)));
        assert!(!h.coordinator.is_member(channel.id, bob.id, tenant).await.unwrap());
    }

    #[tokio::test]
    async fn cross_tenant_user_is_not_found() {
        let h = Harness::new();
        let (ours, theirs) = (TenantId::new(), TenantId::new());
        let admin = h.user(ours, "admin@acme.io", Role::Admin).await;
        let outsider = h.user(theirs, "eve@other.io", Role::Member).await;
        let channel = h.channel(&admin).await;

        let cross = h.coordinator.add_member(channel.id, outsider.id, ours).await.unwrap_err();
        let missing = h.coordinator.add_member(channel.id, UserId::new(), ours).await.unwrap_err();
        let foreign_channel = h.coordinator.add_member(channel.id, outsider.id, theirs).await.unwrap_err();

        assert_eq!(cross, ServiceError::NotFound);
        assert_eq!(cross, missing);
        assert_eq!(foreign_channel, ServiceError::NotFound);
        assert_eq!(h.provider.calls(ProviderOp::AddMembers), 0);
    }

    #[tokio::test]
    async fn removing_a_non_member_still_calls_provider() {
        let h = Harness::new();
        let tenant = TenantId::new();
        let admin = h.user(tenant, "admin@acme.io", Role::Admin).await;
        let channel = h.channel(&admin).await;

        h.coordinator.remove_member(channel.id, UserId::new(), tenant).await.unwrap();

        assert_eq!(h.provider.calls(ProviderOp::RemoveMembers), 1);
    }

    #[tokio::test]
    async fn provider_failure_on_remove_keeps_local_removal() {
        let h = Harness::new();
        let tenant = TenantId::new();
        let admin = h.user(tenant, "admin@acme.io", Role::Admin).await;
        let bob = h.user(tenant, "bob@acme.io", Role::Member).await;
        let channel = h.channel(&admin).await;
        h.coordinator.add_member(channel.id, bob.id, tenant).await.unwrap();
        h.provider.fail_on(ProviderOp::RemoveMembers);

        let err = h.coordinator.remove_member(channel.id, bob.id, tenant).await.unwrap_err();

        assert!(matches!(err, ServiceError::RemoteSyncFailed(_)));
        assert!(!h.coordinator.is_member(channel.id, bob.id, tenant).await.unwrap());
    }

    #[tokio::test]
    async fn list_members_returns_users_in_channel() {
        let h = Harness::new();
        let tenant = TenantId::new();
        let admin = h.user(tenant, "admin@acme.io", Role::Admin).await;
        let bob = h.user(tenant, "bob@acme.io", Role::Member).await;
        let channel = h.channel(&admin).await;
        h.coordinator.add_member(channel.id, bob.id, tenant).await.unwrap();

        let mut emails: Vec<String> = h
            .coordinator
            .list_members(channel.id, tenant)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        emails.sort();

        assert_eq!(emails, vec!["admin@acme.io", "bob@acme.io"]);
        assert_eq!(
            h.coordinator.list_members(channel.id, TenantId::new()).await.unwrap_err(),
            ServiceError::NotFound
        );
    }
}
