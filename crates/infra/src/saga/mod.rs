//! Compensating sagas that keep the credential store and the chat provider
//! in step.
//!
//! Neither side offers a shared transaction, so each operation writes
//! locally first, then calls the provider, and undoes the local write when
//! that is the safe direction. Steps run strictly in order.

pub mod membership;
pub mod provisioning;

pub use membership::MembershipCoordinator;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use async_trait::async_trait;

    use chatgate_auth::{Role, User};
    use chatgate_channels::{Channel, ChannelMember, NewChannel, RemoteChannelId};
    use chatgate_core::{ChannelId, Tenant, TenantId, UserId};

    use super::MembershipCoordinator;
    use crate::provider::InMemoryChatProvider;
    use crate::store::{CredentialStore, InMemoryCredentialStore, StoreError, StoreResult};

    pub struct Harness {
        pub store: Arc<InMemoryCredentialStore>,
        pub provider: Arc<InMemoryChatProvider>,
        pub coordinator: MembershipCoordinator,
    }

    impl Harness {
        pub fn new() -> Self {
            let store = Arc::new(InMemoryCredentialStore::new());
            let provider = Arc::new(InMemoryChatProvider::new());
            let coordinator = MembershipCoordinator::new(store.clone(), provider.clone());
            Self {
                store,
                provider,
                coordinator,
            }
        }

        pub async fn user(&self, tenant_id: TenantId, email: &str, role: Role) -> User {
            let user = User::new(tenant_id, email, "Test User", "hash".into(), role).unwrap();
            self.store.create_user(&user).await.unwrap();
            user
        }

        pub async fn channel(&self, creator: &User) -> Channel {
            let new = NewChannel::new("general", Some("team room"), creator.tenant_id, creator.id)
                .unwrap();
            self.coordinator
                .create_channel_with_stream_backing(new)
                .await
                .unwrap()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StoreFault {
        /// Every channel insert fails.
        ChannelInsert,
        /// Every membership insert fails.
        MemberInsert,
        /// `find_member` always misses, so only the unique constraint
        /// stops a duplicate membership.
        MemberLookupMisses,
    }

    /// Delegates to an in-memory store, injecting one fault.
    pub struct FaultyStore {
        pub inner: InMemoryCredentialStore,
        pub fault: StoreFault,
    }

    impl FaultyStore {
        pub fn new(fault: StoreFault) -> Self {
            Self {
                inner: InMemoryCredentialStore::new(),
                fault,
            }
        }
    }

    #[async_trait]
    impl CredentialStore for FaultyStore {
        async fn find_tenant(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
            self.inner.find_tenant(id).await
        }
        async fn find_tenant_by_name(&self, name: &str) -> StoreResult<Option<Tenant>> {
            self.inner.find_tenant_by_name(name).await
        }
        async fn find_or_create_tenant(&self, name: &str) -> StoreResult<(Tenant, bool)> {
            self.inner.find_or_create_tenant(name).await
        }
        async fn create_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
            self.inner.create_tenant(tenant).await
        }
        async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
            self.inner.list_tenants().await
        }
        async fn find_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<Option<User>> {
            self.inner.find_user(id, tenant_id).await
        }
        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_email(email).await
        }
        async fn list_users(&self, tenant_id: TenantId) -> StoreResult<Vec<User>> {
            self.inner.list_users(tenant_id).await
        }
        async fn create_user(&self, user: &User) -> StoreResult<()> {
            self.inner.create_user(user).await
        }
        async fn update_user(&self, user: &User) -> StoreResult<u64> {
            self.inner.update_user(user).await
        }
        async fn delete_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<u64> {
            self.inner.delete_user(id, tenant_id).await
        }
        async fn find_channel(&self, id: ChannelId, tenant_id: TenantId) -> StoreResult<Option<Channel>> {
            self.inner.find_channel(id, tenant_id).await
        }
        async fn find_channel_by_remote_id(
            &self,
            remote_id: &RemoteChannelId,
            tenant_id: TenantId,
        ) -> StoreResult<Option<Channel>> {
            self.inner.find_channel_by_remote_id(remote_id, tenant_id).await
        }
        async fn list_channels(&self, tenant_id: TenantId) -> StoreResult<Vec<Channel>> {
            self.inner.list_channels(tenant_id).await
        }
        async fn create_channel(&self, channel: &Channel) -> StoreResult<()> {
            if self.fault == StoreFault::ChannelInsert {
                return Err(StoreError::Backend("disk full".into()));
            }
            self.inner.create_channel(channel).await
        }
        async fn find_member(
            &self,
            channel_id: ChannelId,
            user_id: UserId,
            tenant_id: TenantId,
        ) -> StoreResult<Option<ChannelMember>> {
            if self.fault == StoreFault::MemberLookupMisses {
                return Ok(None);
            }
            self.inner.find_member(channel_id, user_id, tenant_id).await
        }
        async fn create_member(&self, member: &ChannelMember) -> StoreResult<()> {
            if self.fault == StoreFault::MemberInsert {
                return Err(StoreError::Backend("connection reset".into()));
            }
            self.inner.create_member(member).await
        }
        async fn delete_member(
            &self,
            channel_id: ChannelId,
            user_id: UserId,
            tenant_id: TenantId,
        ) -> StoreResult<u64> {
            self.inner.delete_member(channel_id, user_id, tenant_id).await
        }
        async fn list_members_with_users(
            &self,
            channel_id: ChannelId,
            tenant_id: TenantId,
        ) -> StoreResult<Vec<User>> {
            self.inner.list_members_with_users(channel_id, tenant_id).await
        }
        async fn list_channels_for_user(
            &self,
            user_id: UserId,
            tenant_id: TenantId,
        ) -> StoreResult<Vec<Channel>> {
            self.inner.list_channels_for_user(user_id, tenant_id).await
        }
    }
}
