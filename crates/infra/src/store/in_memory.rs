use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use chatgate_auth::User;
use chatgate_channels::{Channel, ChannelMember, RemoteChannelId};
use chatgate_core::{ChannelId, Tenant, TenantId, UserId};

use super::{
    CredentialStore, StoreError, StoreResult, UNIQUE_CHANNEL_MEMBER, UNIQUE_REMOTE_CHANNEL,
    UNIQUE_TENANT_NAME, UNIQUE_USER_EMAIL,
};

#[derive(Debug, Default)]
struct Tables {
    tenants: HashMap<TenantId, Tenant>,
    users: HashMap<UserId, User>,
    channels: HashMap<ChannelId, Channel>,
    members: Vec<ChannelMember>,
}

/// In-memory credential store for tests/dev.
///
/// One lock guards all tables, so every trait method is atomic and the
/// unique constraints hold under concurrent callers.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    /// Number of membership rows across all tenants (test inspection).
    pub fn member_count(&self) -> usize {
        self.read().map(|t| t.members.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_tenant(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        Ok(self.read()?.tenants.get(&id).cloned())
    }

    async fn find_tenant_by_name(&self, name: &str) -> StoreResult<Option<Tenant>> {
        Ok(self.read()?.tenants.values().find(|t| t.name == name).cloned())
    }

    async fn find_or_create_tenant(&self, name: &str) -> StoreResult<(Tenant, bool)> {
        let mut tables = self.write()?;
        if let Some(existing) = tables.tenants.values().find(|t| t.name == name) {
            return Ok((existing.clone(), false));
        }
        let tenant = Tenant::new(name);
        tables.tenants.insert(tenant.id, tenant.clone());
        Ok((tenant, true))
    }

    async fn create_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.tenants.values().any(|t| t.name == tenant.name) {
            return Err(StoreError::UniqueViolation(UNIQUE_TENANT_NAME));
        }
        tables.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let mut tenants: Vec<Tenant> = self.read()?.tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tenants)
    }

    async fn find_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .get(&id)
            .filter(|u| u.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, tenant_id: TenantId) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .read()?
            .users
            .values()
            .filter(|u| u.tenant_id == tenant_id)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(UNIQUE_USER_EMAIL));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<u64> {
        let mut tables = self.write()?;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::UniqueViolation(UNIQUE_USER_EMAIL));
        }
        match tables.users.get_mut(&user.id) {
            Some(existing) if existing.tenant_id == user.tenant_id => {
                *existing = user.clone();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let owned = tables.users.get(&id).is_some_and(|u| u.tenant_id == tenant_id);
        if !owned {
            return Ok(0);
        }
        tables.users.remove(&id);
        tables.members.retain(|m| m.user_id != id);
        Ok(1)
    }

    async fn find_channel(&self, id: ChannelId, tenant_id: TenantId) -> StoreResult<Option<Channel>> {
        Ok(self
            .read()?
            .channels
            .get(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_channel_by_remote_id(
        &self,
        remote_id: &RemoteChannelId,
        tenant_id: TenantId,
    ) -> StoreResult<Option<Channel>> {
        Ok(self
            .read()?
            .channels
            .values()
            .find(|c| &c.remote_id == remote_id && c.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_channels(&self, tenant_id: TenantId) -> StoreResult<Vec<Channel>> {
        let mut channels: Vec<Channel> = self
            .read()?
            .channels
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        channels.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(channels)
    }

    async fn create_channel(&self, channel: &Channel) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.channels.values().any(|c| c.remote_id == channel.remote_id) {
            return Err(StoreError::UniqueViolation(UNIQUE_REMOTE_CHANNEL));
        }
        tables.channels.insert(channel.id, channel.clone());
        Ok(())
    }

    async fn find_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<Option<ChannelMember>> {
        Ok(self
            .read()?
            .members
            .iter()
            .find(|m| m.channel_id == channel_id && m.user_id == user_id && m.tenant_id == tenant_id)
            .cloned())
    }

    async fn create_member(&self, member: &ChannelMember) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables
            .members
            .iter()
            .any(|m| m.channel_id == member.channel_id && m.user_id == member.user_id)
        {
            return Err(StoreError::UniqueViolation(UNIQUE_CHANNEL_MEMBER));
        }
        tables.members.push(member.clone());
        Ok(())
    }

    async fn delete_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let before = tables.members.len();
        tables.members.retain(|m| {
            !(m.channel_id == channel_id && m.user_id == user_id && m.tenant_id == tenant_id)
        });
        Ok((before - tables.members.len()) as u64)
    }

    async fn list_members_with_users(
        &self,
        channel_id: ChannelId,
        tenant_id: TenantId,
    ) -> StoreResult<Vec<User>> {
        let tables = self.read()?;
        Ok(tables
            .members
            .iter()
            .filter(|m| m.channel_id == channel_id && m.tenant_id == tenant_id)
            .filter_map(|m| tables.users.get(&m.user_id))
            .cloned()
            .collect())
    }

    async fn list_channels_for_user(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<Vec<Channel>> {
        let tables = self.read()?;
        Ok(tables
            .members
            .iter()
            .filter(|m| m.user_id == user_id && m.tenant_id == tenant_id)
            .filter_map(|m| tables.channels.get(&m.channel_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use chatgate_auth::Role;

    use super::*;

    fn user(tenant_id: TenantId, email: &str) -> User {
        User::new(tenant_id, email, "Someone", "hash".into(), Role::Member).unwrap()
    }

    fn channel(tenant_id: TenantId, creator: UserId) -> Channel {
        Channel {
            id: ChannelId::new(),
            remote_id: RemoteChannelId::derive(tenant_id),
            name: "general".into(),
            description: String::new(),
            tenant_id,
            created_by: creator,
        }
    }

    #[tokio::test]
    async fn find_or_create_tenant_reuses_existing_row() {
        let store = InMemoryCredentialStore::new();
        let (first, created) = store.find_or_create_tenant("Acme").await.unwrap();
        let (second, created_again) = store.find_or_create_tenant("Acme").await.unwrap();

        assert!(created);
        assert!(!created_again);
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_tenants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn email_is_globally_unique() {
        let store = InMemoryCredentialStore::new();
        store.create_user(&user(TenantId::new(), "a@x.com")).await.unwrap();

        let err = store
            .create_user(&user(TenantId::new(), "a@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UniqueViolation(UNIQUE_USER_EMAIL));
    }

    #[tokio::test]
    async fn user_lookups_are_tenant_scoped() {
        let store = InMemoryCredentialStore::new();
        let (t1, t2) = (TenantId::new(), TenantId::new());
        let u = user(t1, "a@x.com");
        store.create_user(&u).await.unwrap();

        assert!(store.find_user(u.id, t1).await.unwrap().is_some());
        assert!(store.find_user(u.id, t2).await.unwrap().is_none());
        assert!(store.list_users(t2).await.unwrap().is_empty());
        assert_eq!(store.delete_user(u.id, t2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_membership_is_rejected() {
        let store = InMemoryCredentialStore::new();
        let tenant = TenantId::new();
        let u = user(tenant, "a@x.com");
        let ch = channel(tenant, u.id);
        store.create_user(&u).await.unwrap();
        store.create_channel(&ch).await.unwrap();

        store.create_member(&ChannelMember::join(&ch, u.id, Utc::now())).await.unwrap();
        let err = store
            .create_member(&ChannelMember::join(&ch, u.id, Utc::now()))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::UniqueViolation(UNIQUE_CHANNEL_MEMBER));
        assert_eq!(store.member_count(), 1);
    }

    #[tokio::test]
    async fn deleting_user_drops_memberships() {
        let store = InMemoryCredentialStore::new();
        let tenant = TenantId::new();
        let u = user(tenant, "a@x.com");
        let ch = channel(tenant, u.id);
        store.create_user(&u).await.unwrap();
        store.create_channel(&ch).await.unwrap();
        store.create_member(&ChannelMember::join(&ch, u.id, Utc::now())).await.unwrap();

        assert_eq!(store.delete_user(u.id, tenant).await.unwrap(), 1);
        assert_eq!(store.member_count(), 0);
    }

    #[tokio::test]
    async fn delete_member_is_idempotent() {
        let store = InMemoryCredentialStore::new();
        let deleted = store
            .delete_member(ChannelId::new(), UserId::new(), TenantId::new())
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
