//! Tenant scoping guard.
//!
//! Every lookup made on behalf of a caller goes through a [`TenantScope`]
//! bound to the caller's tenant. A record owned by another tenant and a
//! record that does not exist produce the same [`ServiceError::NotFound`].

use std::str::FromStr;

use chatgate_auth::User;
use chatgate_channels::{Channel, RemoteChannelId};
use chatgate_core::{ChannelId, TenantId, TenantOwned, UserId};

use crate::error::{ServiceError, ServiceResult};
use crate::store::CredentialStore;

/// Parse a caller-supplied id. Malformed ids are `NotFound`, never `Validation`.
pub fn parse_id<T: FromStr>(raw: &str) -> ServiceResult<T> {
    raw.trim().parse().map_err(|_| ServiceError::NotFound)
}

#[derive(Clone, Copy)]
pub struct TenantScope<'a> {
    store: &'a dyn CredentialStore,
    tenant_id: TenantId,
}

impl<'a> TenantScope<'a> {
    pub fn new(store: &'a dyn CredentialStore, tenant_id: TenantId) -> Self {
        Self { store, tenant_id }
    }

    fn owned<T: TenantOwned>(&self, record: Option<T>) -> ServiceResult<T> {
        record
            .filter(|r| r.belongs_to(self.tenant_id))
            .ok_or(ServiceError::NotFound)
    }

    fn retain_owned<T: TenantOwned>(&self, records: Vec<T>) -> Vec<T> {
        records
            .into_iter()
            .filter(|r| r.belongs_to(self.tenant_id))
            .collect()
    }

    pub async fn channel(&self, id: ChannelId) -> ServiceResult<Channel> {
        self.owned(self.store.find_channel(id, self.tenant_id).await?)
    }

    pub async fn channel_by_remote_id(&self, remote_id: &RemoteChannelId) -> ServiceResult<Channel> {
        self.owned(
            self.store
                .find_channel_by_remote_id(remote_id, self.tenant_id)
                .await?,
        )
    }

    pub async fn user(&self, id: UserId) -> ServiceResult<User> {
        self.owned(self.store.find_user(id, self.tenant_id).await?)
    }

    pub async fn channels(&self) -> ServiceResult<Vec<Channel>> {
        Ok(self.retain_owned(self.store.list_channels(self.tenant_id).await?))
    }

    pub async fn users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.retain_owned(self.store.list_users(self.tenant_id).await?))
    }

    pub async fn members(&self, channel: &Channel) -> ServiceResult<Vec<User>> {
        if !channel.belongs_to(self.tenant_id) {
            return Err(ServiceError::NotFound);
        }
        Ok(self.retain_owned(
            self.store
                .list_members_with_users(channel.id, self.tenant_id)
                .await?,
        ))
    }

    pub async fn channels_for_user(&self, user_id: UserId) -> ServiceResult<Vec<Channel>> {
        Ok(self.retain_owned(
            self.store
                .list_channels_for_user(user_id, self.tenant_id)
                .await?,
        ))
    }
}
