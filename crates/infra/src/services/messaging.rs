use std::sync::Arc;

use chatgate_auth::Principal;
use chatgate_channels::{Channel, RemoteChannelId};

use crate::error::{ServiceError, ServiceResult};
use crate::provider::{ChatMessage, ChatProvider};
use crate::saga::MembershipCoordinator;
use crate::scope::TenantScope;
use crate::store::CredentialStore;

/// Sending and reading messages on behalf of channel members.
#[derive(Clone)]
pub struct MessagingService {
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn ChatProvider>,
    membership: MembershipCoordinator,
}

impl MessagingService {
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

    /// Resolve the channel in the caller's tenant and require membership.
    async fn member_channel(&self, caller: &Principal, remote_id: &str) -> ServiceResult<Channel> {
        let remote_id = RemoteChannelId::new(remote_id.trim());
        let channel = TenantScope::new(self.store.as_ref(), caller.tenant_id)
            .channel_by_remote_id(&remote_id)
            .await?;
        if !self
            .membership
            .is_member(channel.id, caller.user_id, caller.tenant_id)
            .await?
        {
            return Err(ServiceError::Unauthorized);
        }
        Ok(channel)
    }

    pub async fn send_message(
        &self,
        caller: &Principal,
        remote_id: &str,
        text: &str,
    ) -> ServiceResult<ChatMessage> {
        if text.trim().is_empty() {
            return Err(ServiceError::validation("text cannot be empty"));
        }
        let channel = self.member_channel(caller, remote_id).await?;
        Ok(self
            .provider
            .send_message(&channel.remote_id, caller.user_id, text)
            .await?)
    }

    pub async fn query_messages(
        &self,
        caller: &Principal,
        remote_id: &str,
    ) -> ServiceResult<Vec<ChatMessage>> {
        let channel = self.member_channel(caller, remote_id).await?;
        Ok(self.provider.query_messages(&channel.remote_id).await?)
    }
}
