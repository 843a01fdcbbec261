//! Channel provisioning saga.
//!
//! 1. Create the provider channel (derived remote id, creator as member)
//! 2. Persist the local channel row
//! 3. Insert the creator's membership row
//!
//! Compensating action: delete the provider channel if step 2 fails.
//! A failure in step 3 keeps the channel; the creator can join it later.

use chrono::Utc;

use chatgate_channels::{Channel, ChannelMember, NewChannel, RemoteChannelId};
use chatgate_core::TenantId;

use super::MembershipCoordinator;
use crate::error::{ServiceError, ServiceResult};
use crate::provider::CreateRemoteChannel;

impl MembershipCoordinator {
    pub async fn create_channel_with_stream_backing(
        &self,
        new: NewChannel,
    ) -> ServiceResult<Channel> {
        let request = CreateRemoteChannel::new(
            RemoteChannelId::derive(new.tenant_id),
            new.created_by,
            new.tenant_id,
            &new.name,
            &new.description,
        );

        let remote_id = self.provider.create_channel(&request).await.map_err(|err| {
            tracing::error!(
                tenant_id = %new.tenant_id,
                remote_id = %request.remote_id,
                error = %err,
                "provider channel creation failed"
            );
            ServiceError::internal(format!("failed to create provider channel: {err}"))
        })?;

        let channel = new.into_channel(remote_id);
        if let Err(err) = self.store.create_channel(&channel).await {
            tracing::warn!(
                tenant_id = %channel.tenant_id,
                remote_id = %channel.remote_id,
                error = %err,
                "local channel insert failed; deleting provider channel"
            );
            if let Err(undo) = self.provider.delete_channel(&channel.remote_id).await {
                tracing::error!(
                    remote_id = %channel.remote_id,
                    error = %undo,
                    "orphaned provider channel left behind"
                );
            }
            return Err(ServiceError::internal(format!("failed to save channel: {err}")));
        }

        let creator = ChannelMember::join(&channel, channel.created_by, Utc::now());
        if let Err(err) = self.store.create_member(&creator).await {
            tracing::error!(
                channel_id = %channel.id,
                user_id = %channel.created_by,
                error = %err,
                "creator membership insert failed"
            );
            return Err(ServiceError::internal(format!(
                "channel created but creator membership failed: {err}"
            )));
        }

        tracing::info!(
            tenant_id = %channel.tenant_id,
            channel_id = %channel.id,
            remote_id = %channel.remote_id,
            "channel created"
        );
        Ok(channel)
    }

    pub async fn list_channels(&self, tenant_id: TenantId) -> ServiceResult<Vec<Channel>> {
        self.scope(tenant_id).channels().await
    }
}
