use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chatgate_core::{ChannelId, Entity, MemberId, TenantId, TenantOwned, UserId};

use crate::Channel;

/// Join row between a channel and a user.
///
/// `(channel_id, user_id)` is unique; `tenant_id` always equals the channel's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub id: MemberId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub joined_at: DateTime<Utc>,
}

impl ChannelMember {
    /// Membership of `user_id` in `channel`, inheriting the channel's tenant.
    pub fn join(channel: &Channel, user_id: UserId, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: MemberId::new(),
            channel_id: channel.id,
            user_id,
            tenant_id: channel.tenant_id,
            joined_at,
        }
    }
}

impl Entity for ChannelMember {
    type Id = MemberId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for ChannelMember {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
