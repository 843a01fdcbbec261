use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatgate_core::{non_blank, ChannelId, DomainResult, Entity, TenantId, TenantOwned, UserId};

/// Number of tenant-id characters embedded in a remote channel id.
pub const REMOTE_TENANT_PREFIX_LEN: usize = 8;

/// The chat provider's identifier for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteChannelId(String);

impl RemoteChannelId {
    /// Derive a fresh remote id: `<first 8 chars of tenant id>-<uuid v4>`.
    ///
    /// Stays within the provider's 64 character limit while keeping the
    /// tenant visible in provider-side tooling.
    pub fn derive(tenant_id: TenantId) -> Self {
        let tenant = tenant_id.to_string();
        let prefix: String = tenant.chars().take(REMOTE_TENANT_PREFIX_LEN).collect();
        Self(format!("{prefix}-{}", Uuid::new_v4()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RemoteChannelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated input for provisioning a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub name: String,
    pub description: String,
    pub tenant_id: TenantId,
    pub created_by: UserId,
}

impl NewChannel {
    pub fn new(
        name: &str,
        description: Option<&str>,
        tenant_id: TenantId,
        created_by: UserId,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: non_blank("name", name)?,
            description: description.map(str::trim).unwrap_or_default().to_string(),
            tenant_id,
            created_by,
        })
    }

    /// The local row for this channel once the provider has assigned `remote_id`.
    pub fn into_channel(self, remote_id: RemoteChannelId) -> Channel {
        Channel {
            id: ChannelId::new(),
            remote_id,
            name: self.name,
            description: self.description,
            tenant_id: self.tenant_id,
            created_by: self.created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub remote_id: RemoteChannelId,
    pub name: String,
    pub description: String,
    pub tenant_id: TenantId,
    pub created_by: UserId,
}

impl Entity for Channel {
    type Id = ChannelId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Channel {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
