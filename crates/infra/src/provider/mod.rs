//! External chat provider boundary.
//!
//! The provider owns channels, members and messages on its side; this crate
//! owns the tenant-aware record of who may touch them. Every call here is a
//! remote side effect and may fail independently of the local store.

pub mod in_memory;
pub mod stream;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use chatgate_auth::{Role, User};
use chatgate_channels::RemoteChannelId;
use chatgate_core::{TenantId, UserId};

pub use in_memory::{InMemoryChatProvider, ProviderOp};
pub use stream::{StreamChatClient, StreamConfig};

/// Provider channel type used for every channel this service creates.
pub const CHANNEL_KIND: &str = "messaging";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider network error: {0}")]
    Network(String),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider response could not be decoded: {0}")]
    Decode(String),

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("provider token signing failed: {0}")]
    Token(String),
}

/// Provider-side role name for an application role.
pub fn provider_role(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Moderator => "channel_moderator",
        Role::Member => "user",
        Role::Guest => "guest",
    }
}

/// A user as the provider sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderIdentity {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, Value>,
}

impl ProviderIdentity {
    pub fn for_user(user: &User) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert("tenant_id".into(), json!(user.tenant_id.to_string()));
        metadata.insert("email".into(), json!(user.email));
        metadata.insert("app_role".into(), json!(user.role.as_str()));
        Self {
            id: user.id.to_string(),
            display_name: user.name.clone(),
            role: provider_role(user.role).to_string(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRemoteChannel {
    pub remote_id: RemoteChannelId,
    pub creator_id: UserId,
    pub members: Vec<UserId>,
    pub metadata: serde_json::Map<String, Value>,
}

impl CreateRemoteChannel {
    /// Request for a channel with the creator as its only member.
    pub fn new(
        remote_id: RemoteChannelId,
        creator_id: UserId,
        tenant_id: TenantId,
        name: &str,
        description: &str,
    ) -> Self {
        let mut metadata = serde_json::Map::new();
        metadata.insert("tenant_id".into(), json!(tenant_id.to_string()));
        metadata.insert("name".into(), json!(name));
        metadata.insert("description".into(), json!(description));
        Self {
            remote_id,
            creator_id,
            members: vec![creator_id],
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn upsert_identity(&self, identity: &ProviderIdentity) -> Result<(), ProviderError>;

    /// Create the channel and return the id the provider confirmed.
    async fn create_channel(
        &self,
        request: &CreateRemoteChannel,
    ) -> Result<RemoteChannelId, ProviderError>;

    async fn delete_channel(&self, remote_id: &RemoteChannelId) -> Result<(), ProviderError>;

    async fn add_members(
        &self,
        remote_id: &RemoteChannelId,
        user_ids: &[UserId],
    ) -> Result<(), ProviderError>;

    /// Removing users who are not members succeeds.
    async fn remove_members(
        &self,
        remote_id: &RemoteChannelId,
        user_ids: &[UserId],
    ) -> Result<(), ProviderError>;

    /// Client-side token the user presents to the provider directly.
    fn issue_provider_token(
        &self,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, ProviderError>;

    async fn send_message(
        &self,
        remote_id: &RemoteChannelId,
        sender: UserId,
        text: &str,
    ) -> Result<ChatMessage, ProviderError>;

    async fn query_messages(
        &self,
        remote_id: &RemoteChannelId,
    ) -> Result<Vec<ChatMessage>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mapping_matches_provider_vocabulary() {
        assert_eq!(provider_role(Role::Admin), "admin");
        assert_eq!(provider_role(Role::Moderator), "channel_moderator");
        assert_eq!(provider_role(Role::Member), "user");
        assert_eq!(provider_role(Role::Guest), "guest");
    }

    #[test]
    fn identity_carries_tenant_email_and_app_role() {
        let user = User::new(TenantId::new(), "Ann@X.com", "Ann", "h".into(), Role::Moderator)
            .unwrap();
        let identity = ProviderIdentity::for_user(&user);
        let body = serde_json::to_value(&identity).unwrap();

        assert_eq!(body["id"], user.id.to_string());
        assert_eq!(body["name"], "Ann");
        assert_eq!(body["role"], "channel_moderator");
        assert_eq!(body["tenant_id"], user.tenant_id.to_string());
        assert_eq!(body["email"], "ann@x.com");
        assert_eq!(body["app_role"], "MODERATOR");
    }

    #[test]
    fn channel_request_lists_creator_as_member() {
        let tenant = TenantId::new();
        let creator = UserId::new();
        let req = CreateRemoteChannel::new(
            RemoteChannelId::derive(tenant),
            creator,
            tenant,
            "general",
            "",
        );
        assert_eq!(req.members, vec![creator]);
        assert_eq!(req.metadata["name"], "general");
        assert_eq!(req.metadata["tenant_id"], tenant.to_string());
    }
}
