//! In-process chat provider for tests and local development.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use chatgate_channels::RemoteChannelId;
use chatgate_core::UserId;

use super::{ChatMessage, ChatProvider, CreateRemoteChannel, ProviderError, ProviderIdentity};

/// Provider operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    UpsertIdentity,
    CreateChannel,
    DeleteChannel,
    AddMembers,
    RemoveMembers,
    IssueToken,
    SendMessage,
    QueryMessages,
}

#[derive(Debug, Default)]
struct RemoteChannel {
    members: BTreeSet<UserId>,
    metadata: Map<String, Value>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Default)]
struct State {
    identities: HashMap<String, ProviderIdentity>,
    channels: HashMap<RemoteChannelId, RemoteChannel>,
    calls: HashMap<ProviderOp, usize>,
    failing: HashSet<ProviderOp>,
}

#[derive(Debug, Default)]
pub struct InMemoryChatProvider {
    state: Mutex<State>,
}

impl InMemoryChatProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ProviderError> {
        self.state
            .lock()
            .map_err(|_| ProviderError::Rejected("in-memory provider lock poisoned".into()))
    }

    /// Count the call, then fail if `op` is armed to fail.
    fn enter(&self, op: ProviderOp) -> Result<MutexGuard<'_, State>, ProviderError> {
        let mut state = self.lock()?;
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(&op) {
            return Err(ProviderError::Api {
                status: 503,
                body: format!("injected failure for {op:?}"),
            });
        }
        Ok(state)
    }

    /// Make every subsequent `op` call fail until [`recover`](Self::recover).
    pub fn fail_on(&self, op: ProviderOp) {
        if let Ok(mut state) = self.lock() {
            state.failing.insert(op);
        }
    }

    pub fn recover(&self, op: ProviderOp) {
        if let Ok(mut state) = self.lock() {
            state.failing.remove(&op);
        }
    }

    pub fn calls(&self, op: ProviderOp) -> usize {
        self.lock()
            .map(|s| s.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn identity(&self, id: &str) -> Option<ProviderIdentity> {
        self.lock().ok()?.identities.get(id).cloned()
    }

    pub fn has_channel(&self, remote_id: &RemoteChannelId) -> bool {
        self.lock().is_ok_and(|s| s.channels.contains_key(remote_id))
    }

    pub fn channel_members(&self, remote_id: &RemoteChannelId) -> Option<Vec<UserId>> {
        let state = self.lock().ok()?;
        state
            .channels
            .get(remote_id)
            .map(|c| c.members.iter().copied().collect())
    }

    pub fn channel_metadata(&self, remote_id: &RemoteChannelId) -> Option<Map<String, Value>> {
        let state = self.lock().ok()?;
        state.channels.get(remote_id).map(|c| c.metadata.clone())
    }
}

fn unknown_channel(remote_id: &RemoteChannelId) -> ProviderError {
    ProviderError::Api {
        status: 404,
        body: format!("channel {remote_id} does not exist"),
    }
}

#[async_trait]
impl ChatProvider for InMemoryChatProvider {
    async fn upsert_identity(&self, identity: &ProviderIdentity) -> Result<(), ProviderError> {
        let mut state = self.enter(ProviderOp::UpsertIdentity)?;
        state.identities.insert(identity.id.clone(), identity.clone());
        Ok(())
    }

    async fn create_channel(
        &self,
        request: &CreateRemoteChannel,
    ) -> Result<RemoteChannelId, ProviderError> {
        let mut state = self.enter(ProviderOp::CreateChannel)?;
        if state.channels.contains_key(&request.remote_id) {
            return Err(ProviderError::Rejected(format!(
                "channel {} already exists",
                request.remote_id
            )));
        }
        state.channels.insert(
            request.remote_id.clone(),
            RemoteChannel {
                members: request.members.iter().copied().collect(),
                metadata: request.metadata.clone(),
                messages: Vec::new(),
            },
        );
        Ok(request.remote_id.clone())
    }

    async fn delete_channel(&self, remote_id: &RemoteChannelId) -> Result<(), ProviderError> {
        let mut state = self.enter(ProviderOp::DeleteChannel)?;
        state.channels.remove(remote_id);
        Ok(())
    }

    async fn add_members(
        &self,
        remote_id: &RemoteChannelId,
        user_ids: &[UserId],
    ) -> Result<(), ProviderError> {
        let mut state = self.enter(ProviderOp::AddMembers)?;
        let channel = state
            .channels
            .get_mut(remote_id)
            .ok_or_else(|| unknown_channel(remote_id))?;
        channel.members.extend(user_ids.iter().copied());
        Ok(())
    }

    async fn remove_members(
        &self,
        remote_id: &RemoteChannelId,
        user_ids: &[UserId],
    ) -> Result<(), ProviderError> {
        let mut state = self.enter(ProviderOp::RemoveMembers)?;
        let channel = state
            .channels
            .get_mut(remote_id)
            .ok_or_else(|| unknown_channel(remote_id))?;
        for user in user_ids {
            channel.members.remove(user);
        }
        Ok(())
    }

    fn issue_provider_token(
        &self,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        drop(self.enter(ProviderOp::IssueToken)?);
        Ok(format!("provider-token.{user_id}.{}", expires_at.timestamp()))
    }

    async fn send_message(
        &self,
        remote_id: &RemoteChannelId,
        sender: UserId,
        text: &str,
    ) -> Result<ChatMessage, ProviderError> {
        let mut state = self.enter(ProviderOp::SendMessage)?;
        let channel = state
            .channels
            .get_mut(remote_id)
            .ok_or_else(|| unknown_channel(remote_id))?;
        if !channel.members.contains(&sender) {
            return Err(ProviderError::Api {
                status: 403,
                body: format!("user {sender} is not a member of {remote_id}"),
            });
        }
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            user_id: Some(sender.to_string()),
            created_at: Some(Utc::now()),
        };
        channel.messages.push(message.clone());
        Ok(message)
    }

    async fn query_messages(
        &self,
        remote_id: &RemoteChannelId,
    ) -> Result<Vec<ChatMessage>, ProviderError> {
        let state = self.enter(ProviderOp::QueryMessages)?;
        state
            .channels
            .get(remote_id)
            .map(|c| c.messages.clone())
            .ok_or_else(|| unknown_channel(remote_id))
    }
}

#[cfg(test)]
mod tests {
    use chatgate_core::TenantId;

    use super::*;

    fn request(creator: UserId) -> CreateRemoteChannel {
        let tenant = TenantId::new();
        CreateRemoteChannel::new(RemoteChannelId::derive(tenant), creator, tenant, "ops", "")
    }

    #[tokio::test]
    async fn injected_failures_are_counted_and_recoverable() {
        let provider = InMemoryChatProvider::new();
        let creator = UserId::new();
        provider.fail_on(ProviderOp::CreateChannel);

        assert!(provider.create_channel(&request(creator)).await.is_err());
        provider.recover(ProviderOp::CreateChannel);
        let remote = provider.create_channel(&request(creator)).await.unwrap();

        assert_eq!(provider.calls(ProviderOp::CreateChannel), 2);
        assert_eq!(provider.channel_members(&remote), Some(vec![creator]));
    }

    #[tokio::test]
    async fn removing_a_non_member_succeeds() {
        let provider = InMemoryChatProvider::new();
        let remote = provider.create_channel(&request(UserId::new())).await.unwrap();

        provider.remove_members(&remote, &[UserId::new()]).await.unwrap();
        assert_eq!(provider.channel_members(&remote).map(|m| m.len()), Some(1));
    }

    #[tokio::test]
    async fn only_members_can_send() {
        let provider = InMemoryChatProvider::new();
        let creator = UserId::new();
        let remote = provider.create_channel(&request(creator)).await.unwrap();

        assert!(provider.send_message(&remote, UserId::new(), "hi").await.is_err());
        provider.send_message(&remote, creator, "hi").await.unwrap();

        let messages = provider.query_messages(&remote).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].user_id, Some(creator.to_string()));
    }
}
