//! HTTP client for a Stream-Chat-compatible provider.
//!
//! Server-side calls authenticate with a JWT `{"server": true}` signed by the
//! API secret, sent as `Authorization` together with `Stream-Auth-Type: jwt`,
//! and the API key as the `api_key` query parameter.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use chatgate_channels::RemoteChannelId;
use chatgate_core::UserId;

use super::{
    ChatMessage, ChatProvider, CreateRemoteChannel, ProviderError, ProviderIdentity, CHANNEL_KIND,
};

static SHARED: OnceLock<Arc<StreamChatClient>> = OnceLock::new();

#[derive(Clone)]
pub struct StreamConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl core::fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct StreamChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    signing_key: EncodingKey,
    server_token: String,
}

#[derive(Serialize)]
struct UserTokenClaims<'a> {
    user_id: &'a str,
    exp: i64,
}

#[derive(Deserialize)]
struct WireUser {
    id: String,
}

#[derive(Deserialize)]
struct WireMessage {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    user: Option<WireUser>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<WireMessage> for ChatMessage {
    fn from(msg: WireMessage) -> Self {
        Self {
            id: msg.id,
            text: msg.text,
            user_id: msg.user.map(|u| u.id),
            created_at: msg.created_at,
        }
    }
}

#[derive(Deserialize)]
struct WireChannel {
    id: String,
}

#[derive(Deserialize)]
struct ChannelStateResponse {
    channel: Option<WireChannel>,
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    message: WireMessage,
}

impl StreamChatClient {
    pub fn new(config: &StreamConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let signing_key = EncodingKey::from_secret(config.api_secret.as_bytes());
        let server_token = encode(
            &Header::new(Algorithm::HS256),
            &json!({ "server": true }),
            &signing_key,
        )
        .map_err(|e| ProviderError::Token(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            signing_key,
            server_token,
        })
    }

    /// Process-wide client, built on first use. Later calls ignore `config`.
    pub fn shared(config: &StreamConfig) -> Result<Arc<Self>, ProviderError> {
        if let Some(existing) = SHARED.get() {
            return Ok(Arc::clone(existing));
        }
        let client = Arc::new(Self::new(config)?);
        Ok(Arc::clone(SHARED.get_or_init(|| client)))
    }

    fn channel_path(remote_id: &RemoteChannelId) -> String {
        format!("/channels/{CHANNEL_KIND}/{}", remote_id.as_str())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .query(&[("api_key", self.api_key.as_str())])
            .header("Authorization", &self.server_token)
            .header("Stream-Auth-Type", "jwt")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), %body, "provider request failed");
        Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ProviderError> {
        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn update_members(
        &self,
        remote_id: &RemoteChannelId,
        field: &str,
        user_ids: &[UserId],
    ) -> Result<(), ProviderError> {
        let ids: Vec<String> = user_ids.iter().map(ToString::to_string).collect();
        let mut body = Map::new();
        body.insert(field.to_string(), json!(ids));
        self.send(
            self.request(Method::POST, &Self::channel_path(remote_id))
                .json(&Value::Object(body)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatProvider for StreamChatClient {
    async fn upsert_identity(&self, identity: &ProviderIdentity) -> Result<(), ProviderError> {
        let mut users = Map::new();
        users.insert(
            identity.id.clone(),
            serde_json::to_value(identity).map_err(|e| ProviderError::Decode(e.to_string()))?,
        );
        let body = json!({ "users": users });
        self.send(self.request(Method::POST, "/users").json(&body)).await?;
        Ok(())
    }

    async fn create_channel(
        &self,
        request: &CreateRemoteChannel,
    ) -> Result<RemoteChannelId, ProviderError> {
        let mut data = request.metadata.clone();
        data.insert("created_by_id".into(), json!(request.creator_id.to_string()));
        let members: Vec<String> = request.members.iter().map(ToString::to_string).collect();
        data.insert("members".into(), json!(members));

        let path = format!("{}/query", Self::channel_path(&request.remote_id));
        let response = self
            .send(self.request(Method::POST, &path).json(&json!({ "data": data })))
            .await?;
        let state: ChannelStateResponse = Self::decode(response).await?;

        match state.channel {
            Some(channel) => Ok(RemoteChannelId::new(channel.id)),
            None => Err(ProviderError::Decode("channel missing from create response".into())),
        }
    }

    async fn delete_channel(&self, remote_id: &RemoteChannelId) -> Result<(), ProviderError> {
        self.send(
            self.request(Method::DELETE, &Self::channel_path(remote_id))
                .query(&[("hard_delete", "true")]),
        )
        .await?;
        Ok(())
    }

    async fn add_members(
        &self,
        remote_id: &RemoteChannelId,
        user_ids: &[UserId],
    ) -> Result<(), ProviderError> {
        self.update_members(remote_id, "add_members", user_ids).await
    }

    async fn remove_members(
        &self,
        remote_id: &RemoteChannelId,
        user_ids: &[UserId],
    ) -> Result<(), ProviderError> {
        self.update_members(remote_id, "remove_members", user_ids).await
    }

    fn issue_provider_token(
        &self,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        let user_id = user_id.to_string();
        let claims = UserTokenClaims {
            user_id: &user_id,
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.signing_key)
            .map_err(|e| ProviderError::Token(e.to_string()))
    }

    async fn send_message(
        &self,
        remote_id: &RemoteChannelId,
        sender: UserId,
        text: &str,
    ) -> Result<ChatMessage, ProviderError> {
        let path = format!("{}/message", Self::channel_path(remote_id));
        let body = json!({ "message": { "text": text, "user_id": sender.to_string() } });
        let response = self.send(self.request(Method::POST, &path).json(&body)).await?;
        let sent: SendMessageResponse = Self::decode(response).await?;
        Ok(sent.message.into())
    }

    async fn query_messages(
        &self,
        remote_id: &RemoteChannelId,
    ) -> Result<Vec<ChatMessage>, ProviderError> {
        let path = format!("{}/query", Self::channel_path(remote_id));
        let response = self
            .send(self.request(Method::POST, &path).json(&json!({ "state": true })))
            .await?;
        let state: ChannelStateResponse = Self::decode(response).await?;
        Ok(state.messages.into_iter().map(ChatMessage::from).collect())
    }
}
