use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use chatgate_api::app::{build_router, AppServices};
use chatgate_auth::{JwtClaims, TokenService};
use chatgate_core::{TenantId, UserId};
use chatgate_infra::provider::{InMemoryChatProvider, ProviderOp};
use chatgate_infra::store::InMemoryCredentialStore;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    provider: Arc<InMemoryChatProvider>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory adapters, ephemeral port.
        let store = Arc::new(InMemoryCredentialStore::new());
        let provider = Arc::new(InMemoryChatProvider::new());
        let tokens = Arc::new(TokenService::new(JWT_SECRET.as_bytes()));
        let services = Arc::new(AppServices::new(store, provider.clone(), tokens.clone()));
        let app = build_router(services, tokens);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            provider,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, email: &str, role: &str, org: &str) -> Value {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({
                "name": "Test User",
                "email": email,
                "password": "correct horse",
                "role": role,
                "org_name": org,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(role: Option<&str>, exp: i64) -> String {
    let claims = JwtClaims {
        user_id: UserId::new().to_string(),
        tenant_id: TenantId::new().to_string(),
        role: role.map(str::to_string),
        exp,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn token(session: &Value) -> String {
    session["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let missing = srv.client.get(srv.url("/me")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = srv.get("/channels", "not-a-jwt").await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(Some("ADMIN"), (Utc::now() - ChronoDuration::minutes(1)).timestamp());
    assert_eq!(srv.get("/channels", &expired).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_without_role_is_forbidden_everywhere() {
    let srv = TestServer::spawn().await;
    let roleless = mint_jwt(None, (Utc::now() + ChronoDuration::hours(1)).timestamp());

    assert_eq!(srv.get("/channels", &roleless).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(srv.get("/tenants", &roleless).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registration_shares_tenant_and_login_works() {
    let srv = TestServer::spawn().await;

    let admin = srv.register("admin@acme.io", "ADMIN", "Acme").await;
    let member = srv.register("member@acme.io", "MEMBER", "Acme").await;
    assert_eq!(admin["tenant_id"], member["tenant_id"]);
    assert_eq!(admin["role"], "ADMIN");

    let identity = srv.provider.identity(admin["id"].as_str().unwrap()).unwrap();
    assert_eq!(identity.role, "admin");

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "admin@acme.io", "password": "correct horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let session: Value = res.json().await.unwrap();

    let me: Value = srv.get("/me", &token(&session)).await.json().await.unwrap();
    assert_eq!(me["email"], "admin@acme.io");

    let bad = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "admin@acme.io", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn channel_lifecycle_with_membership_and_messages() {
    let srv = TestServer::spawn().await;
    let admin = token(&srv.register("admin@acme.io", "ADMIN", "Acme").await);
    let member_session = srv.register("member@acme.io", "MEMBER", "Acme").await;
    let member = token(&member_session);
    let member_id = member_session["id"].as_str().unwrap().to_string();

    // Members may not create channels.
    let denied = srv.post("/channels", &member, json!({ "name": "general" })).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post("/channels", &admin, json!({ "name": "general", "description": "all hands" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let channel: Value = res.json().await.unwrap();
    let channel_id = channel["id"].as_str().unwrap().to_string();
    let remote_id = channel["remote_id"].as_str().unwrap().to_string();

    // Not yet a member: cannot post.
    let res = srv
        .post("/messages", &member, json!({ "remote_id": remote_id, "text": "hi" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post(&format!("/channels/{channel_id}/members"), &admin, json!({ "user_id": member_id }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let again = srv
        .post(&format!("/channels/{channel_id}/members"), &admin, json!({ "user_id": member_id }))
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let res = srv
        .post("/messages", &member, json!({ "stream_id": remote_id, "text": "hello" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = srv
        .get(&format!("/messages/{remote_id}"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["messages"][0]["text"], "hello");

    let members: Value = srv
        .get(&format!("/channels/{channel_id}/members"), &member)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(members.as_array().unwrap().len(), 2);

    let left = srv.post(&format!("/channels/{channel_id}/leave"), &member, json!({})).await;
    assert_eq!(left.status(), StatusCode::OK);
    assert_eq!(srv.provider.calls(ProviderOp::RemoveMembers), 1);
}

#[tokio::test]
async fn other_tenants_see_not_found() {
    let srv = TestServer::spawn().await;
    let acme = token(&srv.register("admin@acme.io", "ADMIN", "Acme").await);
    let globex = token(&srv.register("admin@globex.io", "ADMIN", "Globex").await);

    let channel: Value = srv
        .post("/channels", &acme, json!({ "name": "secret" }))
        .await
        .json()
        .await
        .unwrap();
    let channel_id = channel["id"].as_str().unwrap();
    let remote_id = channel["remote_id"].as_str().unwrap();

    let foreign = srv.get(&format!("/channels/{channel_id}/members"), &globex).await;
    let missing = srv
        .get(&format!("/channels/{}/members", uuid::Uuid::new_v4()), &globex)
        .await;
    let malformed = srv.get("/channels/not-a-uuid/members", &globex).await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(malformed.status(), StatusCode::NOT_FOUND);

    let foreign_body: Value = foreign.json().await.unwrap();
    let missing_body: Value = missing.json().await.unwrap();
    assert_eq!(foreign_body, missing_body);

    let messages = srv.get(&format!("/messages/{remote_id}"), &globex).await;
    assert_eq!(messages.status(), StatusCode::NOT_FOUND);

    let listed: Value = srv.get("/channels", &globex).await.json().await.unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn provider_outage_on_join_surfaces_bad_gateway_without_local_row() {
    let srv = TestServer::spawn().await;
    let admin = token(&srv.register("admin@acme.io", "ADMIN", "Acme").await);
    let guest = token(&srv.register("guest@acme.io", "GUEST", "Acme").await);

    let channel: Value = srv
        .post("/channels", &admin, json!({ "name": "general" }))
        .await
        .json()
        .await
        .unwrap();
    let channel_id = channel["id"].as_str().unwrap();

    srv.provider.fail_on(ProviderOp::AddMembers);
    let res = srv.post(&format!("/channels/{channel_id}/join"), &guest, json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "remote_sync_failed");

    let members: Value = srv
        .get(&format!("/channels/{channel_id}/members"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(members.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tenant_creation_is_admin_only() {
    let srv = TestServer::spawn().await;
    let admin = token(&srv.register("admin@acme.io", "ADMIN", "Acme").await);
    let moderator = token(&srv.register("mod@acme.io", "MODERATOR", "Acme").await);

    let denied = srv.post("/tenants", &moderator, json!({ "name": "Initech" })).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let created = srv.post("/tenants", &admin, json!({ "name": "Initech" })).await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = srv.post("/tenants", &admin, json!({ "name": "Initech" })).await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}
