//! Credential store: tenants, users, channels and channel memberships.
//!
//! Every per-tenant query takes the tenant id as a parameter and filters on
//! it; the store never answers a per-tenant question across tenants.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use chatgate_auth::User;
use chatgate_channels::{Channel, ChannelMember, RemoteChannelId};
use chatgate_core::{ChannelId, Tenant, TenantId, UserId};

pub use in_memory::InMemoryCredentialStore;
pub use postgres::PostgresCredentialStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write. Names the constrained value.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(&'static str),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub const UNIQUE_TENANT_NAME: &str = "tenant name";
pub const UNIQUE_USER_EMAIL: &str = "email";
pub const UNIQUE_REMOTE_CHANNEL: &str = "remote channel id";
pub const UNIQUE_CHANNEL_MEMBER: &str = "channel membership";

/// Tenant-isolated persistence for the access-control layer.
///
/// Each method is its own atomic unit; no operation spans several writes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // ── tenants (not tenant-scoped) ────────────────────────────────────────
    async fn find_tenant(&self, id: TenantId) -> StoreResult<Option<Tenant>>;
    async fn find_tenant_by_name(&self, name: &str) -> StoreResult<Option<Tenant>>;
    /// Atomic find-or-create. The flag is `true` when a row was inserted.
    async fn find_or_create_tenant(&self, name: &str) -> StoreResult<(Tenant, bool)>;
    async fn create_tenant(&self, tenant: &Tenant) -> StoreResult<()>;
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;

    // ── users ──────────────────────────────────────────────────────────────
    async fn find_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<Option<User>>;
    /// Email is globally unique, so this lookup is not tenant-scoped. It is
    /// only used to authenticate a login.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self, tenant_id: TenantId) -> StoreResult<Vec<User>>;
    async fn create_user(&self, user: &User) -> StoreResult<()>;
    /// Rows affected; zero when the user is absent from `user.tenant_id`.
    async fn update_user(&self, user: &User) -> StoreResult<u64>;
    /// Removes the user and their membership rows.
    async fn delete_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<u64>;

    // ── channels ───────────────────────────────────────────────────────────
    async fn find_channel(&self, id: ChannelId, tenant_id: TenantId) -> StoreResult<Option<Channel>>;
    async fn find_channel_by_remote_id(
        &self,
        remote_id: &RemoteChannelId,
        tenant_id: TenantId,
    ) -> StoreResult<Option<Channel>>;
    async fn list_channels(&self, tenant_id: TenantId) -> StoreResult<Vec<Channel>>;
    async fn create_channel(&self, channel: &Channel) -> StoreResult<()>;

    // ── memberships ────────────────────────────────────────────────────────
    async fn find_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<Option<ChannelMember>>;
    /// Fails with `UniqueViolation(UNIQUE_CHANNEL_MEMBER)` on a duplicate
    /// `(channel_id, user_id)`.
    async fn create_member(&self, member: &ChannelMember) -> StoreResult<()>;
    /// Rows affected; deleting nothing is not an error.
    async fn delete_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<u64>;
    async fn list_members_with_users(
        &self,
        channel_id: ChannelId,
        tenant_id: TenantId,
    ) -> StoreResult<Vec<User>>;
    async fn list_channels_for_user(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<Vec<Channel>>;
}
