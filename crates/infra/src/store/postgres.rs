//! Postgres-backed credential store.
//!
//! Every per-tenant statement carries `tenant_id` in its WHERE clause.
//!
//! ## Error mapping
//!
//! | Failure | SQLSTATE | `StoreError` |
//! |---------|----------|--------------|
//! | Unique constraint | `23505` | `UniqueViolation(<constrained value>)` |
//! | Anything else | any | `Backend` |

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use chatgate_auth::{Role, User};
use chatgate_channels::{Channel, ChannelMember, RemoteChannelId};
use chatgate_core::{ChannelId, MemberId, Tenant, TenantId, UserId};

use super::{
    CredentialStore, StoreError, StoreResult, UNIQUE_CHANNEL_MEMBER, UNIQUE_REMOTE_CHANNEL,
    UNIQUE_TENANT_NAME, UNIQUE_USER_EMAIL,
};

const SCHEMA: &str = include_str!("schema.sql");

const USER_COLUMNS: &str = "u.id, u.tenant_id, u.email, u.name, u.password_hash, u.role";
const CHANNEL_COLUMNS: &str = "c.id, c.remote_id, c.name, c.description, c.tenant_id, c.created_by";

#[derive(Clone)]
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!("credential store schema applied");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_tenant(&self, id: TenantId) -> StoreResult<Option<Tenant>> {
        sqlx::query("SELECT id, name FROM tenants WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant", e))?
            .map(|row| tenant_from_row(&row))
            .transpose()
    }

    async fn find_tenant_by_name(&self, name: &str) -> StoreResult<Option<Tenant>> {
        sqlx::query("SELECT id, name FROM tenants WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant_by_name", e))?
            .map(|row| tenant_from_row(&row))
            .transpose()
    }

    async fn find_or_create_tenant(&self, name: &str) -> StoreResult<(Tenant, bool)> {
        let candidate = Tenant::new(name);
        let inserted = sqlx::query(
            "INSERT INTO tenants (id, name) VALUES ($1, $2) \
             ON CONFLICT ON CONSTRAINT tenants_name_unique DO NOTHING \
             RETURNING id, name",
        )
        .bind(candidate.id.as_uuid())
        .bind(&candidate.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_or_create_tenant", e))?;

        if let Some(row) = inserted {
            return Ok((tenant_from_row(&row)?, true));
        }
        match self.find_tenant_by_name(name).await? {
            Some(existing) => Ok((existing, false)),
            None => Err(StoreError::Backend(format!(
                "tenant {name:?} neither inserted nor found"
            ))),
        }
    }

    async fn create_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        sqlx::query("INSERT INTO tenants (id, name) VALUES ($1, $2)")
            .bind(tenant.id.as_uuid())
            .bind(&tenant.name)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_tenant", e))?;
        Ok(())
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        sqlx::query("SELECT id, name FROM tenants ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_tenants", e))?
            .iter()
            .map(tenant_from_row)
            .collect()
    }

    async fn find_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<Option<User>> {
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1 AND u.tenant_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user", e))?
        .map(|row| user_from_row(&row))
        .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn list_users(&self, tenant_id: TenantId) -> StoreResult<Vec<User>> {
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.tenant_id = $1 ORDER BY u.email"
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?
        .iter()
        .map(user_from_row)
        .collect()
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, tenant_id, email, name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.as_uuid())
        .bind(user.tenant_id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET email = $3, name = $4, role = $5 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(user.id.as_uuid())
        .bind(user.tenant_id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_user(&self, id: UserId, tenant_id: TenantId) -> StoreResult<u64> {
        // channel_members rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(id.as_uuid())
            .bind(tenant_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected())
    }

    async fn find_channel(&self, id: ChannelId, tenant_id: TenantId) -> StoreResult<Option<Channel>> {
        sqlx::query(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.id = $1 AND c.tenant_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_channel", e))?
        .map(|row| channel_from_row(&row))
        .transpose()
    }

    async fn find_channel_by_remote_id(
        &self,
        remote_id: &RemoteChannelId,
        tenant_id: TenantId,
    ) -> StoreResult<Option<Channel>> {
        sqlx::query(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.remote_id = $1 AND c.tenant_id = $2"
        ))
        .bind(remote_id.as_str())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_channel_by_remote_id", e))?
        .map(|row| channel_from_row(&row))
        .transpose()
    }

    async fn list_channels(&self, tenant_id: TenantId) -> StoreResult<Vec<Channel>> {
        sqlx::query(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.tenant_id = $1 ORDER BY c.id"
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_channels", e))?
        .iter()
        .map(channel_from_row)
        .collect()
    }

    async fn create_channel(&self, channel: &Channel) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO channels (id, remote_id, name, description, tenant_id, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(channel.id.as_uuid())
        .bind(channel.remote_id.as_str())
        .bind(&channel.name)
        .bind(&channel.description)
        .bind(channel.tenant_id.as_uuid())
        .bind(channel.created_by.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_channel", e))?;
        Ok(())
    }

    async fn find_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<Option<ChannelMember>> {
        sqlx::query(
            "SELECT id, channel_id, user_id, tenant_id, joined_at FROM channel_members \
             WHERE channel_id = $1 AND user_id = $2 AND tenant_id = $3",
        )
        .bind(channel_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_member", e))?
        .map(|row| member_from_row(&row))
        .transpose()
    }

    async fn create_member(&self, member: &ChannelMember) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO channel_members (id, channel_id, user_id, tenant_id, joined_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(member.id.as_uuid())
        .bind(member.channel_id.as_uuid())
        .bind(member.user_id.as_uuid())
        .bind(member.tenant_id.as_uuid())
        .bind(member.joined_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_member", e))?;
        Ok(())
    }

    async fn delete_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM channel_members \
             WHERE channel_id = $1 AND user_id = $2 AND tenant_id = $3",
        )
        .bind(channel_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_member", e))?;
        Ok(result.rows_affected())
    }

    async fn list_members_with_users(
        &self,
        channel_id: ChannelId,
        tenant_id: TenantId,
    ) -> StoreResult<Vec<User>> {
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM channel_members m \
             JOIN users u ON u.id = m.user_id \
             WHERE m.channel_id = $1 AND m.tenant_id = $2 AND u.tenant_id = $2 \
             ORDER BY m.joined_at"
        ))
        .bind(channel_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_members_with_users", e))?
        .iter()
        .map(user_from_row)
        .collect()
    }

    async fn list_channels_for_user(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> StoreResult<Vec<Channel>> {
        sqlx::query(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channel_members m \
             JOIN channels c ON c.id = m.channel_id \
             WHERE m.user_id = $1 AND m.tenant_id = $2 AND c.tenant_id = $2"
        ))
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_channels_for_user", e))?
        .iter()
        .map(channel_from_row)
        .collect()
    }
}

fn tenant_from_row(row: &PgRow) -> StoreResult<Tenant> {
    Ok(Tenant {
        id: TenantId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
    })
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = get(row, "role")?;
    Ok(User {
        id: UserId::from_uuid(get(row, "id")?),
        tenant_id: TenantId::from_uuid(get(row, "tenant_id")?),
        email: get(row, "email")?,
        name: get(row, "name")?,
        password_hash: get(row, "password_hash")?,
        role: Role::from_str(&role)
            .map_err(|_| StoreError::Backend(format!("stored role {role:?} is not recognised")))?,
    })
}

fn channel_from_row(row: &PgRow) -> StoreResult<Channel> {
    Ok(Channel {
        id: ChannelId::from_uuid(get(row, "id")?),
        remote_id: RemoteChannelId::new(get::<String>(row, "remote_id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        tenant_id: TenantId::from_uuid(get(row, "tenant_id")?),
        created_by: UserId::from_uuid(get(row, "created_by")?),
    })
}

fn member_from_row(row: &PgRow) -> StoreResult<ChannelMember> {
    Ok(ChannelMember {
        id: MemberId::from_uuid(get(row, "id")?),
        channel_id: ChannelId::from_uuid(get(row, "channel_id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        tenant_id: TenantId::from_uuid(get(row, "tenant_id")?),
        joined_at: get::<DateTime<Utc>>(row, "joined_at")?,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("decode {column}: {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::UniqueViolation(unique_target(db_err.constraint()));
        }
    }
    StoreError::Backend(format!("sqlx error in {operation}: {err}"))
}

fn unique_target(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("tenants_name_unique") => UNIQUE_TENANT_NAME,
        Some("users_email_unique") => UNIQUE_USER_EMAIL,
        Some("channels_remote_id_unique") => UNIQUE_REMOTE_CHANNEL,
        Some("channel_members_unique") => UNIQUE_CHANNEL_MEMBER,
        _ => "record",
    }
}
