use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use chatgate_auth::{
    hash_password, verify_password, Principal, Role, TokenService, User, TOKEN_LIFETIME_HOURS,
};
use chatgate_auth::user::{normalize_email, normalize_name};
use chatgate_core::non_blank;

use super::provision_user;
use crate::error::{ServiceError, ServiceResult};
use crate::provider::ChatProvider;
use crate::scope::TenantScope;
use crate::store::{CredentialStore, StoreError, UNIQUE_USER_EMAIL};

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Raw role name, matched case-insensitively.
    pub role: String,
    pub org_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Registration, login and the caller's own identity.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn ChatProvider>,
    tokens: Arc<TokenService>,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn ChatProvider>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            provider,
            tokens,
        }
    }

    /// Sign up into the tenant named `org_name`, creating it on first use.
    pub async fn register(&self, input: RegisterInput) -> ServiceResult<AuthSession> {
        let role: Role = input.role.parse()?;
        let org_name = non_blank("org_name", &input.org_name)?;
        let email = normalize_email(&input.email)?;
        let name = normalize_name(&input.name)?;
        if input.password.is_empty() {
            return Err(ServiceError::validation("password cannot be empty"));
        }
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(StoreError::UniqueViolation(UNIQUE_USER_EMAIL).into());
        }

        // Tenant rows only appear once the user fields are known to be acceptable.
        let (tenant, created) = self.store.find_or_create_tenant(&org_name).await?;
        if created {
            tracing::info!(tenant_id = %tenant.id, name = %tenant.name, "tenant created on registration");
        }

        let hash = hash_password(&input.password)?;
        let user = User::new(tenant.id, &email, &name, hash, role)?;
        provision_user(self.store.as_ref(), self.provider.as_ref(), &user).await?;

        let token = self.tokens.issue(&user)?;
        tracing::info!(tenant_id = %user.tenant_id, user_id = %user.id, role = %user.role, "user registered");
        Ok(AuthSession { token, user })
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let email = normalize_email(email).map_err(|_| ServiceError::InvalidCredentials)?;
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        Ok(AuthSession { token, user })
    }

    pub async fn current_user(&self, caller: &Principal) -> ServiceResult<User> {
        TenantScope::new(self.store.as_ref(), caller.tenant_id)
            .user(caller.user_id)
            .await
    }

    /// Token the caller presents to the chat provider directly.
    pub fn provider_token(&self, caller: &Principal) -> ServiceResult<ProviderToken> {
        let expires_at = Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS);
        let token = self
            .provider
            .issue_provider_token(caller.user_id, expires_at)?;
        Ok(ProviderToken { token, expires_at })
    }
}
