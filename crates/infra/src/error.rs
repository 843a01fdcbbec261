//! Caller-facing error taxonomy shared by every service operation.

use thiserror::Error;

use chatgate_auth::{AuthError, AuthzError};
use chatgate_core::DomainError;

use crate::provider::ProviderError;
use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Missing, malformed, expired or wrongly signed token.
    #[error("invalid token")]
    InvalidToken,

    /// Unknown email or wrong password; the two are not distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The caller's role is not on the action's allow-list.
    #[error("insufficient permissions")]
    Unauthorized,

    /// Absent, or owned by another tenant. Both produce this same value.
    #[error("not found or access denied")]
    NotFound,

    #[error("user already in channel")]
    AlreadyMember,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// The provider call failed after the local store was changed.
    #[error("remote sync failed: {0}")]
    RemoteSyncFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Server-side failures: logged with detail, never shown to the caller.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::RemoteSyncFailed(_) | Self::Internal(_))
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(what) => Self::Conflict(format!("{what} already exists")),
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => Self::InvalidToken,
            AuthError::Signing(msg) | AuthError::PasswordHash(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(_: AuthzError) -> Self {
        Self::Unauthorized
    }
}

/// Provider failures with no preceding local change are internal errors;
/// call sites that already mutated local state map to `RemoteSyncFailed`.
impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        Self::Internal(err.to_string())
    }
}
