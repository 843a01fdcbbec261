use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chatgate_core::{TenantId, UserId};

use crate::{Principal, Role};

/// Wire-level JWT claims.
///
/// Ids travel as strings and `exp` as a unix timestamp. `role` is optional on
/// the wire so that a token without one still decodes and then fails every
/// authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: String,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("malformed claim: {0}")]
    MalformedClaim(&'static str),
}

/// Deterministically validate decoded claims against `now`.
///
/// Signature verification happens before this in [`crate::TokenService`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if now.timestamp() >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

impl JwtClaims {
    /// Convert to the typed request principal.
    ///
    /// Unknown role strings become `None` (fail closed); malformed ids reject
    /// the whole token.
    pub fn into_principal(self) -> Result<Principal, TokenValidationError> {
        let user_id: UserId = self
            .user_id
            .parse()
            .map_err(|_| TokenValidationError::MalformedClaim("user_id"))?;
        let tenant_id: TenantId = self
            .tenant_id
            .parse()
            .map_err(|_| TokenValidationError::MalformedClaim("tenant_id"))?;
        let role = self.role.as_deref().and_then(|r| r.parse::<Role>().ok());

        Ok(Principal {
            user_id,
            tenant_id,
            role,
        })
    }
}
