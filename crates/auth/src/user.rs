//! User accounts.
//!
//! A user belongs to exactly one tenant; `tenant_id` is fixed at creation and
//! no update path touches it.

use serde::{Deserialize, Serialize};

use chatgate_core::{DomainError, DomainResult, Entity, TenantId, TenantOwned, UserId};

use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A user account row.
///
/// `password_hash` is an opaque one-way credential and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
}

impl User {
    /// Build a validated user record.
    ///
    /// The email is normalized (trimmed, lower-cased) so global uniqueness is
    /// case-insensitive.
    pub fn new(
        tenant_id: TenantId,
        email: &str,
        name: &str,
        password_hash: String,
        role: Role,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: UserId::new(),
            tenant_id,
            email: normalize_email(email)?,
            name: normalize_name(name)?,
            password_hash,
            role,
        })
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for User {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email.to_lowercase())
}

pub fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update applied by privileged callers. Absent fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }

    /// Apply the patch, validating every provided field before mutating.
    pub fn apply(&self, user: &mut User) -> DomainResult<()> {
        let name = self.name.as_deref().map(normalize_name).transpose()?;
        let email = self.email.as_deref().map(normalize_email).transpose()?;

        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new(TenantId::new(), " Alice@X.com ", "Alice", "hash".into(), Role::Admin).unwrap()
    }

    #[test]
    fn new_normalizes_email() {
        assert_eq!(alice().email, "alice@x.com");
    }

    #[test]
    fn new_rejects_invalid_email() {
        let err = User::new(TenantId::new(), "nope", "N", "h".into(), Role::Member).unwrap_err();
        assert_eq!(err, DomainError::validation("invalid email format"));
    }

    #[test]
    fn new_rejects_blank_name() {
        assert!(User::new(TenantId::new(), "a@b.c", "  ", "h".into(), Role::Member).is_err());
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let mut user = alice();
        let tenant = user.tenant_id;
        UserPatch {
            role: Some(Role::Guest),
            ..Default::default()
        }
        .apply(&mut user)
        .unwrap();

        assert_eq!(user.role, Role::Guest);
        assert_eq!(user.name, "Alice");
        assert_eq!(user.tenant_id, tenant);
    }

    #[test]
    fn invalid_patch_leaves_user_untouched() {
        let mut user = alice();
        let before = user.clone();
        let patch = UserPatch {
            name: Some("Alicia".into()),
            email: Some("broken".into()),
            role: None,
        };
        assert!(patch.apply(&mut user).is_err());
        assert_eq!(user, before);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let json = serde_json::to_value(alice()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "ADMIN");
    }
}
