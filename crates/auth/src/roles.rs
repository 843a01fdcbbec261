use core::str::FromStr;

use serde::{Deserialize, Serialize};

use chatgate_core::DomainError;

/// Role identifier used for RBAC.
///
/// Roles are flat: there is no hierarchy, so an allow-list must name every
/// role it admits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Moderator,
    /// Assigned when an administrative create omits a role.
    #[default]
    Member,
    Guest,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Moderator, Role::Member, Role::Guest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Moderator => "MODERATOR",
            Role::Member => "MEMBER",
            Role::Guest => "GUEST",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    /// Case-insensitive; anything outside the four known roles is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MODERATOR" => Ok(Role::Moderator),
            "MEMBER" => Ok(Role::Member),
            "GUEST" => Ok(Role::Guest),
            _ => Err(DomainError::validation(
                "invalid role: must be ADMIN, MODERATOR, MEMBER, or GUEST",
            )),
        }
    }
}
