use serde::Serialize;

use chatgate_core::{TenantId, UserId};

use crate::Role;

/// Verified identity of the caller, attached to the request once the bearer
/// token has been checked.
///
/// Every downstream lookup takes its tenant from here, never from the request
/// body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    /// `None` when the token carried no (or an unknown) role.
    pub role: Option<Role>,
}
