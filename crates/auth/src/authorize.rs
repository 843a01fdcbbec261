use thiserror::Error;

use crate::{Principal, Role};

/// A statically declared set of roles permitted to perform an action.
pub type AllowList = &'static [Role];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("missing role claim")]
    MissingRole,

    #[error("role '{0}' is not permitted for this action")]
    Forbidden(Role),
}

/// Role-based authorization predicate.
///
/// - No IO
/// - No hierarchy: ADMIN is not implied by any other entry
/// - A missing role or an empty allow-list is always denied
pub fn authorize(role: Option<Role>, allowed: &[Role]) -> bool {
    match role {
        Some(role) => allowed.contains(&role),
        None => false,
    }
}

/// [`authorize`] for a request principal, with a reason on denial.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), AuthzError> {
    let role = principal.role.ok_or(AuthzError::MissingRole)?;
    if authorize(Some(role), allowed) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(role))
    }
}
