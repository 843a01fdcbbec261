//! Per-action role policy, checked at the handler boundary before any
//! service call.
//!
//! Membership in an allow-list is the whole rule: no hierarchy, and a caller
//! without a role is denied everywhere.

use chatgate_auth::{require_role, AllowList, Principal, Role};
use chatgate_infra::ServiceError;

pub const ANY_ROLE: AllowList = &[Role::Admin, Role::Moderator, Role::Member, Role::Guest];

pub const TENANT_CREATE: AllowList = &[Role::Admin];
pub const TENANT_READ: AllowList = ANY_ROLE;

pub const USER_WRITE: AllowList = &[Role::Admin, Role::Moderator];
pub const USER_DELETE: AllowList = &[Role::Admin];
pub const USER_READ: AllowList = ANY_ROLE;

pub const CHANNEL_CREATE: AllowList = &[Role::Admin, Role::Moderator];
pub const CHANNEL_READ: AllowList = ANY_ROLE;

pub const MEMBER_MANAGE: AllowList = &[Role::Admin, Role::Moderator];
pub const MEMBER_SELF: AllowList = ANY_ROLE;

pub const MESSAGE_ACCESS: AllowList = ANY_ROLE;
pub const PROFILE: AllowList = ANY_ROLE;

pub fn require(caller: &Principal, allowed: AllowList) -> Result<(), ServiceError> {
    require_role(caller, allowed).map_err(ServiceError::from)
}
