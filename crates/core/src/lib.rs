//! `chatgate-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error model and the tenant record.

pub mod entity;
pub mod error;
pub mod id;
pub mod tenant;

pub use entity::{Entity, TenantOwned};
pub use error::{non_blank, DomainError, DomainResult};
pub use id::{ChannelId, MemberId, TenantId, UserId};
pub use tenant::Tenant;
