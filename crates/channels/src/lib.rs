//! Channel and membership records.
//!
//! A local [`Channel`] always mirrors a provider-side channel identified by a
//! [`RemoteChannelId`]; a [`ChannelMember`] row is the local source of truth
//! for who may read and write that channel.

pub mod channel;
pub mod member;

pub use channel::{Channel, NewChannel, RemoteChannelId, REMOTE_TENANT_PREFIX_LEN};
pub use member::ChannelMember;
