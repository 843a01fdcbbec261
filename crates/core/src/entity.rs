//! Entity traits: identity + tenant ownership.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity that belongs to exactly one tenant.
///
/// Every tenant-scoped lookup checks this before handing a record to a caller.
pub trait TenantOwned: Entity {
    fn tenant_id(&self) -> crate::TenantId;

    fn belongs_to(&self, tenant_id: crate::TenantId) -> bool {
        self.tenant_id() == tenant_id
    }
}
