use serde::{Deserialize, Serialize};

use crate::{Entity, TenantId};

/// An isolated organization. Every other record belongs to exactly one tenant.
///
/// Tenants are created by find-or-create on registration (or explicitly by an
/// admin) and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
        }
    }
}

impl Entity for Tenant {
    type Id = TenantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
