//! Suppliers purchase orders are issued against.

use serde::{Deserialize, Serialize};

use bookstall_core::{DomainError, DomainResult, Entity, SupplierId};

/// A supplier. Administered elsewhere; replenishment only checks existence
/// when issuing purchase orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
}

impl Supplier {
    pub fn new(id: SupplierId, name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("supplier name must not be blank"));
        }
        Ok(Self { id, name })
    }

    pub fn id(&self) -> SupplierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
