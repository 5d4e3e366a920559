//! `bookstall-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::{Entity, ValueObject};
pub use error::{DomainError, DomainResult};
pub use id::{
    BookId, CreditLevelId, CustomerId, OrderId, OrderItemId, OutOfStockId, PurchaseItemId,
    PurchaseOrderId, ShipmentId, ShipmentItemId, SupplierId,
};
pub use money::{MONEY_SCALE, round_half_up};
