//! `bookstall-purchasing` — purchase orders issued to replenish stock.

pub mod order;

pub use order::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};
