//! `bookstall-sales` — sales orders, their lifecycle, and line pricing.

pub mod order;
pub mod pricing;

pub use order::{ItemStatus, OrderStatus, SalesOrder, SalesOrderItem};
pub use pricing::{LinePrice, price_line};
