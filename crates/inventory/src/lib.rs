//! `bookstall-inventory` — on-hand stock and out-of-stock records.

pub mod out_of_stock;
pub mod stock;

pub use out_of_stock::{OutOfStockRecord, OutOfStockSource, OutOfStockStatus, Priority};
pub use stock::StockLevel;
