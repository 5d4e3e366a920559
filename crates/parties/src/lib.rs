//! `bookstall-parties` — customers, their credit levels, and suppliers.

pub mod credit;
pub mod customer;
pub mod supplier;

pub use credit::{CreditLevel, best_level_for};
pub use customer::Customer;
pub use supplier::Supplier;
