//! Transactional ledger boundary.
//!
//! This module defines an infrastructure-facing abstraction for reading and
//! writing the lifecycle's rows without making any storage assumptions.
//! Everything the engines do against storage goes through a [`LedgerTx`]:
//! row CRUD, the guarded numeric updates (balance debit, stock removal), and
//! the compare-and-set status transitions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedger;
pub use postgres::PostgresLedger;
pub use r#trait::{LedgerStore, LedgerTx, StoreError, StoreResult};
