//! `bookstall-store` — the relational ledger behind the sales lifecycle.

pub mod ledger;

pub use ledger::{InMemoryLedger, LedgerStore, LedgerTx, PostgresLedger, StoreError, StoreResult};
