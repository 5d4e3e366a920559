//! Lifecycle engines for the bookstall ledger.
//!
//! The engines orchestrate the sales lifecycle over a [`LedgerStore`]
//! backend, one transaction per operation:
//!
//! - [`OrderBuilder`] prices a cart into a `PENDING_PAYMENT` order.
//! - [`PaymentSettlement`] moves the money: `PENDING_PAYMENT ->
//!   PENDING_SHIPMENT` plus the guarded balance debit.
//! - [`ShipmentEngine`] moves the goods: `PENDING_SHIPMENT -> SHIPPED` plus
//!   the guarded stock decrements and the shipment manifest.
//! - [`ReplenishmentEngine`] runs the shortage loop: out-of-stock records,
//!   purchase orders, goods receipt.
//!
//! Engines hold no state of their own; everything they know lives in the
//! ledger, and every invariant they rely on (balances and stock never
//! negative, each lifecycle edge taken once) is enforced by the store's
//! guarded updates and compare-and-set transitions, not by in-process
//! locking. Any engine operation either commits whole or leaves no trace.
//!
//! [`LedgerStore`]: bookstall_store::LedgerStore

pub mod error;
pub mod order_builder;
pub mod replenishment;
pub mod settlement;
pub mod shipment;

pub use error::{WorkflowError, WorkflowResult};
pub use order_builder::OrderBuilder;
pub use replenishment::{PurchaseItemDraft, ReplenishmentEngine};
pub use settlement::PaymentSettlement;
pub use shipment::ShipmentEngine;
