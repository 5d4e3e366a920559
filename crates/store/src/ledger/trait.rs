use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use bookstall_catalog::Book;
use bookstall_core::{
    BookId, CreditLevelId, CustomerId, OrderId, OrderItemId, OutOfStockId, PurchaseOrderId,
    ShipmentId, SupplierId,
};
use bookstall_inventory::{OutOfStockRecord, OutOfStockStatus, StockLevel};
use bookstall_parties::{CreditLevel, Customer, Supplier};
use bookstall_purchasing::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};
use bookstall_sales::{OrderStatus, SalesOrder, SalesOrderItem};
use bookstall_shipping::{Shipment, ShipmentItem};

/// Result type for ledger operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Ledger operation error.
///
/// These are **infrastructure errors** (storage, connection, row decoding,
/// write conflicts), as opposed to domain errors (validation, lifecycle
/// misuse, shortfalls). Guard misses are not errors here: guarded updates
/// and compare-and-set transitions report `false` and let the caller decide
/// what the miss means.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or serialization conflict caused by another writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing storage failed or returned something unreadable.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Handle to the relational ledger.
///
/// The store's only job is to open transactions; every read and write runs
/// inside one. Implementations must serialize conflicting writers so that a
/// guarded update or compare-and-set re-evaluates its predicate under
/// whatever lock the backend provides, and a miss surfaces as
/// zero-rows-matched rather than a lost update.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction. Dropping the returned handle without calling
    /// [`LedgerTx::commit`] rolls every write back.
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        (**self).begin().await
    }
}

/// One open ledger transaction.
///
/// Plain row CRUD for each lifecycle entity, plus two special write shapes
/// the engines rely on:
///
/// - **guarded numeric updates** (`debit_customer_balance`, `remove_stock`):
///   compare against the current value, apply the delta, and report whether
///   the guard held. Misses leave the row untouched.
/// - **compare-and-set transitions** (`transition_order`,
///   `transition_out_of_stock`, `transition_purchase_order`): update status
///   (and its timestamp) only where the current status equals the expected
///   one, reporting whether a row matched.
///
/// Writes become visible to other transactions only at commit.
#[async_trait]
pub trait LedgerTx: Send {
    // Books.
    async fn insert_book(&mut self, book: &Book) -> StoreResult<()>;
    async fn find_book(&mut self, id: &BookId) -> StoreResult<Option<Book>>;

    // Credit levels.
    async fn insert_credit_level(&mut self, level: &CreditLevel) -> StoreResult<()>;
    async fn find_credit_level(&mut self, id: CreditLevelId) -> StoreResult<Option<CreditLevel>>;
    async fn list_credit_levels(&mut self) -> StoreResult<Vec<CreditLevel>>;

    // Customers.
    async fn insert_customer(&mut self, customer: &Customer) -> StoreResult<()>;
    async fn find_customer(&mut self, id: CustomerId) -> StoreResult<Option<Customer>>;
    /// Guarded debit: `balance -= amount` only where `balance >= amount`.
    async fn debit_customer_balance(
        &mut self,
        id: CustomerId,
        amount: Decimal,
    ) -> StoreResult<bool>;
    /// Accumulate settled spend. Reports whether the customer row exists.
    async fn add_customer_spend(&mut self, id: CustomerId, amount: Decimal) -> StoreResult<bool>;
    /// Raise the credit level. Guarded upward: reports `false` when the row
    /// is missing or already at/above `level`.
    async fn set_customer_credit_level(
        &mut self,
        id: CustomerId,
        level: CreditLevelId,
    ) -> StoreResult<bool>;

    // Suppliers.
    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()>;
    async fn find_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>>;

    // Stock.
    async fn upsert_stock(&mut self, stock: &StockLevel) -> StoreResult<()>;
    async fn find_stock(&mut self, book_id: &BookId) -> StoreResult<Option<StockLevel>>;
    /// Guarded removal: `quantity -= n` only where `quantity >= n`.
    async fn remove_stock(&mut self, book_id: &BookId, quantity: i64) -> StoreResult<bool>;
    /// Add received stock, creating the row (with no safety floor) for a
    /// book never stocked before.
    async fn add_stock(&mut self, book_id: &BookId, quantity: i64) -> StoreResult<()>;

    // Sales orders.
    async fn insert_order(&mut self, order: &SalesOrder) -> StoreResult<()>;
    async fn insert_order_item(&mut self, item: &SalesOrderItem) -> StoreResult<()>;
    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<SalesOrder>>;
    async fn find_order_items(&mut self, order_id: OrderId) -> StoreResult<Vec<SalesOrderItem>>;
    /// Compare-and-set status transition, stamping `paid_at` or `shipped_at`
    /// according to the target status. Illegal edges never match.
    async fn transition_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;
    /// Advance a line's shipped quantity, deriving its item status. Guarded:
    /// progress never overshoots the ordered quantity.
    async fn advance_item_progress(
        &mut self,
        item_id: OrderItemId,
        quantity: i64,
    ) -> StoreResult<bool>;

    // Shipments.
    async fn insert_shipment(&mut self, shipment: &Shipment) -> StoreResult<()>;
    async fn insert_shipment_item(&mut self, item: &ShipmentItem) -> StoreResult<()>;
    async fn find_shipments(&mut self, order_id: OrderId) -> StoreResult<Vec<Shipment>>;
    async fn find_shipment_items(
        &mut self,
        shipment_id: ShipmentId,
    ) -> StoreResult<Vec<ShipmentItem>>;

    // Out-of-stock records.
    /// Insert the record, or merge it into the book's existing PENDING
    /// record (quantities add up, the higher urgency sticks). Returns the id
    /// of the row that now holds the demand.
    async fn upsert_out_of_stock(
        &mut self,
        record: &OutOfStockRecord,
    ) -> StoreResult<OutOfStockId>;
    async fn find_out_of_stock(
        &mut self,
        id: OutOfStockId,
    ) -> StoreResult<Option<OutOfStockRecord>>;
    /// Compare-and-set status transition, stamping `resolved_at` when the
    /// target is RESOLVED. Illegal edges never match.
    async fn transition_out_of_stock(
        &mut self,
        id: OutOfStockId,
        from: OutOfStockStatus,
        to: OutOfStockStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Purchase orders.
    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()>;
    async fn insert_purchase_order_item(&mut self, item: &PurchaseOrderItem) -> StoreResult<()>;
    async fn find_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>>;
    async fn find_purchase_order_items(
        &mut self,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<PurchaseOrderItem>>;
    /// Compare-and-set status transition. Illegal edges never match.
    async fn transition_purchase_order(
        &mut self,
        id: PurchaseOrderId,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    ) -> StoreResult<bool>;

    /// Commit every write in this transaction.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
