//! In-memory ledger.
//!
//! Test double for the Postgres ledger: the same transaction, guard, and
//! compare-and-set semantics over plain maps. One mutex serializes
//! transactions, a snapshot taken at `begin` restores the state when a
//! transaction drops uncommitted. Intended for tests/dev. Not optimized for
//! performance.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

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

use super::r#trait::{LedgerStore, LedgerTx, StoreError, StoreResult};

#[derive(Debug, Default, Clone)]
struct LedgerState {
    books: HashMap<BookId, Book>,
    credit_levels: BTreeMap<CreditLevelId, CreditLevel>,
    customers: HashMap<CustomerId, Customer>,
    suppliers: HashMap<SupplierId, Supplier>,
    stock: HashMap<BookId, StockLevel>,
    orders: HashMap<OrderId, SalesOrder>,
    order_items: Vec<SalesOrderItem>,
    shipments: Vec<Shipment>,
    shipment_items: Vec<ShipmentItem>,
    out_of_stock: HashMap<OutOfStockId, OutOfStockRecord>,
    purchase_orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    purchase_items: Vec<PurchaseOrderItem>,
}

/// In-memory [`LedgerStore`]. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = Some(guard.clone());
        Ok(Box::new(InMemoryLedgerTx {
            guard,
            snapshot,
            committed: false,
        }))
    }
}

struct InMemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    snapshot: Option<LedgerState>,
    committed: bool,
}

impl Drop for InMemoryLedgerTx {
    fn drop(&mut self) {
        if !self.committed {
            if let Some(snapshot) = self.snapshot.take() {
                *self.guard = snapshot;
            }
        }
    }
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn insert_book(&mut self, book: &Book) -> StoreResult<()> {
        if self.guard.books.contains_key(book.id()) {
            return Err(StoreError::Conflict(format!(
                "book {} already exists",
                book.id()
            )));
        }
        self.guard.books.insert(book.id().clone(), book.clone());
        Ok(())
    }

    async fn find_book(&mut self, id: &BookId) -> StoreResult<Option<Book>> {
        Ok(self.guard.books.get(id).cloned())
    }

    async fn insert_credit_level(&mut self, level: &CreditLevel) -> StoreResult<()> {
        if self.guard.credit_levels.contains_key(&level.id()) {
            return Err(StoreError::Conflict(format!(
                "credit level {} already exists",
                level.id()
            )));
        }
        self.guard.credit_levels.insert(level.id(), level.clone());
        Ok(())
    }

    async fn find_credit_level(&mut self, id: CreditLevelId) -> StoreResult<Option<CreditLevel>> {
        Ok(self.guard.credit_levels.get(&id).cloned())
    }

    async fn list_credit_levels(&mut self) -> StoreResult<Vec<CreditLevel>> {
        Ok(self.guard.credit_levels.values().cloned().collect())
    }

    async fn insert_customer(&mut self, customer: &Customer) -> StoreResult<()> {
        if self.guard.customers.contains_key(&customer.id()) {
            return Err(StoreError::Conflict(format!(
                "customer {} already exists",
                customer.id()
            )));
        }
        self.guard.customers.insert(customer.id(), customer.clone());
        Ok(())
    }

    async fn find_customer(&mut self, id: CustomerId) -> StoreResult<Option<Customer>> {
        Ok(self.guard.customers.get(&id).cloned())
    }

    async fn debit_customer_balance(
        &mut self,
        id: CustomerId,
        amount: Decimal,
    ) -> StoreResult<bool> {
        Ok(self
            .guard
            .customers
            .get_mut(&id)
            .is_some_and(|customer| customer.try_debit(amount)))
    }

    async fn add_customer_spend(&mut self, id: CustomerId, amount: Decimal) -> StoreResult<bool> {
        Ok(self
            .guard
            .customers
            .get_mut(&id)
            .map(|customer| customer.add_spend(amount))
            .is_some())
    }

    async fn set_customer_credit_level(
        &mut self,
        id: CustomerId,
        level: CreditLevelId,
    ) -> StoreResult<bool> {
        Ok(self
            .guard
            .customers
            .get_mut(&id)
            .is_some_and(|customer| customer.promote_to(level)))
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        if self.guard.suppliers.contains_key(&supplier.id()) {
            return Err(StoreError::Conflict(format!(
                "supplier {} already exists",
                supplier.id()
            )));
        }
        self.guard.suppliers.insert(supplier.id(), supplier.clone());
        Ok(())
    }

    async fn find_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        Ok(self.guard.suppliers.get(&id).cloned())
    }

    async fn upsert_stock(&mut self, stock: &StockLevel) -> StoreResult<()> {
        self.guard
            .stock
            .insert(stock.book_id().clone(), stock.clone());
        Ok(())
    }

    async fn find_stock(&mut self, book_id: &BookId) -> StoreResult<Option<StockLevel>> {
        Ok(self.guard.stock.get(book_id).cloned())
    }

    async fn remove_stock(&mut self, book_id: &BookId, quantity: i64) -> StoreResult<bool> {
        Ok(self
            .guard
            .stock
            .get_mut(book_id)
            .is_some_and(|level| level.try_remove(quantity)))
    }

    async fn add_stock(&mut self, book_id: &BookId, quantity: i64) -> StoreResult<()> {
        match self.guard.stock.get_mut(book_id) {
            Some(level) => level.add(quantity),
            None => {
                let level = StockLevel::new(book_id.clone(), quantity, 0)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                self.guard.stock.insert(book_id.clone(), level);
            }
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        if self.guard.orders.contains_key(&order.id()) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id()
            )));
        }
        self.guard.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &SalesOrderItem) -> StoreResult<()> {
        if self.guard.order_items.iter().any(|i| i.id() == item.id()) {
            return Err(StoreError::Conflict(format!(
                "order item {} already exists",
                item.id()
            )));
        }
        self.guard.order_items.push(item.clone());
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<SalesOrder>> {
        Ok(self.guard.orders.get(&id).cloned())
    }

    async fn find_order_items(&mut self, order_id: OrderId) -> StoreResult<Vec<SalesOrderItem>> {
        Ok(self
            .guard
            .order_items
            .iter()
            .filter(|item| item.order_id() == order_id)
            .cloned()
            .collect())
    }

    async fn transition_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let Some(order) = self.guard.orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status() != from {
            return Ok(false);
        }
        Ok(match to {
            OrderStatus::PendingPayment => false,
            OrderStatus::PendingShipment => order.mark_paid(at),
            OrderStatus::Shipped => order.mark_shipped(at),
        })
    }

    async fn advance_item_progress(
        &mut self,
        item_id: OrderItemId,
        quantity: i64,
    ) -> StoreResult<bool> {
        Ok(self
            .guard
            .order_items
            .iter_mut()
            .find(|item| item.id() == item_id)
            .is_some_and(|item| item.record_shipment(quantity)))
    }

    async fn insert_shipment(&mut self, shipment: &Shipment) -> StoreResult<()> {
        if self.guard.shipments.iter().any(|s| s.id() == shipment.id()) {
            return Err(StoreError::Conflict(format!(
                "shipment {} already exists",
                shipment.id()
            )));
        }
        self.guard.shipments.push(shipment.clone());
        Ok(())
    }

    async fn insert_shipment_item(&mut self, item: &ShipmentItem) -> StoreResult<()> {
        if self
            .guard
            .shipment_items
            .iter()
            .any(|i| i.id() == item.id())
        {
            return Err(StoreError::Conflict(format!(
                "shipment item {} already exists",
                item.id()
            )));
        }
        self.guard.shipment_items.push(item.clone());
        Ok(())
    }

    async fn find_shipments(&mut self, order_id: OrderId) -> StoreResult<Vec<Shipment>> {
        Ok(self
            .guard
            .shipments
            .iter()
            .filter(|shipment| shipment.order_id() == order_id)
            .cloned()
            .collect())
    }

    async fn find_shipment_items(
        &mut self,
        shipment_id: ShipmentId,
    ) -> StoreResult<Vec<ShipmentItem>> {
        Ok(self
            .guard
            .shipment_items
            .iter()
            .filter(|item| item.shipment_id() == shipment_id)
            .cloned()
            .collect())
    }

    async fn upsert_out_of_stock(
        &mut self,
        record: &OutOfStockRecord,
    ) -> StoreResult<OutOfStockId> {
        if record.status() == OutOfStockStatus::Pending {
            let existing = self.guard.out_of_stock.values_mut().find(|r| {
                r.book_id() == record.book_id() && r.status() == OutOfStockStatus::Pending
            });
            if let Some(existing) = existing {
                existing
                    .merge_demand(
                        record.required_quantity(),
                        record.source(),
                        record.priority(),
                        record.registered_at(),
                    )
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                return Ok(existing.id());
            }
        }
        if self.guard.out_of_stock.contains_key(&record.id()) {
            return Err(StoreError::Conflict(format!(
                "out-of-stock record {} already exists",
                record.id()
            )));
        }
        self.guard.out_of_stock.insert(record.id(), record.clone());
        Ok(record.id())
    }

    async fn find_out_of_stock(
        &mut self,
        id: OutOfStockId,
    ) -> StoreResult<Option<OutOfStockRecord>> {
        Ok(self.guard.out_of_stock.get(&id).cloned())
    }

    async fn transition_out_of_stock(
        &mut self,
        id: OutOfStockId,
        from: OutOfStockStatus,
        to: OutOfStockStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let Some(record) = self.guard.out_of_stock.get_mut(&id) else {
            return Ok(false);
        };
        if record.status() != from {
            return Ok(false);
        }
        Ok(match to {
            OutOfStockStatus::Pending => false,
            OutOfStockStatus::Purchasing => record.begin_purchasing(),
            OutOfStockStatus::Resolved => record.resolve(at),
        })
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        if self.guard.purchase_orders.contains_key(&order.id()) {
            return Err(StoreError::Conflict(format!(
                "purchase order {} already exists",
                order.id()
            )));
        }
        self.guard.purchase_orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn insert_purchase_order_item(&mut self, item: &PurchaseOrderItem) -> StoreResult<()> {
        if self
            .guard
            .purchase_items
            .iter()
            .any(|i| i.id() == item.id())
        {
            return Err(StoreError::Conflict(format!(
                "purchase order item {} already exists",
                item.id()
            )));
        }
        self.guard.purchase_items.push(item.clone());
        Ok(())
    }

    async fn find_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        Ok(self.guard.purchase_orders.get(&id).cloned())
    }

    async fn find_purchase_order_items(
        &mut self,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<PurchaseOrderItem>> {
        Ok(self
            .guard
            .purchase_items
            .iter()
            .filter(|item| item.purchase_order_id() == order_id)
            .cloned()
            .collect())
    }

    async fn transition_purchase_order(
        &mut self,
        id: PurchaseOrderId,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    ) -> StoreResult<bool> {
        let Some(order) = self.guard.purchase_orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status() != from {
            return Ok(false);
        }
        Ok(match to {
            PurchaseOrderStatus::Issued => false,
            PurchaseOrderStatus::Received => order.mark_received(),
        })
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.committed = true;
        Ok(())
    }
}
