//! Postgres-backed ledger implementation.
//!
//! All engine writes run inside a single transaction per operation. The
//! guarded updates and compare-and-set transitions are expressed as
//! `UPDATE ... WHERE <predicate>` so the predicate re-evaluates under the
//! row lock; a miss is zero rows affected, never a lost update.
//!
//! ## Error mapping
//!
//! SQLx errors are mapped to [`StoreError`] as follows:
//!
//! | SQLx error | PostgreSQL code | StoreError | Scenario |
//! |------------|-----------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Concurrent insert hit a unique constraint |
//! | Database (serialization failure) | `40001` | `Conflict` | Concurrent transactions could not serialize |
//! | Database (other) | any other | `Backend` | Constraint or data errors |
//! | PoolClosed | n/a | `Backend` | Connection pool was closed |
//! | Other | n/a | `Backend` | Network errors, connection failures, row decoding |
//!
//! ## Expected schema
//!
//! No migrations ship with this crate; provision the tables below with your
//! migration tool of choice.
//!
//! ```sql
//! CREATE TABLE book (
//!     book_id    TEXT PRIMARY KEY,
//!     title      TEXT NOT NULL,
//!     list_price NUMERIC(12,2) NOT NULL CHECK (list_price >= 0)
//! );
//!
//! CREATE TABLE credit_level (
//!     level_id        SMALLINT PRIMARY KEY,
//!     name            TEXT NOT NULL,
//!     discount_rate   NUMERIC(5,4) NOT NULL CHECK (discount_rate > 0 AND discount_rate <= 1),
//!     min_total_spend NUMERIC(12,2) NOT NULL CHECK (min_total_spend >= 0)
//! );
//!
//! CREATE TABLE customer (
//!     customer_id  UUID PRIMARY KEY,
//!     name         TEXT NOT NULL,
//!     balance      NUMERIC(12,2) NOT NULL CHECK (balance >= 0),
//!     credit_level SMALLINT NOT NULL REFERENCES credit_level (level_id),
//!     total_spend  NUMERIC(12,2) NOT NULL CHECK (total_spend >= 0)
//! );
//!
//! CREATE TABLE supplier (
//!     supplier_id UUID PRIMARY KEY,
//!     name        TEXT NOT NULL
//! );
//!
//! CREATE TABLE inventory (
//!     book_id      TEXT PRIMARY KEY REFERENCES book (book_id),
//!     quantity     BIGINT NOT NULL CHECK (quantity >= 0),
//!     safety_stock BIGINT NOT NULL CHECK (safety_stock >= 0)
//! );
//!
//! CREATE TABLE sales_order (
//!     order_id       UUID PRIMARY KEY,
//!     customer_id    UUID NOT NULL REFERENCES customer (customer_id),
//!     status         TEXT NOT NULL,
//!     discount_rate  NUMERIC(5,4) NOT NULL,
//!     goods_amount   NUMERIC(12,2) NOT NULL,
//!     payable_amount NUMERIC(12,2) NOT NULL,
//!     created_at     TIMESTAMPTZ NOT NULL,
//!     paid_at        TIMESTAMPTZ,
//!     shipped_at     TIMESTAMPTZ
//! );
//!
//! CREATE TABLE sales_order_item (
//!     item_id          UUID PRIMARY KEY,
//!     order_id         UUID NOT NULL REFERENCES sales_order (order_id),
//!     book_id          TEXT NOT NULL REFERENCES book (book_id),
//!     quantity         BIGINT NOT NULL CHECK (quantity > 0),
//!     unit_price       NUMERIC(12,2) NOT NULL,
//!     sub_amount       NUMERIC(12,2) NOT NULL,
//!     shipped_quantity BIGINT NOT NULL CHECK (shipped_quantity >= 0 AND shipped_quantity <= quantity),
//!     item_status      TEXT NOT NULL
//! );
//!
//! CREATE TABLE shipment (
//!     shipment_id     UUID PRIMARY KEY,
//!     order_id        UUID NOT NULL REFERENCES sales_order (order_id),
//!     carrier         TEXT NOT NULL,
//!     tracking_number TEXT NOT NULL,
//!     operator        TEXT NOT NULL,
//!     shipped_at      TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE shipment_item (
//!     shipment_item_id UUID PRIMARY KEY,
//!     shipment_id      UUID NOT NULL REFERENCES shipment (shipment_id),
//!     order_item_id    UUID NOT NULL REFERENCES sales_order_item (item_id),
//!     book_id          TEXT NOT NULL,
//!     quantity         BIGINT NOT NULL CHECK (quantity > 0)
//! );
//!
//! CREATE TABLE out_of_stock_record (
//!     record_id         UUID PRIMARY KEY,
//!     book_id           TEXT NOT NULL REFERENCES book (book_id),
//!     required_quantity BIGINT NOT NULL CHECK (required_quantity > 0),
//!     source            TEXT NOT NULL,
//!     priority          SMALLINT NOT NULL,
//!     status            TEXT NOT NULL,
//!     registered_at     TIMESTAMPTZ NOT NULL,
//!     resolved_at       TIMESTAMPTZ
//! );
//!
//! -- At most one PENDING record per book; the merge upsert targets this index.
//! CREATE UNIQUE INDEX out_of_stock_pending_per_book
//!     ON out_of_stock_record (book_id) WHERE status = 'PENDING';
//!
//! CREATE TABLE purchase_order (
//!     purchase_order_id UUID PRIMARY KEY,
//!     supplier_id       UUID NOT NULL REFERENCES supplier (supplier_id),
//!     buyer             TEXT NOT NULL,
//!     estimated_amount  NUMERIC(12,2) NOT NULL,
//!     created_on        DATE NOT NULL,
//!     expected_date     DATE,
//!     status            TEXT NOT NULL
//! );
//!
//! CREATE TABLE purchase_order_item (
//!     purchase_item_id  UUID PRIMARY KEY,
//!     purchase_order_id UUID NOT NULL REFERENCES purchase_order (purchase_order_id),
//!     book_id           TEXT NOT NULL REFERENCES book (book_id),
//!     quantity          BIGINT NOT NULL CHECK (quantity > 0),
//!     unit_cost         NUMERIC(12,2) NOT NULL CHECK (unit_cost >= 0),
//!     out_of_stock_id   UUID REFERENCES out_of_stock_record (record_id)
//! );
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use bookstall_catalog::Book;
use bookstall_core::{
    BookId, CreditLevelId, CustomerId, OrderId, OrderItemId, OutOfStockId, PurchaseItemId,
    PurchaseOrderId, ShipmentId, ShipmentItemId, SupplierId,
};
use bookstall_inventory::{
    OutOfStockRecord, OutOfStockSource, OutOfStockStatus, Priority, StockLevel,
};
use bookstall_parties::{CreditLevel, Customer, Supplier};
use bookstall_purchasing::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};
use bookstall_sales::{ItemStatus, OrderStatus, SalesOrder, SalesOrderItem};
use bookstall_shipping::{Shipment, ShipmentItem};

use super::r#trait::{LedgerStore, LedgerTx, StoreError, StoreResult};

/// Postgres-backed [`LedgerStore`].
///
/// Uses the SQLx connection pool, which is thread-safe; clones share it.
/// Every transaction this store opens maps to a database transaction, so
/// the guard and compare-and-set semantics come straight from Postgres row
/// locking.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: Arc<PgPool>,
}

impl PostgresLedger {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a fresh pool. Convenience for binaries and tests; callers
    /// that tune their own pool use [`PostgresLedger::new`].
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Connect using the `DATABASE_URL` environment variable.
    pub async fn from_env() -> StoreResult<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::Backend("DATABASE_URL is not set".into()))?;
        Self::connect(&database_url).await
    }
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresLedgerTx { tx }))
    }
}

/// One open database transaction. Dropping it without commit rolls back
/// (SQLx issues the ROLLBACK when the inner transaction drops).
struct PostgresLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PostgresLedgerTx {
    async fn insert_book(&mut self, book: &Book) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book (book_id, title, list_price)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(book.id().as_str())
        .bind(book.title())
        .bind(book.list_price())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_book", e))?;
        Ok(())
    }

    async fn find_book(&mut self, id: &BookId) -> StoreResult<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT book_id, title, list_price
            FROM book
            WHERE book_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_book", e))?;

        match row {
            Some(row) => {
                let book = BookRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_book", e))?
                    .try_into()?;
                Ok(Some(book))
            }
            None => Ok(None),
        }
    }

    async fn insert_credit_level(&mut self, level: &CreditLevel) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO credit_level (level_id, name, discount_rate, min_total_spend)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(level.id().value())
        .bind(level.name())
        .bind(level.discount_rate())
        .bind(level.min_total_spend())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_credit_level", e))?;
        Ok(())
    }

    async fn find_credit_level(&mut self, id: CreditLevelId) -> StoreResult<Option<CreditLevel>> {
        let row = sqlx::query(
            r#"
            SELECT level_id, name, discount_rate, min_total_spend
            FROM credit_level
            WHERE level_id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_credit_level", e))?;

        match row {
            Some(row) => {
                let level = CreditLevelRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_credit_level", e))?
                    .try_into()?;
                Ok(Some(level))
            }
            None => Ok(None),
        }
    }

    async fn list_credit_levels(&mut self) -> StoreResult<Vec<CreditLevel>> {
        let rows = sqlx::query(
            r#"
            SELECT level_id, name, discount_rate, min_total_spend
            FROM credit_level
            ORDER BY level_id ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_credit_levels", e))?;

        let mut levels = Vec::with_capacity(rows.len());
        for row in rows {
            let level = CreditLevelRow::from_row(&row)
                .map_err(|e| map_sqlx_error("list_credit_levels", e))?
                .try_into()?;
            levels.push(level);
        }
        Ok(levels)
    }

    async fn insert_customer(&mut self, customer: &Customer) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customer (customer_id, name, balance, credit_level, total_spend)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*customer.id().as_uuid())
        .bind(customer.name())
        .bind(customer.balance())
        .bind(customer.credit_level().value())
        .bind(customer.total_spend())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_customer", e))?;
        Ok(())
    }

    async fn find_customer(&mut self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT customer_id, name, balance, credit_level, total_spend
            FROM customer
            WHERE customer_id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_customer", e))?;

        match row {
            Some(row) => {
                let customer = CustomerRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_customer", e))?
                    .try_into()?;
                Ok(Some(customer))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(customer_id = %id, amount = %amount), err)]
    async fn debit_customer_balance(
        &mut self,
        id: CustomerId,
        amount: Decimal,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customer
            SET balance = balance - $2
            WHERE customer_id = $1 AND balance >= $2
            "#,
        )
        .bind(*id.as_uuid())
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("debit_customer_balance", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_customer_spend(&mut self, id: CustomerId, amount: Decimal) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customer
            SET total_spend = total_spend + $2
            WHERE customer_id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("add_customer_spend", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip_all, fields(customer_id = %id, level = %level), err)]
    async fn set_customer_credit_level(
        &mut self,
        id: CustomerId,
        level: CreditLevelId,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customer
            SET credit_level = $2
            WHERE customer_id = $1 AND credit_level < $2
            "#,
        )
        .bind(*id.as_uuid())
        .bind(level.value())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("set_customer_credit_level", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO supplier (supplier_id, name)
            VALUES ($1, $2)
            "#,
        )
        .bind(*supplier.id().as_uuid())
        .bind(supplier.name())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_supplier", e))?;
        Ok(())
    }

    async fn find_supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        let row = sqlx::query(
            r#"
            SELECT supplier_id, name
            FROM supplier
            WHERE supplier_id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_supplier", e))?;

        match row {
            Some(row) => {
                let supplier = SupplierRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_supplier", e))?
                    .try_into()?;
                Ok(Some(supplier))
            }
            None => Ok(None),
        }
    }

    async fn upsert_stock(&mut self, stock: &StockLevel) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (book_id, quantity, safety_stock)
            VALUES ($1, $2, $3)
            ON CONFLICT (book_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, safety_stock = EXCLUDED.safety_stock
            "#,
        )
        .bind(stock.book_id().as_str())
        .bind(stock.quantity())
        .bind(stock.safety_stock())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_stock", e))?;
        Ok(())
    }

    async fn find_stock(&mut self, book_id: &BookId) -> StoreResult<Option<StockLevel>> {
        let row = sqlx::query(
            r#"
            SELECT book_id, quantity, safety_stock
            FROM inventory
            WHERE book_id = $1
            "#,
        )
        .bind(book_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_stock", e))?;

        match row {
            Some(row) => {
                let stock = StockRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_stock", e))?
                    .try_into()?;
                Ok(Some(stock))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(book_id = %book_id, quantity), err)]
    async fn remove_stock(&mut self, book_id: &BookId, quantity: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - $2
            WHERE book_id = $1 AND $2 >= 0 AND quantity >= $2
            "#,
        )
        .bind(book_id.as_str())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("remove_stock", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip_all, fields(book_id = %book_id, quantity), err)]
    async fn add_stock(&mut self, book_id: &BookId, quantity: i64) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (book_id, quantity, safety_stock)
            VALUES ($1, $2, 0)
            ON CONFLICT (book_id)
            DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(book_id.as_str())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("add_stock", e))?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales_order (
                order_id,
                customer_id,
                status,
                discount_rate,
                goods_amount,
                payable_amount,
                created_at,
                paid_at,
                shipped_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*order.id().as_uuid())
        .bind(*order.customer_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.discount_rate_snapshot())
        .bind(order.goods_amount())
        .bind(order.payable_amount())
        .bind(order.created_at())
        .bind(order.paid_at())
        .bind(order.shipped_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &SalesOrderItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales_order_item (
                item_id,
                order_id,
                book_id,
                quantity,
                unit_price,
                sub_amount,
                shipped_quantity,
                item_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*item.id().as_uuid())
        .bind(*item.order_id().as_uuid())
        .bind(item.book_id().as_str())
        .bind(item.quantity())
        .bind(item.unit_price())
        .bind(item.sub_amount())
        .bind(item.shipped_quantity())
        .bind(item.status().as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> StoreResult<Option<SalesOrder>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, customer_id, status, discount_rate, goods_amount,
                   payable_amount, created_at, paid_at, shipped_at
            FROM sales_order
            WHERE order_id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_order", e))?;

        match row {
            Some(row) => {
                let order = OrderRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_order", e))?
                    .try_into()?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn find_order_items(&mut self, order_id: OrderId) -> StoreResult<Vec<SalesOrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, order_id, book_id, quantity, unit_price, sub_amount,
                   shipped_quantity, item_status
            FROM sales_order_item
            WHERE order_id = $1
            ORDER BY item_id ASC
            "#,
        )
        .bind(*order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_order_items", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item = OrderItemRow::from_row(&row)
                .map_err(|e| map_sqlx_error("find_order_items", e))?
                .try_into()?;
            items.push(item);
        }
        Ok(items)
    }

    #[instrument(skip_all, fields(order_id = %id, from = %from, to = %to), err)]
    async fn transition_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if !from.can_transition(to) {
            return Ok(false);
        }
        let result = sqlx::query(
            r#"
            UPDATE sales_order
            SET status = $3,
                paid_at = CASE WHEN $3 = 'PENDING_SHIPMENT' THEN $4 ELSE paid_at END,
                shipped_at = CASE WHEN $3 = 'SHIPPED' THEN $4 ELSE shipped_at END
            WHERE order_id = $1 AND status = $2
            "#,
        )
        .bind(*id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("transition_order", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip_all, fields(item_id = %item_id, quantity), err)]
    async fn advance_item_progress(
        &mut self,
        item_id: OrderItemId,
        quantity: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sales_order_item
            SET shipped_quantity = shipped_quantity + $2,
                item_status = CASE
                    WHEN shipped_quantity + $2 >= quantity THEN 'SHIPPED'
                    ELSE 'PART_SHIPPED'
                END
            WHERE item_id = $1 AND $2 > 0 AND shipped_quantity + $2 <= quantity
            "#,
        )
        .bind(*item_id.as_uuid())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("advance_item_progress", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_shipment(&mut self, shipment: &Shipment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shipment (
                shipment_id,
                order_id,
                carrier,
                tracking_number,
                operator,
                shipped_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*shipment.id().as_uuid())
        .bind(*shipment.order_id().as_uuid())
        .bind(shipment.carrier())
        .bind(shipment.tracking_number())
        .bind(shipment.operator())
        .bind(shipment.shipped_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_shipment", e))?;
        Ok(())
    }

    async fn insert_shipment_item(&mut self, item: &ShipmentItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shipment_item (
                shipment_item_id,
                shipment_id,
                order_item_id,
                book_id,
                quantity
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*item.id().as_uuid())
        .bind(*item.shipment_id().as_uuid())
        .bind(*item.order_item_id().as_uuid())
        .bind(item.book_id().as_str())
        .bind(item.quantity())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_shipment_item", e))?;
        Ok(())
    }

    async fn find_shipments(&mut self, order_id: OrderId) -> StoreResult<Vec<Shipment>> {
        let rows = sqlx::query(
            r#"
            SELECT shipment_id, order_id, carrier, tracking_number, operator, shipped_at
            FROM shipment
            WHERE order_id = $1
            ORDER BY shipment_id ASC
            "#,
        )
        .bind(*order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_shipments", e))?;

        let mut shipments = Vec::with_capacity(rows.len());
        for row in rows {
            let shipment = ShipmentRow::from_row(&row)
                .map_err(|e| map_sqlx_error("find_shipments", e))?
                .try_into()?;
            shipments.push(shipment);
        }
        Ok(shipments)
    }

    async fn find_shipment_items(
        &mut self,
        shipment_id: ShipmentId,
    ) -> StoreResult<Vec<ShipmentItem>> {
        let rows = sqlx::query(
            r#"
            SELECT shipment_item_id, shipment_id, order_item_id, book_id, quantity
            FROM shipment_item
            WHERE shipment_id = $1
            ORDER BY shipment_item_id ASC
            "#,
        )
        .bind(*shipment_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_shipment_items", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item = ShipmentItemRow::from_row(&row)
                .map_err(|e| map_sqlx_error("find_shipment_items", e))?
                .try_into()?;
            items.push(item);
        }
        Ok(items)
    }

    #[instrument(
        skip_all,
        fields(book_id = %record.book_id(), quantity = record.required_quantity()),
        err
    )]
    async fn upsert_out_of_stock(
        &mut self,
        record: &OutOfStockRecord,
    ) -> StoreResult<OutOfStockId> {
        let row = sqlx::query(
            r#"
            INSERT INTO out_of_stock_record (
                record_id,
                book_id,
                required_quantity,
                source,
                priority,
                status,
                registered_at,
                resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (book_id) WHERE status = 'PENDING'
            DO UPDATE SET
                required_quantity = out_of_stock_record.required_quantity + EXCLUDED.required_quantity,
                source = EXCLUDED.source,
                priority = GREATEST(out_of_stock_record.priority, EXCLUDED.priority),
                registered_at = EXCLUDED.registered_at
            RETURNING record_id
            "#,
        )
        .bind(*record.id().as_uuid())
        .bind(record.book_id().as_str())
        .bind(record.required_quantity())
        .bind(record.source().as_str())
        .bind(record.priority().rank())
        .bind(record.status().as_str())
        .bind(record.registered_at())
        .bind(record.resolved_at())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_out_of_stock", e))?;

        let record_id: Uuid = row
            .try_get("record_id")
            .map_err(|e| map_sqlx_error("upsert_out_of_stock", e))?;
        Ok(OutOfStockId::from_uuid(record_id))
    }

    async fn find_out_of_stock(
        &mut self,
        id: OutOfStockId,
    ) -> StoreResult<Option<OutOfStockRecord>> {
        let row = sqlx::query(
            r#"
            SELECT record_id, book_id, required_quantity, source, priority, status,
                   registered_at, resolved_at
            FROM out_of_stock_record
            WHERE record_id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_out_of_stock", e))?;

        match row {
            Some(row) => {
                let record = OutOfStockRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_out_of_stock", e))?
                    .try_into()?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(record_id = %id, from = %from, to = %to), err)]
    async fn transition_out_of_stock(
        &mut self,
        id: OutOfStockId,
        from: OutOfStockStatus,
        to: OutOfStockStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if !from.can_transition(to) {
            return Ok(false);
        }
        let result = sqlx::query(
            r#"
            UPDATE out_of_stock_record
            SET status = $3,
                resolved_at = CASE WHEN $3 = 'RESOLVED' THEN $4 ELSE resolved_at END
            WHERE record_id = $1 AND status = $2
            "#,
        )
        .bind(*id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("transition_out_of_stock", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_order (
                purchase_order_id,
                supplier_id,
                buyer,
                estimated_amount,
                created_on,
                expected_date,
                status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*order.id().as_uuid())
        .bind(*order.supplier_id().as_uuid())
        .bind(order.buyer())
        .bind(order.estimated_amount())
        .bind(order.created_on())
        .bind(order.expected_date())
        .bind(order.status().as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_order", e))?;
        Ok(())
    }

    async fn insert_purchase_order_item(&mut self, item: &PurchaseOrderItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_item (
                purchase_item_id,
                purchase_order_id,
                book_id,
                quantity,
                unit_cost,
                out_of_stock_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*item.id().as_uuid())
        .bind(*item.purchase_order_id().as_uuid())
        .bind(item.book_id().as_str())
        .bind(item.quantity())
        .bind(item.unit_cost())
        .bind(item.out_of_stock_id().map(Uuid::from))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_order_item", e))?;
        Ok(())
    }

    async fn find_purchase_order(
        &mut self,
        id: PurchaseOrderId,
    ) -> StoreResult<Option<PurchaseOrder>> {
        let row = sqlx::query(
            r#"
            SELECT purchase_order_id, supplier_id, buyer, estimated_amount,
                   created_on, expected_date, status
            FROM purchase_order
            WHERE purchase_order_id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_purchase_order", e))?;

        match row {
            Some(row) => {
                let order = PurchaseOrderRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_purchase_order", e))?
                    .try_into()?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    async fn find_purchase_order_items(
        &mut self,
        order_id: PurchaseOrderId,
    ) -> StoreResult<Vec<PurchaseOrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT purchase_item_id, purchase_order_id, book_id, quantity, unit_cost,
                   out_of_stock_id
            FROM purchase_order_item
            WHERE purchase_order_id = $1
            ORDER BY purchase_item_id ASC
            "#,
        )
        .bind(*order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_purchase_order_items", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item = PurchaseItemRow::from_row(&row)
                .map_err(|e| map_sqlx_error("find_purchase_order_items", e))?
                .try_into()?;
            items.push(item);
        }
        Ok(items)
    }

    #[instrument(skip_all, fields(purchase_order_id = %id, from = %from, to = %to), err)]
    async fn transition_purchase_order(
        &mut self,
        id: PurchaseOrderId,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    ) -> StoreResult<bool> {
        if !from.can_transition(to) {
            return Ok(false);
        }
        let result = sqlx::query(
            r#"
            UPDATE purchase_order
            SET status = $3
            WHERE purchase_order_id = $1 AND status = $2
            "#,
        )
        .bind(*id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("transition_purchase_order", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip_all, err)]
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

/// Map a SQLx error onto [`StoreError`].
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: another writer inserted first.
                Some("23505") => StoreError::Conflict(msg),
                // Serialization failure under stricter isolation levels.
                Some("40001") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode_error(table: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode {table} row: {err}"))
}

struct BookRow {
    book_id: String,
    title: String,
    list_price: Decimal,
}

impl<'r> FromRow<'r, PgRow> for BookRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BookRow {
            book_id: row.try_get("book_id")?,
            title: row.try_get("title")?,
            list_price: row.try_get("list_price")?,
        })
    }
}

impl TryFrom<BookRow> for Book {
    type Error = StoreError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Book::new(BookId::from(row.book_id), row.title, row.list_price)
            .map_err(|e| decode_error("book", e))
    }
}

struct CreditLevelRow {
    level_id: i16,
    name: String,
    discount_rate: Decimal,
    min_total_spend: Decimal,
}

impl<'r> FromRow<'r, PgRow> for CreditLevelRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CreditLevelRow {
            level_id: row.try_get("level_id")?,
            name: row.try_get("name")?,
            discount_rate: row.try_get("discount_rate")?,
            min_total_spend: row.try_get("min_total_spend")?,
        })
    }
}

impl TryFrom<CreditLevelRow> for CreditLevel {
    type Error = StoreError;

    fn try_from(row: CreditLevelRow) -> Result<Self, Self::Error> {
        CreditLevel::new(
            CreditLevelId::new(row.level_id),
            row.name,
            row.discount_rate,
            row.min_total_spend,
        )
        .map_err(|e| decode_error("credit_level", e))
    }
}

struct CustomerRow {
    customer_id: Uuid,
    name: String,
    balance: Decimal,
    credit_level: i16,
    total_spend: Decimal,
}

impl<'r> FromRow<'r, PgRow> for CustomerRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CustomerRow {
            customer_id: row.try_get("customer_id")?,
            name: row.try_get("name")?,
            balance: row.try_get("balance")?,
            credit_level: row.try_get("credit_level")?,
            total_spend: row.try_get("total_spend")?,
        })
    }
}

impl TryFrom<CustomerRow> for Customer {
    type Error = StoreError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer::from_parts(
            CustomerId::from_uuid(row.customer_id),
            row.name,
            row.balance,
            CreditLevelId::new(row.credit_level),
            row.total_spend,
        ))
    }
}

struct SupplierRow {
    supplier_id: Uuid,
    name: String,
}

impl<'r> FromRow<'r, PgRow> for SupplierRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SupplierRow {
            supplier_id: row.try_get("supplier_id")?,
            name: row.try_get("name")?,
        })
    }
}

impl TryFrom<SupplierRow> for Supplier {
    type Error = StoreError;

    fn try_from(row: SupplierRow) -> Result<Self, Self::Error> {
        Supplier::new(SupplierId::from_uuid(row.supplier_id), row.name)
            .map_err(|e| decode_error("supplier", e))
    }
}

struct StockRow {
    book_id: String,
    quantity: i64,
    safety_stock: i64,
}

impl<'r> FromRow<'r, PgRow> for StockRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockRow {
            book_id: row.try_get("book_id")?,
            quantity: row.try_get("quantity")?,
            safety_stock: row.try_get("safety_stock")?,
        })
    }
}

impl TryFrom<StockRow> for StockLevel {
    type Error = StoreError;

    fn try_from(row: StockRow) -> Result<Self, Self::Error> {
        StockLevel::new(BookId::from(row.book_id), row.quantity, row.safety_stock)
            .map_err(|e| decode_error("inventory", e))
    }
}

struct OrderRow {
    order_id: Uuid,
    customer_id: Uuid,
    status: String,
    discount_rate: Decimal,
    goods_amount: Decimal,
    payable_amount: Decimal,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            order_id: row.try_get("order_id")?,
            customer_id: row.try_get("customer_id")?,
            status: row.try_get("status")?,
            discount_rate: row.try_get("discount_rate")?,
            goods_amount: row.try_get("goods_amount")?,
            payable_amount: row.try_get("payable_amount")?,
            created_at: row.try_get("created_at")?,
            paid_at: row.try_get("paid_at")?,
            shipped_at: row.try_get("shipped_at")?,
        })
    }
}

impl TryFrom<OrderRow> for SalesOrder {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| decode_error("sales_order", e))?;
        Ok(SalesOrder::from_parts(
            OrderId::from_uuid(row.order_id),
            CustomerId::from_uuid(row.customer_id),
            status,
            row.discount_rate,
            row.goods_amount,
            row.payable_amount,
            row.created_at,
            row.paid_at,
            row.shipped_at,
        ))
    }
}

struct OrderItemRow {
    item_id: Uuid,
    order_id: Uuid,
    book_id: String,
    quantity: i64,
    unit_price: Decimal,
    sub_amount: Decimal,
    shipped_quantity: i64,
    item_status: String,
}

impl<'r> FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderItemRow {
            item_id: row.try_get("item_id")?,
            order_id: row.try_get("order_id")?,
            book_id: row.try_get("book_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            sub_amount: row.try_get("sub_amount")?,
            shipped_quantity: row.try_get("shipped_quantity")?,
            item_status: row.try_get("item_status")?,
        })
    }
}

impl TryFrom<OrderItemRow> for SalesOrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let status: ItemStatus = row
            .item_status
            .parse()
            .map_err(|e| decode_error("sales_order_item", e))?;
        Ok(SalesOrderItem::from_parts(
            OrderItemId::from_uuid(row.item_id),
            OrderId::from_uuid(row.order_id),
            BookId::from(row.book_id),
            row.quantity,
            row.unit_price,
            row.sub_amount,
            row.shipped_quantity,
            status,
        ))
    }
}

struct ShipmentRow {
    shipment_id: Uuid,
    order_id: Uuid,
    carrier: String,
    tracking_number: String,
    operator: String,
    shipped_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ShipmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ShipmentRow {
            shipment_id: row.try_get("shipment_id")?,
            order_id: row.try_get("order_id")?,
            carrier: row.try_get("carrier")?,
            tracking_number: row.try_get("tracking_number")?,
            operator: row.try_get("operator")?,
            shipped_at: row.try_get("shipped_at")?,
        })
    }
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = StoreError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Shipment::new(
            ShipmentId::from_uuid(row.shipment_id),
            OrderId::from_uuid(row.order_id),
            row.carrier,
            row.tracking_number,
            row.operator,
            row.shipped_at,
        )
        .map_err(|e| decode_error("shipment", e))
    }
}

struct ShipmentItemRow {
    shipment_item_id: Uuid,
    shipment_id: Uuid,
    order_item_id: Uuid,
    book_id: String,
    quantity: i64,
}

impl<'r> FromRow<'r, PgRow> for ShipmentItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ShipmentItemRow {
            shipment_item_id: row.try_get("shipment_item_id")?,
            shipment_id: row.try_get("shipment_id")?,
            order_item_id: row.try_get("order_item_id")?,
            book_id: row.try_get("book_id")?,
            quantity: row.try_get("quantity")?,
        })
    }
}

impl TryFrom<ShipmentItemRow> for ShipmentItem {
    type Error = StoreError;

    fn try_from(row: ShipmentItemRow) -> Result<Self, Self::Error> {
        ShipmentItem::new(
            ShipmentItemId::from_uuid(row.shipment_item_id),
            ShipmentId::from_uuid(row.shipment_id),
            OrderItemId::from_uuid(row.order_item_id),
            BookId::from(row.book_id),
            row.quantity,
        )
        .map_err(|e| decode_error("shipment_item", e))
    }
}

struct OutOfStockRow {
    record_id: Uuid,
    book_id: String,
    required_quantity: i64,
    source: String,
    priority: i16,
    status: String,
    registered_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for OutOfStockRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OutOfStockRow {
            record_id: row.try_get("record_id")?,
            book_id: row.try_get("book_id")?,
            required_quantity: row.try_get("required_quantity")?,
            source: row.try_get("source")?,
            priority: row.try_get("priority")?,
            status: row.try_get("status")?,
            registered_at: row.try_get("registered_at")?,
            resolved_at: row.try_get("resolved_at")?,
        })
    }
}

impl TryFrom<OutOfStockRow> for OutOfStockRecord {
    type Error = StoreError;

    fn try_from(row: OutOfStockRow) -> Result<Self, Self::Error> {
        let source: OutOfStockSource = row
            .source
            .parse()
            .map_err(|e| decode_error("out_of_stock_record", e))?;
        let priority =
            Priority::from_rank(row.priority).map_err(|e| decode_error("out_of_stock_record", e))?;
        let status: OutOfStockStatus = row
            .status
            .parse()
            .map_err(|e| decode_error("out_of_stock_record", e))?;
        Ok(OutOfStockRecord::from_parts(
            OutOfStockId::from_uuid(row.record_id),
            BookId::from(row.book_id),
            row.required_quantity,
            source,
            priority,
            status,
            row.registered_at,
            row.resolved_at,
        ))
    }
}

struct PurchaseOrderRow {
    purchase_order_id: Uuid,
    supplier_id: Uuid,
    buyer: String,
    estimated_amount: Decimal,
    created_on: NaiveDate,
    expected_date: Option<NaiveDate>,
    status: String,
}

impl<'r> FromRow<'r, PgRow> for PurchaseOrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseOrderRow {
            purchase_order_id: row.try_get("purchase_order_id")?,
            supplier_id: row.try_get("supplier_id")?,
            buyer: row.try_get("buyer")?,
            estimated_amount: row.try_get("estimated_amount")?,
            created_on: row.try_get("created_on")?,
            expected_date: row.try_get("expected_date")?,
            status: row.try_get("status")?,
        })
    }
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = StoreError;

    fn try_from(row: PurchaseOrderRow) -> Result<Self, Self::Error> {
        let status: PurchaseOrderStatus = row
            .status
            .parse()
            .map_err(|e| decode_error("purchase_order", e))?;
        Ok(PurchaseOrder::from_parts(
            PurchaseOrderId::from_uuid(row.purchase_order_id),
            SupplierId::from_uuid(row.supplier_id),
            row.buyer,
            row.estimated_amount,
            row.created_on,
            row.expected_date,
            status,
        ))
    }
}

struct PurchaseItemRow {
    purchase_item_id: Uuid,
    purchase_order_id: Uuid,
    book_id: String,
    quantity: i64,
    unit_cost: Decimal,
    out_of_stock_id: Option<Uuid>,
}

impl<'r> FromRow<'r, PgRow> for PurchaseItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseItemRow {
            purchase_item_id: row.try_get("purchase_item_id")?,
            purchase_order_id: row.try_get("purchase_order_id")?,
            book_id: row.try_get("book_id")?,
            quantity: row.try_get("quantity")?,
            unit_cost: row.try_get("unit_cost")?,
            out_of_stock_id: row.try_get("out_of_stock_id")?,
        })
    }
}

impl TryFrom<PurchaseItemRow> for PurchaseOrderItem {
    type Error = StoreError;

    fn try_from(row: PurchaseItemRow) -> Result<Self, Self::Error> {
        PurchaseOrderItem::new(
            PurchaseItemId::from_uuid(row.purchase_item_id),
            PurchaseOrderId::from_uuid(row.purchase_order_id),
            BookId::from(row.book_id),
            row.quantity,
            row.unit_cost,
            row.out_of_stock_id.map(OutOfStockId::from_uuid),
        )
        .map_err(|e| decode_error("purchase_order_item", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect_from_env() -> PostgresLedger {
        PostgresLedger::from_env()
            .await
            .expect("DATABASE_URL must point at a reachable Postgres")
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn unique_book() -> Book {
        let code = format!("B-{}", Uuid::now_v7().simple());
        Book::new(BookId::from(code), "Integration Test Title", dec("25.00")).unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a live Postgres with the documented schema"]
    async fn book_roundtrip_inside_one_transaction() {
        let ledger = connect_from_env().await;
        let book = unique_book();

        let mut tx = ledger.begin().await.unwrap();
        tx.insert_book(&book).await.unwrap();
        let found = tx.find_book(book.id()).await.unwrap();
        assert_eq!(found, Some(book));
        // Dropped uncommitted: nothing persists.
    }

    #[tokio::test]
    #[ignore = "needs a live Postgres with the documented schema"]
    async fn guarded_stock_removal_misses_without_mutating() {
        let ledger = connect_from_env().await;
        let book = unique_book();

        let mut tx = ledger.begin().await.unwrap();
        tx.insert_book(&book).await.unwrap();
        tx.upsert_stock(&StockLevel::new(book.id().clone(), 5, 0).unwrap())
            .await
            .unwrap();

        assert!(!tx.remove_stock(book.id(), 6).await.unwrap());
        assert!(tx.remove_stock(book.id(), 5).await.unwrap());
        let level = tx.find_stock(book.id()).await.unwrap().unwrap();
        assert_eq!(level.quantity(), 0);
    }

    #[tokio::test]
    #[ignore = "needs a live Postgres with the documented schema"]
    async fn pending_shortages_merge_per_book() {
        let ledger = connect_from_env().await;
        let book = unique_book();

        let mut tx = ledger.begin().await.unwrap();
        tx.insert_book(&book).await.unwrap();

        let first = OutOfStockRecord::new(
            OutOfStockId::new(),
            book.id().clone(),
            3,
            OutOfStockSource::Manual,
            Priority::High,
            Utc::now(),
        )
        .unwrap();
        let second = OutOfStockRecord::new(
            OutOfStockId::new(),
            book.id().clone(),
            4,
            OutOfStockSource::CustomerRequest,
            Priority::Normal,
            Utc::now(),
        )
        .unwrap();

        let first_id = tx.upsert_out_of_stock(&first).await.unwrap();
        let second_id = tx.upsert_out_of_stock(&second).await.unwrap();
        assert_eq!(first_id, second_id);

        let merged = tx.find_out_of_stock(first_id).await.unwrap().unwrap();
        assert_eq!(merged.required_quantity(), 7);
        assert_eq!(merged.priority(), Priority::High);
        assert_eq!(merged.source(), OutOfStockSource::CustomerRequest);
    }
}
