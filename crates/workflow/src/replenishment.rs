//! Replenishment: shortage intake, purchasing, and goods receipt.
//!
//! Shortages accumulate as out-of-stock records (one PENDING record per
//! book; repeated demand merges into it). Purchasing turns a PENDING record
//! into an ISSUED purchase order, and receipt turns the order's lines back
//! into stock while resolving the records they were raised for.
//!
//! ## The create-then-flip seam
//!
//! `create_purchase_order` runs as two steps. The first transaction issues
//! the purchase order and commits it; only then does a second, separate
//! transaction flip the record PENDING -> PURCHASING. A crash or conflict
//! between the two leaves an issued order whose record still says PENDING.
//! That state is harmless (the record cannot be purchased twice once the
//! flip lands) and self-healing: the engine retries the flip a bounded
//! number of times, logs a warning when it gives up, and
//! [`ReplenishmentEngine::mark_out_of_stock_purchasing`] re-drives the flip
//! by hand. The purchase order is authoritative either way; its id is
//! returned even when the flip never landed.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use bookstall_core::{
    BookId, DomainError, OutOfStockId, PurchaseItemId, PurchaseOrderId, SupplierId,
};
use bookstall_inventory::{OutOfStockRecord, OutOfStockSource, OutOfStockStatus, Priority};
use bookstall_purchasing::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};
use bookstall_store::LedgerStore;

use crate::error::WorkflowResult;

/// How many times the post-commit PENDING -> PURCHASING flip is attempted
/// before the engine settles for the warning.
const FLIP_ATTEMPTS: u32 = 3;
const FLIP_PAUSE: Duration = Duration::from_millis(50);

/// One drafted purchase line: what to buy, how many, at what unit cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseItemDraft {
    pub book_id: BookId,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

/// Runs the shortage-to-receipt side of the lifecycle.
#[derive(Debug, Clone)]
pub struct ReplenishmentEngine<S> {
    ledger: S,
}

impl<S> ReplenishmentEngine<S> {
    pub fn new(ledger: S) -> Self {
        Self { ledger }
    }
}

impl<S: LedgerStore> ReplenishmentEngine<S> {
    /// Register demand for a book that cannot be supplied from stock.
    ///
    /// Demand for a book that already has a PENDING record merges into it
    /// (quantities add up, the priority keeps the higher of the two) and the
    /// surviving record's id is returned; otherwise a fresh record is
    /// created.
    #[instrument(
        skip(self),
        fields(book_id = %book_id, required_quantity, source = source.as_str()),
        err
    )]
    pub async fn register_out_of_stock(
        &self,
        book_id: BookId,
        required_quantity: i64,
        source: OutOfStockSource,
        priority: Priority,
    ) -> WorkflowResult<OutOfStockId> {
        let mut tx = self.ledger.begin().await?;

        tx.find_book(&book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("book", &book_id))?;

        let record = OutOfStockRecord::new(
            OutOfStockId::new(),
            book_id,
            required_quantity,
            source,
            priority,
            Utc::now(),
        )?;
        let record_id = tx.upsert_out_of_stock(&record).await?;

        tx.commit().await?;
        Ok(record_id)
    }

    /// Issue a purchase order for a PENDING out-of-stock record.
    ///
    /// The order is committed first; the record's PENDING -> PURCHASING flip
    /// runs afterwards in its own transaction with a bounded retry. When the
    /// flip never lands the order still stands and its id is still returned;
    /// the leftover PENDING record is logged and can be flipped later with
    /// [`ReplenishmentEngine::mark_out_of_stock_purchasing`].
    #[instrument(
        skip(self, drafts),
        fields(record_id = %record_id, supplier_id = %supplier_id, line_count = drafts.len()),
        err
    )]
    pub async fn create_purchase_order(
        &self,
        record_id: OutOfStockId,
        supplier_id: SupplierId,
        buyer: &str,
        expected_date: Option<NaiveDate>,
        drafts: &[PurchaseItemDraft],
    ) -> WorkflowResult<PurchaseOrderId> {
        let mut tx = self.ledger.begin().await?;

        let record = tx
            .find_out_of_stock(record_id)
            .await?
            .ok_or_else(|| DomainError::not_found("out-of-stock record", record_id))?;
        if record.status() != OutOfStockStatus::Pending {
            return Err(DomainError::invalid_state(
                "out-of-stock record",
                record_id,
                format!("expected PENDING, found {}", record.status().as_str()),
            )
            .into());
        }
        tx.find_supplier(supplier_id)
            .await?
            .ok_or_else(|| DomainError::not_found("supplier", supplier_id))?;

        if drafts.is_empty() {
            return Err(
                DomainError::validation("a purchase order needs at least one line").into(),
            );
        }
        if !drafts.iter().any(|draft| draft.book_id == *record.book_id()) {
            return Err(DomainError::validation(format!(
                "no line covers book {} of out-of-stock record {record_id}",
                record.book_id()
            ))
            .into());
        }

        let order_id = PurchaseOrderId::new();
        let mut items = Vec::with_capacity(drafts.len());
        for draft in drafts {
            tx.find_book(&draft.book_id)
                .await?
                .ok_or_else(|| DomainError::not_found("book", &draft.book_id))?;
            // Lines buying the record's book carry the link used at receipt
            // to resolve the record.
            let link = (draft.book_id == *record.book_id()).then_some(record_id);
            items.push(PurchaseOrderItem::new(
                PurchaseItemId::new(),
                order_id,
                draft.book_id.clone(),
                draft.quantity,
                draft.unit_cost,
                link,
            )?);
        }
        let order = PurchaseOrder::new(
            order_id,
            supplier_id,
            buyer,
            &items,
            Utc::now().date_naive(),
            expected_date,
        )?;

        tx.insert_purchase_order(&order).await?;
        for item in &items {
            tx.insert_purchase_order_item(item).await?;
        }
        tx.commit().await?;

        for attempt in 1..=FLIP_ATTEMPTS {
            match self.mark_out_of_stock_purchasing(record_id).await {
                Ok(()) => return Ok(order_id),
                Err(err) if attempt < FLIP_ATTEMPTS => {
                    tracing::debug!(
                        record_id = %record_id,
                        attempt,
                        error = %err,
                        "PENDING -> PURCHASING flip failed, retrying"
                    );
                    tokio::time::sleep(FLIP_PAUSE).await;
                }
                Err(err) => {
                    tracing::warn!(
                        record_id = %record_id,
                        purchase_order_id = %order_id,
                        error = %err,
                        "out-of-stock record stayed PENDING after its purchase order was issued"
                    );
                }
            }
        }
        Ok(order_id)
    }

    /// Flip an out-of-stock record PENDING -> PURCHASING.
    ///
    /// This is the manual re-drive for a flip that never landed after
    /// [`ReplenishmentEngine::create_purchase_order`]. A record already in
    /// PURCHASING or RESOLVED counts as success.
    #[instrument(skip(self), fields(record_id = %record_id), err)]
    pub async fn mark_out_of_stock_purchasing(
        &self,
        record_id: OutOfStockId,
    ) -> WorkflowResult<()> {
        let mut tx = self.ledger.begin().await?;

        let record = tx
            .find_out_of_stock(record_id)
            .await?
            .ok_or_else(|| DomainError::not_found("out-of-stock record", record_id))?;
        match record.status() {
            OutOfStockStatus::Purchasing | OutOfStockStatus::Resolved => return Ok(()),
            OutOfStockStatus::Pending => {}
        }

        // A miss here means a concurrent flip moved the record out of
        // PENDING between the read and the update, which is the outcome we
        // wanted anyway.
        tx.transition_out_of_stock(
            record_id,
            OutOfStockStatus::Pending,
            OutOfStockStatus::Purchasing,
            Utc::now(),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Receive the goods of an ISSUED purchase order.
    ///
    /// Adds every line's quantity to stock (creating inventory rows for
    /// books never stocked before) and resolves the out-of-stock records the
    /// lines are linked to, all in one transaction. Receiving twice fails
    /// with `InvalidState` on the ISSUED -> RECEIVED compare-and-set.
    #[instrument(skip(self), fields(purchase_order_id = %purchase_order_id), err)]
    pub async fn receive_goods(&self, purchase_order_id: PurchaseOrderId) -> WorkflowResult<()> {
        let mut tx = self.ledger.begin().await?;

        let order = tx
            .find_purchase_order(purchase_order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("purchase order", purchase_order_id))?;
        let received = tx
            .transition_purchase_order(
                purchase_order_id,
                PurchaseOrderStatus::Issued,
                PurchaseOrderStatus::Received,
            )
            .await?;
        if !received {
            return Err(DomainError::invalid_state(
                "purchase order",
                purchase_order_id,
                format!("expected ISSUED, found {}", order.status().as_str()),
            )
            .into());
        }

        let items = tx.find_purchase_order_items(purchase_order_id).await?;
        let received_at = Utc::now();
        for item in &items {
            tx.add_stock(item.book_id(), item.quantity()).await?;
        }

        let mut seen: HashSet<OutOfStockId> = HashSet::new();
        for record_id in items.iter().filter_map(PurchaseOrderItem::out_of_stock_id) {
            if !seen.insert(record_id) {
                continue;
            }
            // The usual path is PURCHASING -> RESOLVED; records whose flip
            // never landed resolve straight from PENDING.
            let from_purchasing = tx
                .transition_out_of_stock(
                    record_id,
                    OutOfStockStatus::Purchasing,
                    OutOfStockStatus::Resolved,
                    received_at,
                )
                .await?;
            if !from_purchasing {
                tx.transition_out_of_stock(
                    record_id,
                    OutOfStockStatus::Pending,
                    OutOfStockStatus::Resolved,
                    received_at,
                )
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
