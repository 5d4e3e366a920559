//! Shipment: stock leaves the shelf here.
//!
//! ```text
//! ship_order(order_id, carrier, tracking, operator)
//!   |
//!   1. validate the manifest fields (none may be blank)
//!   |
//!   2. load the order and its lines; it must sit in PENDING_SHIPMENT
//!   |
//!   3. claim the order: CAS PENDING_SHIPMENT -> SHIPPED, stamping
//!      shipped_at (a miss means someone else claimed it)
//!   |
//!   4. aggregate per-book needs across the lines and decrement stock
//!      under the quantity >= need guard; a miss aborts with the
//!      observed on-hand quantity in the error
//!   |
//!   5. record the shipment manifest and advance each line's progress
//!   v
//! commit -> ShipmentId
//! ```
//!
//! Two orders racing for the last copies of a book both reach step 4; the
//! guard lets one decrement through and the loser aborts, so on-hand stock
//! never goes negative. After every decrement the engine compares the
//! remaining quantity against the safety floor and registers a LOW_STOCK
//! shortage for the deficit in the same transaction, merging into any
//! pending shortage for that book.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::instrument;

use bookstall_core::{BookId, DomainError, OrderId, OutOfStockId, ShipmentId, ShipmentItemId};
use bookstall_inventory::{OutOfStockRecord, OutOfStockSource, Priority};
use bookstall_sales::OrderStatus;
use bookstall_shipping::{Shipment, ShipmentItem};
use bookstall_store::LedgerStore;

use crate::error::WorkflowResult;

/// Ships settled orders and keeps inventory honest while doing it.
#[derive(Debug, Clone)]
pub struct ShipmentEngine<S> {
    ledger: S,
}

impl<S> ShipmentEngine<S> {
    pub fn new(ledger: S) -> Self {
        Self { ledger }
    }
}

impl<S: LedgerStore> ShipmentEngine<S> {
    /// Ship everything still outstanding on one order.
    ///
    /// Fails with `InvalidState` when the order is not in `PENDING_SHIPMENT`
    /// (shipping twice lands here) and with `InsufficientStock` when any
    /// book's on-hand quantity cannot cover the order's aggregated need;
    /// either way nothing is decremented and no shipment is recorded.
    #[instrument(
        skip(self, carrier, tracking_number, operator),
        fields(order_id = %order_id, carrier = carrier),
        err
    )]
    pub async fn ship_order(
        &self,
        order_id: OrderId,
        carrier: &str,
        tracking_number: &str,
        operator: &str,
    ) -> WorkflowResult<ShipmentId> {
        let shipped_at = Utc::now();
        let shipment = Shipment::new(
            ShipmentId::new(),
            order_id,
            carrier,
            tracking_number,
            operator,
            shipped_at,
        )?;

        let mut tx = self.ledger.begin().await?;

        let order = tx
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("sales order", order_id))?;
        if order.status() != OrderStatus::PendingShipment {
            return Err(DomainError::invalid_state(
                "sales order",
                order_id,
                format!(
                    "expected PENDING_SHIPMENT, found {}",
                    order.status().as_str()
                ),
            )
            .into());
        }
        let items = tx.find_order_items(order_id).await?;
        if items.is_empty() {
            return Err(DomainError::not_found("sales order lines", order_id).into());
        }

        let claimed = tx
            .transition_order(
                order_id,
                OrderStatus::PendingShipment,
                OrderStatus::Shipped,
                shipped_at,
            )
            .await?;
        if !claimed {
            return Err(DomainError::invalid_state(
                "sales order",
                order_id,
                "claimed by a concurrent shipment",
            )
            .into());
        }

        // One decrement per book, not per line.
        let mut needs: BTreeMap<&BookId, i64> = BTreeMap::new();
        for item in &items {
            if item.remaining_quantity() > 0 {
                *needs.entry(item.book_id()).or_insert(0) += item.remaining_quantity();
            }
        }

        for (&book_id, &need) in &needs {
            let removed = tx.remove_stock(book_id, need).await?;
            if !removed {
                let on_hand = tx
                    .find_stock(book_id)
                    .await?
                    .map(|stock| stock.quantity())
                    .unwrap_or(0);
                return Err(DomainError::insufficient_stock(book_id, on_hand, need).into());
            }

            if let Some(stock) = tx.find_stock(book_id).await? {
                let deficit = stock.safety_deficit();
                if deficit > 0 {
                    let record = OutOfStockRecord::new(
                        OutOfStockId::new(),
                        book_id.clone(),
                        deficit,
                        OutOfStockSource::LowStock,
                        Priority::Normal,
                        shipped_at,
                    )?;
                    tx.upsert_out_of_stock(&record).await?;
                }
            }
        }

        tx.insert_shipment(&shipment).await?;
        for item in &items {
            let quantity = item.remaining_quantity();
            if quantity == 0 {
                continue;
            }
            let line = ShipmentItem::new(
                ShipmentItemId::new(),
                shipment.id(),
                item.id(),
                item.book_id().clone(),
                quantity,
            )?;
            tx.insert_shipment_item(&line).await?;
            let advanced = tx.advance_item_progress(item.id(), quantity).await?;
            if !advanced {
                return Err(DomainError::invalid_state(
                    "sales order line",
                    item.id(),
                    "shipping progress no longer matches the ordered quantity",
                )
                .into());
            }
        }

        tx.commit().await?;
        Ok(shipment.id())
    }
}
