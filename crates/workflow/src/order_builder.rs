//! Order intake: validate the cart, price it, persist it.
//!
//! ```text
//! (customer, [(book, qty)])
//!   |
//!   1. validate the draft lines (non-empty, positive quantities)
//!   |
//!   2. load customer and credit level, price each line at the
//!      customer's current discount rate (half-up to cents)
//!   |
//!   3. insert the PENDING_PAYMENT order and its lines, one transaction
//!   v
//! OrderId
//! ```
//!
//! Stock is deliberately not consulted here. An order only reserves money,
//! never inventory; shortage surfaces at shipment time where the guarded
//! decrement decides.

use chrono::Utc;
use tracing::instrument;

use bookstall_core::{BookId, CustomerId, DomainError, OrderId, OrderItemId};
use bookstall_sales::{SalesOrder, SalesOrderItem, price_line};
use bookstall_store::LedgerStore;

use crate::error::WorkflowResult;

/// Builds priced sales orders against the ledger.
#[derive(Debug, Clone)]
pub struct OrderBuilder<S> {
    ledger: S,
}

impl<S> OrderBuilder<S> {
    pub fn new(ledger: S) -> Self {
        Self { ledger }
    }
}

impl<S: LedgerStore> OrderBuilder<S> {
    /// Build an order for `customer_id` over the drafted `(book, quantity)`
    /// lines and return its id.
    ///
    /// Each line is priced at the customer's current discount rate and the
    /// rate is snapshotted onto the order, so later credit-level changes
    /// never reprice an existing order. The order starts in
    /// `PENDING_PAYMENT`; nothing is charged yet.
    #[instrument(skip(self, lines), fields(customer_id = %customer_id, line_count = lines.len()), err)]
    pub async fn build_order(
        &self,
        customer_id: CustomerId,
        lines: &[(BookId, i64)],
    ) -> WorkflowResult<OrderId> {
        if lines.is_empty() {
            return Err(DomainError::validation("an order needs at least one line").into());
        }
        if let Some((book_id, quantity)) = lines.iter().find(|(_, quantity)| *quantity <= 0) {
            return Err(DomainError::validation(format!(
                "quantity for book {book_id} must be positive: {quantity}"
            ))
            .into());
        }

        let mut tx = self.ledger.begin().await?;

        let customer = tx
            .find_customer(customer_id)
            .await?
            .ok_or_else(|| DomainError::not_found("customer", customer_id))?;
        let level = tx
            .find_credit_level(customer.credit_level())
            .await?
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "customer {customer_id} references unknown credit level {}",
                    customer.credit_level()
                ))
            })?;

        let order_id = OrderId::new();
        let mut items = Vec::with_capacity(lines.len());
        for (book_id, quantity) in lines {
            let book = tx
                .find_book(book_id)
                .await?
                .ok_or_else(|| DomainError::not_found("book", book_id))?;
            let price = price_line(book.list_price(), level.discount_rate(), *quantity)?;
            items.push(SalesOrderItem::new(
                OrderItemId::new(),
                order_id,
                book_id.clone(),
                *quantity,
                price,
            )?);
        }

        let order = SalesOrder::new(
            order_id,
            customer_id,
            level.discount_rate(),
            &items,
            Utc::now(),
        )?;
        tx.insert_order(&order).await?;
        for item in &items {
            tx.insert_order_item(item).await?;
        }
        tx.commit().await?;

        Ok(order_id)
    }
}
