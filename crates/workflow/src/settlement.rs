//! Payment settlement: the money moves here.
//!
//! ```text
//! pay_order(order_id)
//!   |
//!   1. load the order; it must sit in PENDING_PAYMENT
//!   |
//!   2. load the paying customer
//!   |
//!   3. claim the order: CAS PENDING_PAYMENT -> PENDING_SHIPMENT,
//!      stamping paid_at (a miss means someone else claimed it)
//!   |
//!   4. debit the balance under the balance >= payable guard
//!      (a miss means the funds are not there)
//!   |
//!   5. add the payable to the customer's lifetime spend and promote
//!      the credit level if a better one is now covered
//!   v
//! commit
//! ```
//!
//! The claim comes before the debit on purpose: of N concurrent settlements
//! of one order, exactly one wins the CAS, so the debit runs at most once.
//! Any failure after the claim aborts the transaction, which undoes the
//! claim along with everything else.

use chrono::Utc;
use tracing::instrument;

use bookstall_core::{DomainError, OrderId};
use bookstall_parties::best_level_for;
use bookstall_sales::OrderStatus;
use bookstall_store::LedgerStore;

use crate::error::WorkflowResult;

/// Settles orders against prepaid customer balances.
#[derive(Debug, Clone)]
pub struct PaymentSettlement<S> {
    ledger: S,
}

impl<S> PaymentSettlement<S> {
    pub fn new(ledger: S) -> Self {
        Self { ledger }
    }
}

impl<S: LedgerStore> PaymentSettlement<S> {
    /// Settle one order from its customer's balance.
    ///
    /// Fails with `InvalidState` when the order is not in `PENDING_PAYMENT`
    /// (paying twice lands here) and with `InsufficientFunds` when the
    /// balance cannot cover the payable amount; neither leaves any partial
    /// effect behind.
    #[instrument(skip(self), fields(order_id = %order_id), err)]
    pub async fn pay_order(&self, order_id: OrderId) -> WorkflowResult<()> {
        let mut tx = self.ledger.begin().await?;

        let order = tx
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("sales order", order_id))?;
        if order.status() != OrderStatus::PendingPayment {
            return Err(DomainError::invalid_state(
                "sales order",
                order_id,
                format!("expected PENDING_PAYMENT, found {}", order.status().as_str()),
            )
            .into());
        }
        let customer = tx
            .find_customer(order.customer_id())
            .await?
            .ok_or_else(|| DomainError::not_found("customer", order.customer_id()))?;

        let claimed = tx
            .transition_order(
                order_id,
                OrderStatus::PendingPayment,
                OrderStatus::PendingShipment,
                Utc::now(),
            )
            .await?;
        if !claimed {
            return Err(DomainError::invalid_state(
                "sales order",
                order_id,
                "claimed by a concurrent settlement",
            )
            .into());
        }

        let payable = order.payable_amount();
        let debited = tx
            .debit_customer_balance(order.customer_id(), payable)
            .await?;
        if !debited {
            return Err(DomainError::insufficient_funds(
                order.customer_id(),
                customer.balance(),
                payable,
            )
            .into());
        }

        tx.add_customer_spend(order.customer_id(), payable).await?;
        let new_total_spend = customer.total_spend() + payable;
        let levels = tx.list_credit_levels().await?;
        if let Some(best) = best_level_for(&levels, new_total_spend) {
            if best.id() > customer.credit_level() {
                tx.set_customer_credit_level(order.customer_id(), best.id())
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
