//! Sales orders and their lifecycle.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstall_core::{
    BookId, CustomerId, DomainError, DomainResult, Entity, OrderId, OrderItemId,
};

use crate::pricing::LinePrice;

/// Sales order lifecycle.
///
/// Settlement success is what makes an order shippable, so payment moves it
/// straight from PENDING_PAYMENT to PENDING_SHIPMENT. SHIPPED is terminal.
/// Forward edges only; every transition against the store is a
/// compare-and-set on the expected current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    PendingShipment,
    Shipped,
}

impl OrderStatus {
    pub fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::PendingShipment) | (Self::PendingShipment, Self::Shipped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::PendingShipment => "PENDING_SHIPMENT",
            Self::Shipped => "SHIPPED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(Self::PendingPayment),
            "PENDING_SHIPMENT" => Ok(Self::PendingShipment),
            "SHIPPED" => Ok(Self::Shipped),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Per-line shipping progress, derived from shipped versus ordered
/// quantities. The primary flow ships the full remaining balance, but the
/// data model represents partial progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Ordered,
    PartShipped,
    Shipped,
}

impl ItemStatus {
    /// Status implied by a shipping progress pair.
    pub fn for_progress(shipped_quantity: i64, ordered_quantity: i64) -> Self {
        if shipped_quantity <= 0 {
            Self::Ordered
        } else if shipped_quantity < ordered_quantity {
            Self::PartShipped
        } else {
            Self::Shipped
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ORDERED",
            Self::PartShipped => "PART_SHIPPED",
            Self::Shipped => "SHIPPED",
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDERED" => Ok(Self::Ordered),
            "PART_SHIPPED" => Ok(Self::PartShipped),
            "SHIPPED" => Ok(Self::Shipped),
            other => Err(DomainError::validation(format!(
                "unknown item status: {other}"
            ))),
        }
    }
}

/// One order line: a book, its quantity, and the price snapshot taken when
/// the order was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderItem {
    id: OrderItemId,
    order_id: OrderId,
    book_id: BookId,
    quantity: i64,
    unit_price: Decimal,
    sub_amount: Decimal,
    shipped_quantity: i64,
    status: ItemStatus,
}

impl SalesOrderItem {
    pub fn new(
        id: OrderItemId,
        order_id: OrderId,
        book_id: BookId,
        quantity: i64,
        price: LinePrice,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive: {quantity}"
            )));
        }
        Ok(Self {
            id,
            order_id,
            book_id,
            quantity,
            unit_price: price.unit_price,
            sub_amount: price.sub_amount,
            shipped_quantity: 0,
            status: ItemStatus::Ordered,
        })
    }

    /// Rebuild an item from stored fields, trusting the store's invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderItemId,
        order_id: OrderId,
        book_id: BookId,
        quantity: i64,
        unit_price: Decimal,
        sub_amount: Decimal,
        shipped_quantity: i64,
        status: ItemStatus,
    ) -> Self {
        Self {
            id,
            order_id,
            book_id,
            quantity,
            unit_price,
            sub_amount,
            shipped_quantity,
            status,
        }
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn sub_amount(&self) -> Decimal {
        self.sub_amount
    }

    pub fn shipped_quantity(&self) -> i64 {
        self.shipped_quantity
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Quantity still waiting to ship.
    pub fn remaining_quantity(&self) -> i64 {
        self.quantity - self.shipped_quantity
    }

    /// Advance shipping progress by `quantity`. Returns whether it applied;
    /// progress never overshoots the ordered quantity.
    pub fn record_shipment(&mut self, quantity: i64) -> bool {
        if quantity <= 0 || quantity > self.remaining_quantity() {
            return false;
        }
        self.shipped_quantity += quantity;
        self.status = ItemStatus::for_progress(self.shipped_quantity, self.quantity);
        true
    }
}

impl Entity for SalesOrderItem {
    type Id = OrderItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A sales order header.
///
/// `discount_rate_snapshot` is the customer's rate at build time and never
/// changes afterwards; later credit-level moves do not reprice the order.
/// `paid_at`/`shipped_at` are stamped exactly when the corresponding
/// transition commits and are never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    id: OrderId,
    customer_id: CustomerId,
    status: OrderStatus,
    discount_rate_snapshot: Decimal,
    goods_amount: Decimal,
    payable_amount: Decimal,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
}

impl SalesOrder {
    /// Build a new order over already-priced items. The payable amount is
    /// the goods amount; no fees or further discounts apply here.
    pub fn new(
        id: OrderId,
        customer_id: CustomerId,
        discount_rate_snapshot: Decimal,
        items: &[SalesOrderItem],
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("an order needs at least one line"));
        }
        if let Some(stray) = items.iter().find(|item| item.order_id() != id) {
            return Err(DomainError::validation(format!(
                "line {} belongs to order {}, not {}",
                stray.id(),
                stray.order_id(),
                id
            )));
        }
        if discount_rate_snapshot <= Decimal::ZERO || discount_rate_snapshot > Decimal::ONE {
            return Err(DomainError::validation(format!(
                "discount rate must lie in (0, 1]: {discount_rate_snapshot}"
            )));
        }
        let goods_amount: Decimal = items.iter().map(SalesOrderItem::sub_amount).sum();
        Ok(Self {
            id,
            customer_id,
            status: OrderStatus::PendingPayment,
            discount_rate_snapshot,
            goods_amount,
            payable_amount: goods_amount,
            created_at,
            paid_at: None,
            shipped_at: None,
        })
    }

    /// Rebuild an order from stored fields, trusting the store's invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        customer_id: CustomerId,
        status: OrderStatus,
        discount_rate_snapshot: Decimal,
        goods_amount: Decimal,
        payable_amount: Decimal,
        created_at: DateTime<Utc>,
        paid_at: Option<DateTime<Utc>>,
        shipped_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            customer_id,
            status,
            discount_rate_snapshot,
            goods_amount,
            payable_amount,
            created_at,
            paid_at,
            shipped_at,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn discount_rate_snapshot(&self) -> Decimal {
        self.discount_rate_snapshot
    }

    pub fn goods_amount(&self) -> Decimal {
        self.goods_amount
    }

    pub fn payable_amount(&self) -> Decimal {
        self.payable_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    /// PENDING_PAYMENT → PENDING_SHIPMENT, stamping the payment time.
    /// Returns whether the transition applied.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition(OrderStatus::PendingShipment) {
            return false;
        }
        self.status = OrderStatus::PendingShipment;
        self.paid_at = Some(at);
        true
    }

    /// PENDING_SHIPMENT → SHIPPED, stamping the shipment time. Returns
    /// whether the transition applied.
    pub fn mark_shipped(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition(OrderStatus::Shipped) {
            return false;
        }
        self.status = OrderStatus::Shipped;
        self.shipped_at = Some(at);
        true
    }
}

impl Entity for SalesOrder {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
