//! Purchase orders and their receipt lifecycle.

use core::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstall_core::{
    BookId, DomainError, DomainResult, Entity, OutOfStockId, PurchaseItemId, PurchaseOrderId,
    SupplierId,
};

/// Purchase order lifecycle: issued to the supplier, then received. One
/// forward edge; receipt is applied once, guarded by compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Issued,
    Received,
}

impl PurchaseOrderStatus {
    pub fn can_transition(self, next: Self) -> bool {
        matches!((self, next), (Self::Issued, Self::Received))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "ISSUED",
            Self::Received => "RECEIVED",
        }
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUED" => Ok(Self::Issued),
            "RECEIVED" => Ok(Self::Received),
            other => Err(DomainError::validation(format!(
                "unknown purchase order status: {other}"
            ))),
        }
    }
}

/// One line of a purchase order. Lines covering an out-of-stock record carry
/// its id so receipt can resolve the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    id: PurchaseItemId,
    purchase_order_id: PurchaseOrderId,
    book_id: BookId,
    quantity: i64,
    unit_cost: Decimal,
    out_of_stock_id: Option<OutOfStockId>,
}

impl PurchaseOrderItem {
    pub fn new(
        id: PurchaseItemId,
        purchase_order_id: PurchaseOrderId,
        book_id: BookId,
        quantity: i64,
        unit_cost: Decimal,
        out_of_stock_id: Option<OutOfStockId>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "purchase quantity must be positive: {quantity}"
            )));
        }
        if unit_cost < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "unit cost must not be negative: {unit_cost}"
            )));
        }
        Ok(Self {
            id,
            purchase_order_id,
            book_id,
            quantity,
            unit_cost,
            out_of_stock_id,
        })
    }

    pub fn id(&self) -> PurchaseItemId {
        self.id
    }

    pub fn purchase_order_id(&self) -> PurchaseOrderId {
        self.purchase_order_id
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    pub fn out_of_stock_id(&self) -> Option<OutOfStockId> {
        self.out_of_stock_id
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.quantity)
    }
}

impl Entity for PurchaseOrderItem {
    type Id = PurchaseItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A purchase order issued to a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    supplier_id: SupplierId,
    buyer: String,
    estimated_amount: Decimal,
    created_on: NaiveDate,
    expected_date: Option<NaiveDate>,
    status: PurchaseOrderStatus,
}

impl PurchaseOrder {
    /// Build an issued purchase order over its lines; the estimated amount
    /// sums the line totals.
    pub fn new(
        id: PurchaseOrderId,
        supplier_id: SupplierId,
        buyer: impl Into<String>,
        items: &[PurchaseOrderItem],
        created_on: NaiveDate,
        expected_date: Option<NaiveDate>,
    ) -> DomainResult<Self> {
        let buyer = buyer.into();
        if buyer.trim().is_empty() {
            return Err(DomainError::validation("buyer must not be blank"));
        }
        if items.is_empty() {
            return Err(DomainError::validation(
                "a purchase order needs at least one line",
            ));
        }
        if let Some(stray) = items.iter().find(|item| item.purchase_order_id() != id) {
            return Err(DomainError::validation(format!(
                "line {} belongs to purchase order {}, not {}",
                stray.id(),
                stray.purchase_order_id(),
                id
            )));
        }
        let estimated_amount = items.iter().map(PurchaseOrderItem::line_total).sum();
        Ok(Self {
            id,
            supplier_id,
            buyer,
            estimated_amount,
            created_on,
            expected_date,
            status: PurchaseOrderStatus::Issued,
        })
    }

    /// Rebuild a purchase order from stored fields, trusting the store's
    /// invariants.
    pub fn from_parts(
        id: PurchaseOrderId,
        supplier_id: SupplierId,
        buyer: String,
        estimated_amount: Decimal,
        created_on: NaiveDate,
        expected_date: Option<NaiveDate>,
        status: PurchaseOrderStatus,
    ) -> Self {
        Self {
            id,
            supplier_id,
            buyer,
            estimated_amount,
            created_on,
            expected_date,
            status,
        }
    }

    pub fn id(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn buyer(&self) -> &str {
        &self.buyer
    }

    pub fn estimated_amount(&self) -> Decimal {
        self.estimated_amount
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_on
    }

    pub fn expected_date(&self) -> Option<NaiveDate> {
        self.expected_date
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    /// ISSUED → RECEIVED. Returns whether the transition applied.
    pub fn mark_received(&mut self) -> bool {
        if !self.status.can_transition(PurchaseOrderStatus::Received) {
            return false;
        }
        self.status = PurchaseOrderStatus::Received;
        true
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
