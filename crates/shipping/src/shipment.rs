//! Shipment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookstall_core::{
    BookId, DomainError, DomainResult, Entity, OrderId, OrderItemId, ShipmentId, ShipmentItemId,
};

/// One physical dispatch of an order.
///
/// An order may carry several shipments over its life; each records who
/// carried it, under what tracking number, and which operator cut it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    id: ShipmentId,
    order_id: OrderId,
    carrier: String,
    tracking_number: String,
    operator: String,
    shipped_at: DateTime<Utc>,
}

impl Shipment {
    pub fn new(
        id: ShipmentId,
        order_id: OrderId,
        carrier: impl Into<String>,
        tracking_number: impl Into<String>,
        operator: impl Into<String>,
        shipped_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let carrier = carrier.into();
        let tracking_number = tracking_number.into();
        let operator = operator.into();
        if carrier.trim().is_empty() {
            return Err(DomainError::validation("carrier must not be blank"));
        }
        if tracking_number.trim().is_empty() {
            return Err(DomainError::validation("tracking number must not be blank"));
        }
        if operator.trim().is_empty() {
            return Err(DomainError::validation("operator must not be blank"));
        }
        Ok(Self {
            id,
            order_id,
            carrier,
            tracking_number,
            operator,
            shipped_at,
        })
    }

    pub fn id(&self) -> ShipmentId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    pub fn tracking_number(&self) -> &str {
        &self.tracking_number
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn shipped_at(&self) -> DateTime<Utc> {
        self.shipped_at
    }
}

impl Entity for Shipment {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// The slice of one order line a shipment carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    id: ShipmentItemId,
    shipment_id: ShipmentId,
    order_item_id: OrderItemId,
    book_id: BookId,
    quantity: i64,
}

impl ShipmentItem {
    pub fn new(
        id: ShipmentItemId,
        shipment_id: ShipmentId,
        order_item_id: OrderItemId,
        book_id: BookId,
        quantity: i64,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "shipped quantity must be positive: {quantity}"
            )));
        }
        Ok(Self {
            id,
            shipment_id,
            order_item_id,
            book_id,
            quantity,
        })
    }

    pub fn id(&self) -> ShipmentItemId {
        self.id
    }

    pub fn shipment_id(&self) -> ShipmentId {
        self.shipment_id
    }

    pub fn order_item_id(&self) -> OrderItemId {
        self.order_item_id
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }
}

impl Entity for ShipmentItem {
    type Id = ShipmentItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_manifest_fields() {
        let order_id = OrderId::new();
        for (carrier, tracking, operator) in
            [(" ", "T1", "ops"), ("UPS", "", "ops"), ("UPS", "T1", "\t")]
        {
            let result = Shipment::new(
                ShipmentId::new(),
                order_id,
                carrier,
                tracking,
                operator,
                Utc::now(),
            );
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let result = ShipmentItem::new(
            ShipmentItemId::new(),
            ShipmentId::new(),
            OrderItemId::new(),
            BookId::from("B1"),
            0,
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
