//! On-hand stock per book.

use serde::{Deserialize, Serialize};

use bookstall_core::{BookId, DomainError, DomainResult, Entity};

/// On-hand quantity for one book.
///
/// Quantity never goes negative: shipment removes stock only under a
/// sufficiency guard. `safety_stock` is the reorder floor; dipping below it
/// flags the book for replenishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    book_id: BookId,
    quantity: i64,
    safety_stock: i64,
}

impl StockLevel {
    pub fn new(book_id: BookId, quantity: i64, safety_stock: i64) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::validation(format!(
                "stock quantity must not be negative: {quantity}"
            )));
        }
        if safety_stock < 0 {
            return Err(DomainError::validation(format!(
                "safety stock must not be negative: {safety_stock}"
            )));
        }
        Ok(Self {
            book_id,
            quantity,
            safety_stock,
        })
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn safety_stock(&self) -> i64 {
        self.safety_stock
    }

    /// Remove stock if enough is on hand. Returns whether the removal
    /// applied; on `false` nothing changed.
    pub fn try_remove(&mut self, quantity: i64) -> bool {
        if quantity < 0 || self.quantity < quantity {
            return false;
        }
        self.quantity -= quantity;
        true
    }

    /// Add received stock.
    pub fn add(&mut self, quantity: i64) {
        self.quantity += quantity;
    }

    /// How far the on-hand quantity sits below the safety floor (zero when
    /// at or above it, or when no floor is set).
    pub fn safety_deficit(&self) -> i64 {
        if self.safety_stock > 0 && self.quantity < self.safety_stock {
            self.safety_stock - self.quantity
        } else {
            0
        }
    }
}

impl Entity for StockLevel {
    type Id = BookId;

    fn id(&self) -> &Self::Id {
        &self.book_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(quantity: i64, safety: i64) -> StockLevel {
        StockLevel::new(BookId::from("B1"), quantity, safety).unwrap()
    }

    #[test]
    fn removal_applies_only_while_sufficient() {
        let mut level = stock(5, 0);
        assert!(level.try_remove(5));
        assert_eq!(level.quantity(), 0);
        assert!(!level.try_remove(1));
        assert_eq!(level.quantity(), 0);
    }

    #[test]
    fn oversized_removal_leaves_quantity_untouched() {
        let mut level = stock(5, 0);
        assert!(!level.try_remove(6));
        assert_eq!(level.quantity(), 5);
    }

    #[test]
    fn deficit_counts_shortfall_below_the_floor() {
        assert_eq!(stock(3, 10).safety_deficit(), 7);
        assert_eq!(stock(10, 10).safety_deficit(), 0);
        assert_eq!(stock(0, 0).safety_deficit(), 0);
    }

    #[test]
    fn rejects_negative_quantities() {
        assert!(StockLevel::new(BookId::from("B1"), -1, 0).is_err());
        assert!(StockLevel::new(BookId::from("B1"), 0, -1).is_err());
    }
}
