//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation, lifecycle
/// misuse, balance/stock shortfalls). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The entity's lifecycle state forbids the requested operation.
    #[error("invalid state for {entity} {id}: {detail}")]
    InvalidState {
        entity: &'static str,
        id: String,
        detail: String,
    },

    /// The customer balance cannot cover the payable amount.
    #[error("insufficient funds for customer {customer_id}: balance {balance}, payable {payable}")]
    InsufficientFunds {
        customer_id: String,
        balance: Decimal,
        payable: Decimal,
    },

    /// On-hand stock cannot cover the requested quantity.
    #[error("insufficient stock for book {book_id}: on hand {on_hand}, requested {requested}")]
    InsufficientStock {
        book_id: String,
        on_hand: i64,
        requested: i64,
    },

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(
        entity: &'static str,
        id: impl ToString,
        detail: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            detail: detail.into(),
        }
    }

    pub fn insufficient_funds(
        customer_id: impl ToString,
        balance: Decimal,
        payable: Decimal,
    ) -> Self {
        Self::InsufficientFunds {
            customer_id: customer_id.to_string(),
            balance,
            payable,
        }
    }

    pub fn insufficient_stock(book_id: impl ToString, on_hand: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            book_id: book_id.to_string(),
            on_hand,
            requested,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
