//! Book catalog entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstall_core::{BookId, DomainError, DomainResult, Entity, round_half_up};

/// A book this store sells.
///
/// Catalog administration happens elsewhere; the engines here only verify
/// existence and read the list price when pricing order lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    title: String,
    list_price: Decimal,
}

impl Book {
    pub fn new(id: BookId, title: impl Into<String>, list_price: Decimal) -> DomainResult<Self> {
        if id.as_str().trim().is_empty() {
            return Err(DomainError::validation("book code must not be blank"));
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("book title must not be blank"));
        }
        if list_price < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "list price must not be negative: {list_price}"
            )));
        }
        Ok(Self {
            id,
            title,
            list_price: round_half_up(list_price),
        })
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn list_price(&self) -> Decimal {
        self.list_price
    }
}

impl Entity for Book {
    type Id = BookId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
