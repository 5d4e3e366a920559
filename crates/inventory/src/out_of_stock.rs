//! Out-of-stock records: demand the shelf could not meet.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookstall_core::{BookId, DomainError, DomainResult, Entity, OutOfStockId};

/// Where a shortage report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutOfStockSource {
    Manual,
    CustomerRequest,
    LowStock,
}

impl OutOfStockSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::CustomerRequest => "CUSTOMER_REQUEST",
            Self::LowStock => "LOW_STOCK",
        }
    }
}

impl core::fmt::Display for OutOfStockSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutOfStockSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(Self::Manual),
            "CUSTOMER_REQUEST" => Ok(Self::CustomerRequest),
            "LOW_STOCK" => Ok(Self::LowStock),
            other => Err(DomainError::validation(format!(
                "unknown out-of-stock source: {other}"
            ))),
        }
    }
}

/// Replenishment urgency. Merging two reports keeps the higher urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Numeric rank, lowest urgency first. This is what goes to storage so
    /// comparisons there order the same way they do here.
    pub fn rank(self) -> i16 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    pub fn from_rank(rank: i16) -> DomainResult<Self> {
        match rank {
            0 => Ok(Self::Low),
            1 => Ok(Self::Normal),
            2 => Ok(Self::High),
            3 => Ok(Self::Urgent),
            other => Err(DomainError::validation(format!(
                "unknown priority rank: {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-stock lifecycle. Forward edges only; PURCHASING is a convenience
/// flag that receipt may skip when the flip after purchase-order creation
/// never landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutOfStockStatus {
    Pending,
    Purchasing,
    Resolved,
}

impl OutOfStockStatus {
    pub fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Purchasing)
                | (Self::Pending, Self::Resolved)
                | (Self::Purchasing, Self::Resolved)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Purchasing => "PURCHASING",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl core::fmt::Display for OutOfStockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutOfStockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PURCHASING" => Ok(Self::Purchasing),
            "RESOLVED" => Ok(Self::Resolved),
            other => Err(DomainError::validation(format!(
                "unknown out-of-stock status: {other}"
            ))),
        }
    }
}

/// A shortage awaiting replenishment.
///
/// At most one PENDING record exists per book: registering a book that
/// already has one merges into it instead of inserting a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStockRecord {
    id: OutOfStockId,
    book_id: BookId,
    required_quantity: i64,
    source: OutOfStockSource,
    priority: Priority,
    status: OutOfStockStatus,
    registered_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl OutOfStockRecord {
    pub fn new(
        id: OutOfStockId,
        book_id: BookId,
        required_quantity: i64,
        source: OutOfStockSource,
        priority: Priority,
        registered_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if required_quantity <= 0 {
            return Err(DomainError::validation(format!(
                "required quantity must be positive: {required_quantity}"
            )));
        }
        Ok(Self {
            id,
            book_id,
            required_quantity,
            source,
            priority,
            status: OutOfStockStatus::Pending,
            registered_at,
            resolved_at: None,
        })
    }

    /// Rebuild a record from stored fields, trusting the store's invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OutOfStockId,
        book_id: BookId,
        required_quantity: i64,
        source: OutOfStockSource,
        priority: Priority,
        status: OutOfStockStatus,
        registered_at: DateTime<Utc>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            book_id,
            required_quantity,
            source,
            priority,
            status,
            registered_at,
            resolved_at,
        }
    }

    pub fn id(&self) -> OutOfStockId {
        self.id
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn required_quantity(&self) -> i64 {
        self.required_quantity
    }

    pub fn source(&self) -> OutOfStockSource {
        self.source
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> OutOfStockStatus {
        self.status
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Fold a fresh shortage report into this record: quantities add up, the
    /// report's source and date win, the higher urgency sticks. Only PENDING
    /// records accept merges.
    pub fn merge_demand(
        &mut self,
        required_quantity: i64,
        source: OutOfStockSource,
        priority: Priority,
        reported_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != OutOfStockStatus::Pending {
            return Err(DomainError::invalid_state(
                "out-of-stock record",
                self.id,
                format!("cannot merge demand while {}", self.status),
            ));
        }
        if required_quantity <= 0 {
            return Err(DomainError::validation(format!(
                "required quantity must be positive: {required_quantity}"
            )));
        }
        self.required_quantity += required_quantity;
        self.source = source;
        self.priority = self.priority.max(priority);
        self.registered_at = reported_at;
        Ok(())
    }

    /// PENDING → PURCHASING. Returns whether the transition applied.
    pub fn begin_purchasing(&mut self) -> bool {
        if !self.status.can_transition(OutOfStockStatus::Purchasing) {
            return false;
        }
        self.status = OutOfStockStatus::Purchasing;
        true
    }

    /// PENDING or PURCHASING → RESOLVED, stamping the resolution time.
    /// Returns whether the transition applied.
    pub fn resolve(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition(OutOfStockStatus::Resolved) {
            return false;
        }
        self.status = OutOfStockStatus::Resolved;
        self.resolved_at = Some(at);
        true
    }
}

impl Entity for OutOfStockRecord {
    type Id = OutOfStockId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(quantity: i64, priority: Priority) -> OutOfStockRecord {
        OutOfStockRecord::new(
            OutOfStockId::new(),
            BookId::from("B1"),
            quantity,
            OutOfStockSource::Manual,
            priority,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn starts_pending_without_resolution_stamp() {
        let rec = record(3, Priority::Normal);
        assert_eq!(rec.status(), OutOfStockStatus::Pending);
        assert!(rec.resolved_at().is_none());
    }

    #[test]
    fn merge_sums_quantity_and_keeps_higher_urgency() {
        let mut rec = record(3, Priority::High);
        rec.merge_demand(4, OutOfStockSource::LowStock, Priority::Normal, Utc::now())
            .unwrap();
        assert_eq!(rec.required_quantity(), 7);
        assert_eq!(rec.priority(), Priority::High);
        assert_eq!(rec.source(), OutOfStockSource::LowStock);
    }

    #[test]
    fn merge_is_rejected_once_purchasing() {
        let mut rec = record(3, Priority::Normal);
        assert!(rec.begin_purchasing());
        let err = rec
            .merge_demand(1, OutOfStockSource::Manual, Priority::Low, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[test]
    fn resolution_stamps_time_and_is_terminal() {
        let mut rec = record(3, Priority::Normal);
        let at = Utc::now();
        assert!(rec.resolve(at));
        assert_eq!(rec.resolved_at(), Some(at));
        assert!(!rec.resolve(Utc::now()));
        assert!(!rec.begin_purchasing());
    }

    #[test]
    fn receipt_may_resolve_a_record_still_pending() {
        let mut rec = record(3, Priority::Normal);
        assert!(rec.resolve(Utc::now()));
        assert_eq!(rec.status(), OutOfStockStatus::Resolved);
    }

    #[test]
    fn no_backward_edges() {
        use OutOfStockStatus::*;
        assert!(!Purchasing.can_transition(Pending));
        assert!(!Resolved.can_transition(Purchasing));
        assert!(!Resolved.can_transition(Pending));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Merging any sequence of reports sums their quantities and never
        /// drops below the highest urgency seen.
        #[test]
        fn merge_accumulates_demand(reports in proptest::collection::vec((1i64..1000, 0i16..4), 1..20)) {
            let mut rec = record(5, Priority::Low);
            let mut expected_qty = 5;
            let mut expected_priority = Priority::Low;

            for (qty, rank) in reports {
                let priority = Priority::from_rank(rank).unwrap();
                rec.merge_demand(qty, OutOfStockSource::CustomerRequest, priority, Utc::now())
                    .unwrap();
                expected_qty += qty;
                expected_priority = expected_priority.max(priority);
            }

            prop_assert_eq!(rec.required_quantity(), expected_qty);
            prop_assert_eq!(rec.priority(), expected_priority);
        }
    }
}
