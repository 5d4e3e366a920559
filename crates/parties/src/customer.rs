//! Customer accounts: prepaid balance, credit level, cumulative spend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstall_core::{CreditLevelId, CustomerId, DomainError, DomainResult, Entity};

/// A customer account.
///
/// The balance is prepaid and never goes negative: settlement debits it only
/// under a balance guard. `total_spend` accumulates settled amounts and
/// drives credit-level promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    name: String,
    balance: Decimal,
    credit_level: CreditLevelId,
    total_spend: Decimal,
}

impl Customer {
    pub fn new(
        id: CustomerId,
        name: impl Into<String>,
        balance: Decimal,
        credit_level: CreditLevelId,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("customer name must not be blank"));
        }
        if balance < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "balance must not be negative: {balance}"
            )));
        }
        Ok(Self {
            id,
            name,
            balance,
            credit_level,
            total_spend: Decimal::ZERO,
        })
    }

    /// Reassemble a customer from stored fields.
    pub fn from_parts(
        id: CustomerId,
        name: impl Into<String>,
        balance: Decimal,
        credit_level: CreditLevelId,
        total_spend: Decimal,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            balance,
            credit_level,
            total_spend,
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn credit_level(&self) -> CreditLevelId {
        self.credit_level
    }

    pub fn total_spend(&self) -> Decimal {
        self.total_spend
    }

    /// Whether the balance covers a payable amount.
    pub fn can_cover(&self, payable: Decimal) -> bool {
        self.balance >= payable
    }

    /// Debit the balance if it covers the amount. Returns whether the debit
    /// applied; on `false` nothing changed.
    pub fn try_debit(&mut self, amount: Decimal) -> bool {
        if self.balance < amount {
            return false;
        }
        self.balance -= amount;
        true
    }

    /// Accumulate settled spend.
    pub fn add_spend(&mut self, amount: Decimal) {
        self.total_spend += amount;
    }

    /// Promote to a higher level. Promotions never go downward; returns
    /// whether the level changed.
    pub fn promote_to(&mut self, level: CreditLevelId) -> bool {
        if level <= self.credit_level {
            return false;
        }
        self.credit_level = level;
        true
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn test_customer(balance: &str) -> Customer {
        Customer::new(
            CustomerId::new(),
            "Ada Reader",
            dec(balance),
            CreditLevelId::new(1),
        )
        .unwrap()
    }

    #[test]
    fn debit_applies_only_under_cover() {
        let mut customer = test_customer("500.00");
        assert!(customer.try_debit(dec("170.00")));
        assert_eq!(customer.balance(), dec("330.00"));

        assert!(!customer.try_debit(dec("330.01")));
        assert_eq!(customer.balance(), dec("330.00"));
    }

    #[test]
    fn debit_may_drain_to_exactly_zero() {
        let mut customer = test_customer("170.00");
        assert!(customer.try_debit(dec("170.00")));
        assert_eq!(customer.balance(), dec("0.00"));
    }

    #[test]
    fn promotion_never_goes_downward() {
        let mut customer = test_customer("0.00");
        assert!(customer.promote_to(CreditLevelId::new(3)));
        assert!(!customer.promote_to(CreditLevelId::new(2)));
        assert!(!customer.promote_to(CreditLevelId::new(3)));
        assert_eq!(customer.credit_level(), CreditLevelId::new(3));
    }

    #[test]
    fn rejects_negative_opening_balance() {
        let result = Customer::new(
            CustomerId::new(),
            "Ada Reader",
            dec("-1.00"),
            CreditLevelId::new(1),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
