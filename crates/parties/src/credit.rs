//! Credit levels: the discount and upgrade ladder customers climb.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstall_core::{CreditLevelId, DomainError, DomainResult, Entity};

/// A rung on the customer credit ladder.
///
/// Reference data. A level fixes the discount rate applied when orders are
/// built and the cumulative-spend threshold at which customers reach it.
/// Discount rates lie in (0, 1]; a rate of 1 means list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLevel {
    id: CreditLevelId,
    name: String,
    discount_rate: Decimal,
    min_total_spend: Decimal,
}

impl CreditLevel {
    pub fn new(
        id: CreditLevelId,
        name: impl Into<String>,
        discount_rate: Decimal,
        min_total_spend: Decimal,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("credit level name must not be blank"));
        }
        if discount_rate <= Decimal::ZERO || discount_rate > Decimal::ONE {
            return Err(DomainError::validation(format!(
                "discount rate must lie in (0, 1]: {discount_rate}"
            )));
        }
        if min_total_spend < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "spend threshold must not be negative: {min_total_spend}"
            )));
        }
        Ok(Self {
            id,
            name,
            discount_rate,
            min_total_spend,
        })
    }

    pub fn id(&self) -> CreditLevelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discount_rate(&self) -> Decimal {
        self.discount_rate
    }

    pub fn min_total_spend(&self) -> Decimal {
        self.min_total_spend
    }

    /// Whether a cumulative spend qualifies for this level.
    pub fn covers(&self, total_spend: Decimal) -> bool {
        total_spend >= self.min_total_spend
    }
}

impl Entity for CreditLevel {
    type Id = CreditLevelId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Pick the highest level a cumulative spend qualifies for.
///
/// Returns `None` when no level's threshold is met (the caller then leaves
/// the customer where they are).
pub fn best_level_for(levels: &[CreditLevel], total_spend: Decimal) -> Option<&CreditLevel> {
    levels
        .iter()
        .filter(|level| level.covers(total_spend))
        .max_by_key(|level| level.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ladder() -> Vec<CreditLevel> {
        vec![
            CreditLevel::new(CreditLevelId::new(1), "Basic", dec("1.00"), dec("0")).unwrap(),
            CreditLevel::new(CreditLevelId::new(2), "Silver", dec("0.95"), dec("500")).unwrap(),
            CreditLevel::new(CreditLevelId::new(3), "Gold", dec("0.85"), dec("2000")).unwrap(),
        ]
    }

    #[test]
    fn rejects_discount_rate_outside_unit_interval() {
        let zero = CreditLevel::new(CreditLevelId::new(1), "x", dec("0"), dec("0"));
        let above = CreditLevel::new(CreditLevelId::new(1), "x", dec("1.01"), dec("0"));
        assert!(matches!(zero, Err(DomainError::Validation(_))));
        assert!(matches!(above, Err(DomainError::Validation(_))));
    }

    #[test]
    fn list_price_rate_is_allowed() {
        assert!(CreditLevel::new(CreditLevelId::new(1), "x", dec("1"), dec("0")).is_ok());
    }

    #[test]
    fn best_level_picks_highest_qualifying_rung() {
        let levels = ladder();
        assert_eq!(best_level_for(&levels, dec("0")).unwrap().id().value(), 1);
        assert_eq!(best_level_for(&levels, dec("499.99")).unwrap().id().value(), 1);
        assert_eq!(best_level_for(&levels, dec("500")).unwrap().id().value(), 2);
        assert_eq!(best_level_for(&levels, dec("9999")).unwrap().id().value(), 3);
    }

    #[test]
    fn best_level_is_none_when_nothing_qualifies() {
        let levels = vec![
            CreditLevel::new(CreditLevelId::new(2), "Silver", dec("0.95"), dec("500")).unwrap(),
        ];
        assert!(best_level_for(&levels, dec("100")).is_none());
    }
}
