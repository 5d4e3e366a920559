//! Line pricing: list price, per-customer discount, half-up cents.

use rust_decimal::Decimal;

use bookstall_core::{DomainError, DomainResult, round_half_up};

/// The priced side of one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePrice {
    pub unit_price: Decimal,
    pub sub_amount: Decimal,
}

impl bookstall_core::ValueObject for LinePrice {}

/// Price one order line.
///
/// The unit price is the list price times the discount rate, rounded to
/// cents half-up; the subtotal multiplies the rounded unit price by the
/// quantity and is never re-rounded. Rounding therefore happens exactly
/// once per line.
pub fn price_line(
    list_price: Decimal,
    discount_rate: Decimal,
    quantity: i64,
) -> DomainResult<LinePrice> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "quantity must be positive: {quantity}"
        )));
    }
    if list_price < Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "list price must not be negative: {list_price}"
        )));
    }
    if discount_rate <= Decimal::ZERO || discount_rate > Decimal::ONE {
        return Err(DomainError::validation(format!(
            "discount rate must lie in (0, 1]: {discount_rate}"
        )));
    }
    let unit_price = round_half_up(list_price * discount_rate);
    let sub_amount = unit_price * Decimal::from(quantity);
    Ok(LinePrice {
        unit_price,
        sub_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn prices_the_catalog_example() {
        let line = price_line(dec("100.00"), dec("0.85"), 1).unwrap();
        assert_eq!(line.unit_price, dec("85.00"));
        assert_eq!(line.sub_amount, dec("85.00"));

        let line = price_line(dec("50.00"), dec("0.85"), 2).unwrap();
        assert_eq!(line.unit_price, dec("42.50"));
        assert_eq!(line.sub_amount, dec("85.00"));
    }

    #[test]
    fn rounds_the_unit_price_half_up() {
        // 9.99 * 0.85 = 8.4915 -> 8.49
        assert_eq!(price_line(dec("9.99"), dec("0.85"), 1).unwrap().unit_price, dec("8.49"));
        // 0.25 * 0.5 = 0.125 -> 0.13 at the midpoint
        assert_eq!(price_line(dec("0.25"), dec("0.5"), 1).unwrap().unit_price, dec("0.13"));
    }

    #[test]
    fn subtotal_multiplies_the_rounded_unit_price() {
        // Rounding once per line: 3 * round(8.4915) = 25.47, not round(25.4745).
        let line = price_line(dec("9.99"), dec("0.85"), 3).unwrap();
        assert_eq!(line.sub_amount, dec("25.47"));
    }

    #[test]
    fn rejects_malformed_inputs() {
        assert!(price_line(dec("10.00"), dec("0.85"), 0).is_err());
        assert!(price_line(dec("10.00"), dec("0.85"), -1).is_err());
        assert!(price_line(dec("-0.01"), dec("0.85"), 1).is_err());
        assert!(price_line(dec("10.00"), dec("0"), 1).is_err());
        assert!(price_line(dec("10.00"), dec("1.01"), 1).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Unit prices carry at most two fractional digits and subtotals are
        /// exact multiples of them.
        #[test]
        fn unit_price_is_cent_scaled(
            cents in 0i64..1_000_000,
            rate_bp in 1i64..=10_000,
            quantity in 1i64..1_000,
        ) {
            let list_price = Decimal::new(cents, 2);
            let rate = Decimal::new(rate_bp, 4);
            let line = price_line(list_price, rate, quantity).unwrap();

            prop_assert!(line.unit_price.scale() <= 2);
            prop_assert_eq!(line.sub_amount, line.unit_price * Decimal::from(quantity));
            prop_assert!(line.unit_price >= Decimal::ZERO);
        }

        /// A discount never prices a line above list, and a full rate prices
        /// it at list exactly.
        #[test]
        fn discount_never_exceeds_list(
            cents in 0i64..1_000_000,
            rate_bp in 1i64..=10_000,
        ) {
            let list_price = Decimal::new(cents, 2);
            let rate = Decimal::new(rate_bp, 4);
            let line = price_line(list_price, rate, 1).unwrap();

            prop_assert!(line.unit_price <= list_price);
            if rate_bp == 10_000 {
                prop_assert_eq!(line.unit_price, list_price);
            }
        }
    }
}
