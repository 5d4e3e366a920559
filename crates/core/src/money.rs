//! Money arithmetic at a fixed scale of two fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits carried by money values at rest.
pub const MONEY_SCALE: u32 = 2;

/// Round a money amount to cents, halves away from zero.
///
/// `0.125` rounds to `0.13`, `0.124` to `0.12`. This is the rounding applied
/// once per order line when the discount rate is multiplied in; downstream
/// sums never re-round.
pub fn round_half_up(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
