//! # Money
//!
//! Amounts are integer minor units (cents). Arithmetic is checked; an
//! overflow or a negative result is an error rather than a wrapped value.
//! Tax is a flat rate expressed in basis points (1 bps = 0.01%).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Basis points in 100%.
pub const BPS_DENOMINATOR: i64 = 10_000;

/// A non-negative amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(0);

    /// Construct from cents.
    ///
    /// # Errors
    ///
    /// Rejects negative amounts.
    pub fn from_cents(cents: i64) -> Result<Self, CoreError> {
        if cents < 0 {
            return Err(CoreError::MoneyOutOfRange(format!("negative amount {cents}")));
        }
        Ok(Self(cents))
    }

    /// Amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Money) -> Result<Money, CoreError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| CoreError::MoneyOutOfRange(format!("{} + {}", self.0, other.0)))
    }

    /// Subtraction floored at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Checked multiplication by a quantity.
    pub fn checked_mul(self, quantity: u32) -> Result<Money, CoreError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Money)
            .ok_or_else(|| CoreError::MoneyOutOfRange(format!("{} x {quantity}", self.0)))
    }

    /// Flat-rate share of this amount, rounded half-up to the nearest cent.
    pub fn apply_rate_bps(self, rate_bps: u32) -> Result<Money, CoreError> {
        // Widened so the rounding offset cannot overflow; only the result must fit.
        let scaled = i128::from(self.0) * i128::from(rate_bps);
        let denominator = i128::from(BPS_DENOMINATOR);
        i64::try_from((scaled + denominator / 2) / denominator)
            .map(Money)
            .map_err(|_| CoreError::MoneyOutOfRange(format!("{} x {rate_bps}bps", self.0)))
    }

    /// Addition clamped at the largest representable amount.
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Sum an iterator of amounts with overflow checking.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Result<Money, CoreError> {
        iter.into_iter().try_fold(Money::ZERO, Money::checked_add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_rejected() {
        assert!(Money::from_cents(-1).is_err());
        assert_eq!(Money::from_cents(0).unwrap(), Money::ZERO);
    }

    #[test]
    fn display_as_decimal() {
        assert_eq!(Money::from_cents(10_000).unwrap().to_string(), "100.00");
        assert_eq!(Money::from_cents(1_205).unwrap().to_string(), "12.05");
    }

    #[test]
    fn tax_rounds_half_up() {
        // 8.25% of 10.10 = 0.83325 -> 0.83
        let m = Money::from_cents(1_010).unwrap();
        assert_eq!(m.apply_rate_bps(825).unwrap().cents(), 83);
        // 5% of 0.10 = 0.005 -> 0.01
        let m = Money::from_cents(10).unwrap();
        assert_eq!(m.apply_rate_bps(500).unwrap().cents(), 1);
    }

    #[test]
    fn overflow_is_an_error() {
        let big = Money::from_cents(i64::MAX).unwrap();
        assert!(big.checked_add(Money::from_cents(1).unwrap()).is_err());
        assert!(big.checked_mul(2).is_err());
    }

    #[test]
    fn tax_on_largest_amount_does_not_wrap() {
        let max = Money::from_cents(i64::MAX).unwrap();
        // 0.01% of i64::MAX cents still fits once rounded.
        let tax = max.apply_rate_bps(1).unwrap();
        assert_eq!(i128::from(tax.cents()), (i128::from(i64::MAX) + 5_000) / 10_000);
        assert!(max.apply_rate_bps(10_000).is_ok());
        assert!(max.apply_rate_bps(10_001).is_err());
    }

    #[test]
    fn saturating_add_clamps() {
        let max = Money::from_cents(i64::MAX).unwrap();
        assert_eq!(max.saturating_add(Money::from_cents(1).unwrap()), max);
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let a = Money::from_cents(5).unwrap();
        let b = Money::from_cents(9).unwrap();
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a).cents(), 4);
    }

    proptest! {
        #[test]
        fn tax_never_exceeds_amount_at_or_below_full_rate(cents in 0i64..1_000_000_000, bps in 0u32..=10_000) {
            let m = Money::from_cents(cents).unwrap();
            let tax = m.apply_rate_bps(bps).unwrap();
            prop_assert!(tax <= m);
        }

        #[test]
        fn checked_sum_matches_plain_sum(parts in proptest::collection::vec(0i64..1_000_000, 0..20)) {
            let total = Money::checked_sum(parts.iter().map(|c| Money::from_cents(*c).unwrap())).unwrap();
            prop_assert_eq!(total.cents(), parts.iter().sum::<i64>());
        }
    }
}
