//! Money value object.
//!
//! Amounts are exact decimals rounded to two places. "Changed" decisions
//! compare against a fixed epsilon of one hundredth of a unit.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use super::Percentage;

/// Smallest difference between two amounts that counts as a change (0.01).
pub const AMOUNT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// A monetary amount in the organization's single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero units.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates an amount, rounded half away from zero to two decimals.
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Creates an amount from whole units.
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Returns the inner decimal.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns zero for negative amounts.
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    /// Returns `percentage` of this amount.
    pub fn percentage(&self, percentage: Percentage) -> Self {
        Self::new(self.0 * percentage.value() / Decimal::ONE_HUNDRED)
    }

    /// Returns the smaller of two amounts.
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Returns the absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// True when the two amounts differ by at least [`AMOUNT_EPSILON`].
    pub fn differs_from(&self, other: &Money) -> bool {
        (self.0 - other.0).abs() >= AMOUNT_EPSILON
    }

    /// Share of `whole` this amount represents, as a 0-100 decimal.
    ///
    /// Returns zero when `whole` is zero.
    pub fn ratio_percent_of(&self, whole: &Money) -> Decimal {
        if whole.is_zero() {
            return Decimal::ZERO;
        }
        (self.0 * Decimal::ONE_HUNDRED / whole.0)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rounds_to_two_decimals() {
        let m = Money::new(Decimal::new(12345, 3)); // 12.345
        assert_eq!(m.amount(), Decimal::new(1235, 2));
    }

    #[test]
    fn percentage_of_amount() {
        let base = Money::from_units(10000);
        let pct = Percentage::try_new(Decimal::from(20)).unwrap();
        assert_eq!(base.percentage(pct), Money::from_units(2000));
    }

    #[test]
    fn clamp_non_negative_floors_at_zero() {
        assert_eq!(Money::from_units(-5).clamp_non_negative(), Money::ZERO);
        assert_eq!(Money::from_units(5).clamp_non_negative(), Money::from_units(5));
    }

    #[test]
    fn differs_from_uses_cent_epsilon() {
        let a = Money::new(Decimal::new(10000, 2));
        let b = Money::new(Decimal::new(10001, 2));
        let c = Decimal::new(100005, 3); // 100.005 -> rounds to 100.01
        assert!(a.differs_from(&b));
        assert!(!a.differs_from(&a));
        assert!(!b.differs_from(&Money::new(c)));
    }

    #[test]
    fn sums_amounts() {
        let items = vec![Money::from_units(1), Money::from_units(2), Money::from_units(-1)];
        let total: Money = items.iter().sum();
        assert_eq!(total, Money::from_units(2));
    }

    #[test]
    fn ratio_percent_of_zero_whole_is_zero() {
        assert_eq!(Money::from_units(5).ratio_percent_of(&Money::ZERO), Decimal::ZERO);
        assert_eq!(
            Money::from_units(25).ratio_percent_of(&Money::from_units(100)),
            Decimal::from(25)
        );
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Money::from_units(45).to_string(), "45.00");
    }
}
