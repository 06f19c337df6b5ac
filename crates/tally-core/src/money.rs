//! # Money Module
//!
//! Provides the `Money` type for prices, unit costs, cash and report totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A moving-average unit cost recomputed on every restock drifts when    │
//! │  kept in floats, and two terminals disagree on the last digit.         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + one explicit rounding rule        │
//! │    (1000×300 + 150000) / 1500 = 300        exact                       │
//! │    (7×10 + 5) / 10 = 7.5 → 8               round half up               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_minor(18_000);
//! let line = price.checked_mul_quantity(2);
//! assert_eq!(line, Some(Money::from_minor(36_000)));
//!
//! // Weighted average with round-half-up
//! let avg = Money::from_ratio_half_up(75, 10);
//! assert_eq!(avg.minor(), 8);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Monetary value in the smallest unit of the store currency.
///
/// ## Design Decisions
/// - **i64 (signed)**: shift variances and negative-stock valuations can be
///   below zero
/// - **Currency agnostic**: one minor unit may be a cent or a whole rupiah;
///   display formatting belongs to the receipt/report consumers
/// - **Transparent in SQLite**: stored as a plain INTEGER column
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_cost = Money::from_minor(300); // per gram
    /// assert_eq!(unit_cost.checked_mul_quantity(15), Some(Money::from_minor(4_500)));
    /// assert_eq!(unit_cost.checked_mul_quantity(i64::MAX), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Divides `numerator / denominator` and rounds half up (toward +∞).
    ///
    /// ## Rounding Rule
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  ROUND HALF UP                                                      │
    /// │                                                                     │
    /// │   7.5 →  8      7.4 →  7      -7.5 → -7      -7.6 → -8             │
    /// │                                                                     │
    /// │  floor((2n + d) / 2d) for d > 0, evaluated in i128 so the          │
    /// │  stock × unit_cost product cannot overflow.                        │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// A non-positive denominator is normalised by flipping both signs.
    /// Callers guarantee `denominator != 0`.
    pub fn from_ratio_half_up(numerator: i128, denominator: i128) -> Money {
        let (n, d) = if denominator < 0 {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        let rounded = (2 * n + d).div_euclid(2 * d);
        Money(rounded as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain minor-unit rendering for logs; consumers format for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(18_000);
        assert_eq!(money.minor(), 18_000);
        assert_eq!(money.to_string(), "18000");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((b - a).minor(), -500);
        assert_eq!((a * 3).minor(), 3000);
        assert_eq!((-a).minor(), -1000);

        let mut c = a;
        c += b;
        c -= Money::from_minor(200);
        assert_eq!(c.minor(), 1300);
    }

    #[test]
    fn test_sum() {
        let values = vec![Money::from_minor(1), Money::from_minor(2), Money::from_minor(3)];
        let total: Money = values.iter().sum();
        assert_eq!(total.minor(), 6);

        let empty: Vec<Money> = Vec::new();
        assert_eq!(empty.into_iter().sum::<Money>(), Money::zero());
    }

    #[test]
    fn test_ratio_exact() {
        assert_eq!(Money::from_ratio_half_up(450_000, 1_500).minor(), 300);
    }

    #[test]
    fn test_ratio_rounds_half_up() {
        assert_eq!(Money::from_ratio_half_up(75, 10).minor(), 8);
        assert_eq!(Money::from_ratio_half_up(74, 10).minor(), 7);
        assert_eq!(Money::from_ratio_half_up(76, 10).minor(), 8);
        assert_eq!(Money::from_ratio_half_up(5, 2).minor(), 3);
    }

    #[test]
    fn test_ratio_negative_numerator_rounds_toward_positive_infinity() {
        assert_eq!(Money::from_ratio_half_up(-75, 10).minor(), -7);
        assert_eq!(Money::from_ratio_half_up(-76, 10).minor(), -8);
    }

    #[test]
    fn test_ratio_negative_denominator_is_normalised() {
        assert_eq!(Money::from_ratio_half_up(75, -10).minor(), -7);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_minor(100).is_positive());
        assert!(Money::from_minor(-100).is_negative());
    }

    #[test]
    fn test_checked_arithmetic() {
        let unit_cost = Money::from_minor(20);
        assert_eq!(unit_cost.checked_mul_quantity(100), Some(Money::from_minor(2_000)));
        assert_eq!(Money::from_minor(i64::MAX / 2).checked_mul_quantity(3), None);

        assert_eq!(
            unit_cost.checked_add(Money::from_minor(5)),
            Some(Money::from_minor(25))
        );
        assert_eq!(Money::from_minor(i64::MAX).checked_add(unit_cost), None);
    }
}
