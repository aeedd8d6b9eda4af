//! # Money Module
//!
//! Provides the `Money` type for every amount the till touches.
//!
//! ## Integer Amounts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The restaurant bills in guaraníes (PYG), which has no minor unit.      │
//! │                                                                         │
//! │    Money(50_000)  ==  Gs. 50.000                                        │
//! │                                                                         │
//! │  The value is always the SMALLEST unit of the configured currency, so   │
//! │  a deployment in a currency with cents would store cents instead.       │
//! │  No floating point ever touches a balance.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use poli_core::money::Money;
//!
//! let balance = Money::new(50_000);
//! let after = balance - Money::new(20_000);
//! assert_eq!(after.amount(), 30_000);
//! assert_eq!(after.to_string(), "Gs. 30.000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: differences at close can be negative
/// - **Transparent**: serializes as a plain JSON number and is stored as a
///   plain SQLite INTEGER
///
/// ## Where Money Flows
/// ```text
/// Product.price ──► SaleItem.price × qty ──► SaleItem.subtotal
///                                              │
///            Sale.total ◄───── Σ subtotals ────┘
///               │
///               ▼
/// CashRegister.current_balance ◄── ± CashMovement.amount
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from an amount in the smallest currency unit.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the raw amount in the smallest currency unit.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a line quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use poli_core::money::Money;
    ///
    /// let unit_price = Money::new(45_000);
    /// assert_eq!(unit_price.checked_multiply_quantity(3), Some(Money::new(135_000)));
    /// assert_eq!(Money::new(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(amount) => Some(Money(amount)),
            None => None,
        }
    }

    /// Adds `other`, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(amount) => Some(Money(amount)),
            None => None,
        }
    }

    /// Subtracts `other`, `None` on overflow. The result may be negative.
    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(amount) => Some(Money(amount)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` when the result would go below
    /// zero. Used for balance withdrawals.
    ///
    /// ## Example
    /// ```rust
    /// use poli_core::money::Money;
    ///
    /// let balance = Money::new(30_000);
    /// assert_eq!(balance.checked_withdraw(Money::new(20_000)), Some(Money::new(10_000)));
    /// assert_eq!(balance.checked_withdraw(Money::new(40_000)), None);
    /// ```
    pub fn checked_withdraw(&self, other: Money) -> Option<Money> {
        let rest = self.0.checked_sub(other.0)?;
        (rest >= 0).then_some(Money(rest))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display uses the Paraguayan convention: `Gs. 1.234.567`.
///
/// ## Note
/// For logs and error messages. Receipts format amounts on their own.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Gs. {}", sign, grouped)
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

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "Gs. 0");
        assert_eq!(Money::new(999).to_string(), "Gs. 999");
        assert_eq!(Money::new(50_000).to_string(), "Gs. 50.000");
        assert_eq!(Money::new(1_234_567).to_string(), "Gs. 1.234.567");
        assert_eq!(Money::new(-20_000).to_string(), "-Gs. 20.000");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::new(50_000);
        let b = Money::new(20_000);

        assert_eq!((a + b).amount(), 70_000);
        assert_eq!((a - b).amount(), 30_000);

        let mut c = a;
        c -= b;
        c += Money::new(15_000);
        assert_eq!(c.amount(), 45_000);
    }

    #[test]
    fn test_checked_withdraw_never_goes_negative() {
        let balance = Money::new(30_000);
        assert_eq!(balance.checked_withdraw(Money::new(30_000)), Some(Money::zero()));
        assert_eq!(balance.checked_withdraw(Money::new(30_001)), None);
        assert_eq!(Money::new(i64::MIN).checked_withdraw(Money::new(1)), None);
    }

    #[test]
    fn test_checked_operations_report_overflow() {
        assert_eq!(Money::new(45_000).checked_multiply_quantity(2), Some(Money::new(90_000)));
        assert_eq!(Money::new(i64::MAX / 2 + 1).checked_multiply_quantity(2), None);
        assert_eq!(Money::new(1).checked_add(Money::new(i64::MAX)), None);
        assert_eq!(Money::new(10).checked_sub(Money::new(30)), Some(Money::new(-20)));
        assert_eq!(Money::new(i64::MIN).checked_sub(Money::new(1)), None);
    }

    #[test]
    fn test_sum() {
        let lines = [Money::new(10_000), Money::new(25_000), Money::new(5_000)];
        let total: Money = lines.iter().sum();
        assert_eq!(total, Money::new(40_000));
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::new(50_000)).unwrap();
        assert_eq!(json, "50000");
        let back: Money = serde_json::from_str("20000").unwrap();
        assert_eq!(back, Money::new(20_000));
    }
}
