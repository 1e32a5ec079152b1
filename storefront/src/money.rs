//! Money and discount rates.
//!
//! All amounts are whole won and all arithmetic is integer arithmetic, so a
//! projection computed twice from the same state is bit-identical.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Amount in whole won
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero won
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole won
    #[must_use]
    pub const fn new(won: i64) -> Self {
        Self(won)
    }

    /// Returns the amount in whole won
    #[must_use]
    pub const fn won(self) -> i64 {
        self.0
    }

    /// Price of `quantity` units at this unit price
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0 * quantity as i64)
    }

    /// The share of this amount at `rate`, rounded half up to the won
    ///
    /// ```
    /// use storefront::money::{Money, Rate};
    ///
    /// assert_eq!(Money::new(25_000).portion(Rate::from_percent(80)), Money::new(20_000));
    /// assert_eq!(Money::new(15).portion(Rate::from_percent(10)), Money::new(2));
    /// ```
    #[must_use]
    pub const fn portion(self, rate: Rate) -> Self {
        let scaled = self.0 * rate.basis_points() as i64;
        Self((scaled + Rate::SCALE as i64 / 2).div_euclid(Rate::SCALE as i64))
    }

    /// This amount reduced by `rate`, with the reduction rounded half up
    #[must_use]
    pub const fn discounted(self, rate: Rate) -> Self {
        Self(self.0 - self.portion(rate).0)
    }

    /// Whether the amount is strictly positive
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, digit) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        if self.0 < 0 {
            write!(f, "-₩{grouped}")
        } else {
            write!(f, "₩{grouped}")
        }
    }
}

/// Rate in basis points (`1000` = 10%)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
    /// Basis points in 100%
    pub const SCALE: u32 = 10_000;

    /// 0%
    pub const ZERO: Self = Self(0);

    /// Creates a rate from basis points, capped at 100%
    #[must_use]
    pub const fn from_basis_points(basis_points: u32) -> Self {
        if basis_points > Self::SCALE {
            Self(Self::SCALE)
        } else {
            Self(basis_points)
        }
    }

    /// Creates a rate from whole percent, capped at 100%
    #[must_use]
    pub const fn from_percent(percent: u32) -> Self {
        Self::from_basis_points(percent.saturating_mul(100))
    }

    /// Returns the rate in basis points
    #[must_use]
    pub const fn basis_points(self) -> u32 {
        self.0
    }

    /// Returns the rate in whole percent (rounded down)
    #[must_use]
    pub const fn percent(self) -> u32 {
        self.0 / 100
    }

    /// `100% - self`
    #[must_use]
    pub const fn complement(self) -> Self {
        Self(Self::SCALE - self.0)
    }

    /// Whether the rate is 0%
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}
