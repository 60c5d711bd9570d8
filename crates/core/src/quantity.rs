//! Fixed-point quantities.
//!
//! Stock is tracked with decimal arithmetic only. Binary floats drift after a few
//! thousand small deductions; `Decimal` at a fixed scale does not.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Decimal places kept for fractional stock unless configured otherwise.
pub const DEFAULT_PRECISION: u32 = 4;

/// Upper bound accepted for a configured precision.
pub const MAX_PRECISION: u32 = 12;

/// A signed decimal quantity in some unit (recipe units, stock units, servings).
///
/// The type carries no unit; callers keep the unit next to it. Equality is by
/// numeric value (`1.5 == 1.50`).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);
    pub const ONE: Quantity = Quantity(Decimal::ONE);

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_whole(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse a decimal literal (`"2.5"`).
    pub fn parse(s: &str) -> DomainResult<Self> {
        s.trim()
            .parse::<Decimal>()
            .map(Self)
            .map_err(|e| DomainError::validation(format!("invalid quantity '{s}': {e}")))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Round half away from zero to `precision` decimal places.
    pub fn rounded(&self, precision: u32) -> Self {
        let dp = precision.min(MAX_PRECISION);
        Self(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
        )
    }

    /// Like [`rounded`](Self::rounded), but a non-zero value never rounds to
    /// zero: it keeps at least one unit of the last tracked decimal place.
    pub fn rounded_nonzero(&self, precision: u32) -> Self {
        let rounded = self.rounded(precision);
        if !rounded.is_zero() || self.is_zero() {
            return rounded;
        }
        let unit = Decimal::new(1, precision.min(MAX_PRECISION));
        if self.0.is_sign_negative() { Self(-unit) } else { Self(unit) }
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

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_mul(other.0).map(Self)
    }

    pub fn checked_div(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_div(other.0).map(Self)
    }

    pub fn negated(self) -> Quantity {
        Self(-self.0)
    }

    /// Whole part, rounded toward negative infinity.
    pub fn whole(&self) -> DomainResult<i64> {
        self.0
            .floor()
            .to_i64()
            .ok_or_else(|| DomainError::validation(format!("quantity {} out of range", self.0)))
    }

    /// Remainder above the whole part; always in `[0, 1)`.
    pub fn fraction(&self) -> Quantity {
        Self((self.0 - self.0.floor()).normalize())
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0.normalize(), f)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self::from_whole(value)
    }
}

impl core::ops::Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        self.negated()
    }
}
