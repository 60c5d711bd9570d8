//! Unit converter: recipe units to stock units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, Quantity, ValueObject};

use crate::error::{InventoryError, InventoryResult};

/// `stock_quantity = quantity * factor`.
///
/// No rounding happens here; the ledger applies the configured precision when the
/// converted amount is actually charged against stock.
pub fn convert(quantity: Quantity, factor: Decimal) -> InventoryResult<Quantity> {
    if factor <= Decimal::ZERO {
        return Err(InventoryError::InvalidFactor(factor));
    }
    quantity
        .checked_mul(Quantity::from_decimal(factor))
        .ok_or_else(|| {
            InventoryError::Domain(DomainError::validation(format!(
                "conversion of {quantity} by {factor} overflows"
            )))
        })
}

/// Stock units per one recipe unit. Always strictly positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ConversionFactor(Decimal);

impl ValueObject for ConversionFactor {}

impl ConversionFactor {
    pub fn new(value: Decimal) -> InventoryResult<Self> {
        if value <= Decimal::ZERO {
            return Err(InventoryError::InvalidFactor(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Recipe units per one stock unit.
    pub fn inverse(&self) -> InventoryResult<Self> {
        Decimal::ONE
            .checked_div(self.0)
            .ok_or(InventoryError::InvalidFactor(self.0))
            .and_then(Self::new)
    }

    pub fn apply(&self, quantity: Quantity) -> InventoryResult<Quantity> {
        convert(quantity, self.0)
    }
}

impl TryFrom<Decimal> for ConversionFactor {
    type Error = InventoryError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConversionFactor> for Decimal {
    fn from(value: ConversionFactor) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn converts_by_multiplication() {
        let out = convert(Quantity::from_whole(3), d("0.5")).unwrap();
        assert_eq!(out, Quantity::parse("1.5").unwrap());
    }

    #[test]
    fn rejects_non_positive_factor() {
        assert_eq!(
            convert(Quantity::ONE, Decimal::ZERO).unwrap_err(),
            InventoryError::InvalidFactor(Decimal::ZERO)
        );
        assert!(convert(Quantity::ONE, d("-2")).is_err());
        assert!(ConversionFactor::new(d("-0.1")).is_err());
    }

    #[test]
    fn no_rounding_inside_converter() {
        let out = convert(Quantity::parse("0.333333").unwrap(), d("0.1")).unwrap();
        assert_eq!(out, Quantity::parse("0.0333333").unwrap());
    }

    #[test]
    fn factor_deserialization_validates() {
        assert!(serde_json::from_str::<ConversionFactor>("\"0\"").is_err());
        let f: ConversionFactor = serde_json::from_str("\"0.25\"").unwrap();
        assert_eq!(f.value(), d("0.25"));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: converting there and back lands within fixed-point tolerance.
            #[test]
            fn convert_then_inverse_is_identity(
                raw_qty in 1i64..1_000_000,
                qty_scale in 0u32..4,
                raw_factor in 1i64..100_000,
                factor_scale in 0u32..4,
            ) {
                let quantity = Quantity::from_decimal(Decimal::new(raw_qty, qty_scale));
                let factor = ConversionFactor::new(Decimal::new(raw_factor, factor_scale)).unwrap();

                let there = factor.apply(quantity).unwrap();
                let back = factor.inverse().unwrap().apply(there).unwrap();

                let tolerance = Decimal::new(1, 4);
                prop_assert!((back.value() - quantity.value()).abs() <= tolerance,
                    "{} -> {} -> {}", quantity, there, back);
            }
        }
    }
}
