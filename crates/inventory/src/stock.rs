//! Physical stock items and fractional recombination.

use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, Entity, InventoryStockId, Quantity, StoreId};

use crate::error::{InventoryError, InventoryResult};

/// Optional bulk/serving breakdown of a stock item (e.g. 1 box = 24 servings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBreakdown {
    pub bulk_unit: String,
    pub bulk_quantity: Quantity,
    pub serving_unit: String,
    pub serving_quantity: Quantity,
    /// Servings per one bulk (stock) unit.
    pub breakdown_ratio: Quantity,
}

impl StockBreakdown {
    pub fn validate(&self) -> DomainResult<()> {
        if !self.breakdown_ratio.is_positive() {
            return Err(DomainError::validation("breakdown_ratio must be positive"));
        }
        if self.bulk_quantity.is_negative() || self.serving_quantity.is_negative() {
            return Err(DomainError::validation("breakdown quantities cannot be negative"));
        }
        Ok(())
    }
}

/// One physical SKU at one store.
///
/// `stock_quantity` is the whole part, `fractional_stock` the remainder in `[0, 1)`,
/// both in stock units. Only the ledger produces new states, via [`Self::apply_delta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStockItem {
    id: InventoryStockId,
    store_id: StoreId,
    name: String,
    unit: String,
    stock_quantity: i64,
    fractional_stock: Quantity,
    breakdown: Option<StockBreakdown>,
    active: bool,
    version: u64,
}

/// Before/after view of one ledger application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub inventory_stock_id: InventoryStockId,
    pub delta: Quantity,
    pub previous_total: Quantity,
    pub new_total: Quantity,
    pub stock_quantity: i64,
    pub fractional_stock: Quantity,
}

impl InventoryStockItem {
    /// Receive a new stock item with an opening total (split into whole + fraction).
    pub fn new(
        id: InventoryStockId,
        store_id: StoreId,
        name: impl Into<String>,
        unit: impl Into<String>,
        opening_total: Quantity,
        precision: u32,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("stock item name cannot be empty"));
        }
        let total = opening_total.rounded(precision);
        if total.is_negative() {
            return Err(DomainError::validation("opening stock cannot be negative"));
        }
        Ok(Self {
            id,
            store_id,
            name,
            unit: unit.into(),
            stock_quantity: total.whole()?,
            fractional_stock: total.fraction(),
            breakdown: None,
            active: true,
            version: 0,
        })
    }

    pub fn with_breakdown(mut self, breakdown: StockBreakdown) -> DomainResult<Self> {
        breakdown.validate()?;
        self.breakdown = Some(breakdown);
        Ok(self)
    }

    pub fn id_typed(&self) -> InventoryStockId {
        self.id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn stock_quantity(&self) -> i64 {
        self.stock_quantity
    }

    pub fn fractional_stock(&self) -> Quantity {
        self.fractional_stock
    }

    pub fn breakdown(&self) -> Option<&StockBreakdown> {
        self.breakdown.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total available in stock units: whole + fraction.
    pub fn total(&self) -> DomainResult<Quantity> {
        Quantity::from_whole(self.stock_quantity)
            .checked_add(self.fractional_stock)
            .ok_or_else(|| DomainError::validation(format!("stock total overflow on {}", self.id)))
    }

    /// Fractional remainder expressed in serving units, when a breakdown exists.
    pub fn fractional_stock_in_servings(&self) -> Option<Quantity> {
        let ratio = self.breakdown.as_ref()?.breakdown_ratio;
        self.fractional_stock.checked_mul(ratio)
    }

    /// Total available in serving units; plain stock units without a breakdown.
    pub fn total_in_servings(&self) -> DomainResult<Quantity> {
        let total = self.total()?;
        match &self.breakdown {
            Some(b) => total
                .checked_mul(b.breakdown_ratio)
                .ok_or_else(|| DomainError::validation(format!("serving total overflow on {}", self.id))),
            None => Ok(total),
        }
    }

    /// Soft-deactivate; the row stays because movement history references it.
    pub fn deactivated(&self) -> Self {
        let mut next = self.clone();
        next.active = false;
        next.version += 1;
        next
    }

    /// Recombine whole and fractional parts after adding `delta` (already rounded
    /// to `precision` by the caller or rounded here).
    ///
    /// `new_fraction = (old_total + delta) mod 1`, `new_whole = floor(old_total + delta)`.
    /// Returns the next state (version + 1) and a snapshot; `self` is untouched.
    pub fn apply_delta(
        &self,
        delta: Quantity,
        precision: u32,
    ) -> InventoryResult<(InventoryStockItem, StockSnapshot)> {
        let delta = delta.rounded(precision);
        let previous_total = self.total()?;
        let new_total = previous_total
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation(format!("stock total overflow on {}", self.id)))?
            .rounded(precision);

        if new_total.is_negative() {
            return Err(InventoryError::NegativeStockResult {
                item: self.id,
                total: previous_total,
                delta,
            });
        }

        let mut next = self.clone();
        next.stock_quantity = new_total.whole()?;
        next.fractional_stock = new_total.fraction();
        next.version += 1;

        let snapshot = StockSnapshot {
            inventory_stock_id: self.id,
            delta,
            previous_total,
            new_total,
            stock_quantity: next.stock_quantity,
            fractional_stock: next.fractional_stock,
        };
        Ok((next, snapshot))
    }
}

impl Entity for InventoryStockItem {
    type Id = InventoryStockId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    fn item(total: &str) -> InventoryStockItem {
        InventoryStockItem::new(
            InventoryStockId::new(),
            StoreId::new(),
            "Croissant dough",
            "kg",
            q(total),
            4,
        )
        .unwrap()
    }

    #[test]
    fn opening_total_is_split() {
        let it = item("10.25");
        assert_eq!(it.stock_quantity(), 10);
        assert_eq!(it.fractional_stock(), q("0.25"));
        assert_eq!(it.total().unwrap(), q("10.25"));
    }

    #[test]
    fn deduction_recombines_whole_and_fraction() {
        let it = item("10");
        let (next, snap) = it.apply_delta(q("-1.5"), 4).unwrap();
        assert_eq!(next.stock_quantity(), 8);
        assert_eq!(next.fractional_stock(), q("0.5"));
        assert_eq!(snap.previous_total, q("10"));
        assert_eq!(snap.new_total, q("8.5"));
        assert_eq!(next.version(), it.version() + 1);
    }

    #[test]
    fn fraction_borrow_across_whole_units() {
        let it = item("3.25");
        let (next, _) = it.apply_delta(q("-0.5"), 4).unwrap();
        assert_eq!(next.stock_quantity(), 2);
        assert_eq!(next.fractional_stock(), q("0.75"));
    }

    #[test]
    fn negative_result_is_refused_not_clamped() {
        let it = item("1");
        let err = it.apply_delta(q("-1.0001"), 4).unwrap_err();
        match err {
            InventoryError::NegativeStockResult { total, delta, .. } => {
                assert_eq!(total, q("1"));
                assert_eq!(delta, q("-1.0001"));
            }
            other => panic!("expected NegativeStockResult, got {other:?}"),
        }
    }

    #[test]
    fn delta_is_rounded_to_precision() {
        let it = item("5");
        let (_, snap) = it.apply_delta(q("-0.123456"), 4).unwrap();
        assert_eq!(snap.delta, q("-0.1235"));
        assert_eq!(snap.new_total, q("4.8765"));
    }

    #[test]
    fn servings_reconcile_whole_and_fraction() {
        let it = item("2.5")
            .with_breakdown(StockBreakdown {
                bulk_unit: "box".into(),
                bulk_quantity: q("1"),
                serving_unit: "serving".into(),
                serving_quantity: q("1"),
                breakdown_ratio: q("24"),
            })
            .unwrap();
        assert_eq!(it.fractional_stock_in_servings(), Some(q("12")));
        assert_eq!(it.total_in_servings().unwrap(), q("60"));
    }

    #[test]
    fn breakdown_requires_positive_ratio() {
        let err = item("1").with_breakdown(StockBreakdown {
            bulk_unit: "box".into(),
            bulk_quantity: q("1"),
            serving_unit: "serving".into(),
            serving_quantity: q("1"),
            breakdown_ratio: Quantity::ZERO,
        });
        assert!(err.is_err());
    }

    #[test]
    fn rejects_negative_opening_stock() {
        let res = InventoryStockItem::new(
            InventoryStockId::new(),
            StoreId::new(),
            "Milk",
            "liters",
            q("-1"),
            4,
        );
        assert!(res.is_err());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use rust_decimal::Decimal;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: applying a delta then its negation restores the exact state totals.
            #[test]
            fn apply_then_negate_restores_total(
                opening in 0i64..10_000_000,
                raw_delta in 0i64..10_000_000,
            ) {
                let it = item(&Decimal::new(opening, 4).to_string());
                let delta = Quantity::from_decimal(Decimal::new(raw_delta, 4));
                prop_assume!(delta <= it.total().unwrap());

                let (after, snap) = it.apply_delta(delta.negated(), 4).unwrap();
                let (restored, _) = after.apply_delta(snap.delta.negated(), 4).unwrap();

                prop_assert_eq!(restored.total().unwrap(), it.total().unwrap());
                prop_assert_eq!(restored.stock_quantity(), it.stock_quantity());
                prop_assert_eq!(restored.fractional_stock(), it.fractional_stock());
            }

            /// Property: fractional stock always stays in [0, 1).
            #[test]
            fn fraction_invariant_holds(opening in 0i64..1_000_000, raw_delta in -1_000_000i64..1_000_000) {
                let it = item(&Decimal::new(opening, 3).to_string());
                let delta = Quantity::from_decimal(Decimal::new(raw_delta, 3));
                if let Ok((next, _)) = it.apply_delta(delta, 4) {
                    prop_assert!(!next.fractional_stock().is_negative());
                    prop_assert!(next.fractional_stock() < Quantity::ONE);
                    prop_assert!(!next.total().unwrap().is_negative());
                }
            }
        }
    }
}
