//! Deduction Executor: all-or-nothing deduction of one sale's requirements.

use chrono::Utc;
use tracing::{error, info};

use stockflow_core::{DomainError, InventoryStockId, Quantity, ReferenceId, StoreId};
use stockflow_inventory::{
    InventoryDeductionResult, InventoryError, InventoryMovement, InventoryResult,
    InventoryStockItem, RecipeIngredientRequirement, all_sufficient,
};

use crate::availability::{evaluate, resolve_requirements};
use crate::ledger::FractionalStockLedger;
use crate::resolver::ConversionResolver;
use crate::store::{LedgerStore, MappingStore};

/// What a committed deduction wrote.
#[derive(Debug, Clone)]
pub struct DeductionOutcome {
    /// One per requirement, in requirement order.
    pub results: Vec<InventoryDeductionResult>,
    /// One per touched stock item.
    pub movements: Vec<InventoryMovement>,
    /// Item states after the commit.
    pub items: Vec<InventoryStockItem>,
}

#[derive(Debug)]
pub struct DeductionExecutor<'a, M, S> {
    resolver: &'a ConversionResolver<M>,
    ledger: &'a FractionalStockLedger<S>,
}

impl<'a, M, S> DeductionExecutor<'a, M, S>
where
    M: MappingStore,
    S: LedgerStore,
{
    pub fn new(resolver: &'a ConversionResolver<M>, ledger: &'a FractionalStockLedger<S>) -> Self {
        Self { resolver, ledger }
    }

    /// Deduct every requirement under `reference_id`, or nothing at all.
    ///
    /// Items are locked (sorted) before availability is re-checked, so nothing
    /// can consume the same stock between the check and the write. Any short
    /// or unresolvable entry returns `InsufficientStock` with every failing
    /// check and leaves stock untouched.
    pub fn deduct(
        &self,
        reference_id: ReferenceId,
        store_id: StoreId,
        requirements: &[RecipeIngredientRequirement],
    ) -> InventoryResult<DeductionOutcome> {
        if requirements.is_empty() {
            return Err(DomainError::validation("nothing to deduct").into());
        }
        if self
            .ledger
            .movements_for(reference_id)?
            .iter()
            .any(InventoryMovement::is_outstanding)
        {
            return Err(InventoryError::DuplicateReference(reference_id));
        }

        let resolved = resolve_requirements(self.resolver, store_id, requirements)?;
        let stock_ids: Vec<InventoryStockId> =
            resolved.iter().filter_map(|r| r.inventory_stock_id()).collect();

        let mut txn = self.ledger.begin(&stock_ids)?;
        let evaluated = evaluate(store_id, &resolved, &mut txn, self.ledger.precision())?;

        let checks: Vec<_> = evaluated.iter().map(|e| e.check.clone()).collect();
        if !all_sufficient(&checks) {
            let failures: Vec<_> = checks.into_iter().filter(|c| !c.is_sufficient).collect();
            info!(
                reference_id = %reference_id,
                store_id = %store_id,
                failures = failures.len(),
                "deduction rejected: insufficient stock"
            );
            return Err(InventoryError::InsufficientStock { failures });
        }

        let recorded_at = Utc::now();
        let mut results = Vec::with_capacity(evaluated.len());
        // (stock id, total delta, total before the first application, total after the last)
        let mut per_item: Vec<(InventoryStockId, Quantity, Quantity, Quantity)> = Vec::new();

        for (entry, evaluation) in resolved.iter().zip(&evaluated) {
            let (Some(stock_id), Some(needed)) = (entry.inventory_stock_id(), evaluation.stock_delta) else {
                return Err(DomainError::invariant("sufficient check without a resolved stock item").into());
            };

            let snapshot = txn.apply(stock_id, needed.negated()).inspect_err(|e| {
                error!(
                    reference_id = %reference_id,
                    inventory_stock_id = %stock_id,
                    error = %e,
                    "ledger refused a pre-checked deduction; rolling back"
                );
            })?;

            match per_item.iter_mut().find(|(id, ..)| *id == stock_id) {
                Some((_, delta, _, after)) => {
                    *delta = delta
                        .checked_add(snapshot.delta)
                        .ok_or_else(|| DomainError::validation("movement delta overflow"))?;
                    *after = snapshot.new_total;
                }
                None => per_item.push((stock_id, snapshot.delta, snapshot.previous_total, snapshot.new_total)),
            }

            results.push(InventoryDeductionResult {
                ingredient_name: entry.requirement.ingredient_name.clone(),
                inventory_stock_id: stock_id,
                quantity_deducted: needed,
                previous_total: snapshot.previous_total,
                remaining_stock_quantity: snapshot.stock_quantity,
                remaining_fractional_stock: snapshot.fractional_stock,
                remaining_total: snapshot.new_total,
            });
        }

        let movements: Vec<InventoryMovement> = per_item
            .into_iter()
            .map(|(stock_id, delta, before, after)| {
                InventoryMovement::deduction(reference_id, store_id, stock_id, delta, before, after, recorded_at)
            })
            .collect();
        for movement in &movements {
            txn.record(movement.clone());
        }
        txn.claim_reference(reference_id);

        let items = txn.commit()?;
        info!(
            reference_id = %reference_id,
            store_id = %store_id,
            requirements = results.len(),
            movements = movements.len(),
            "deduction committed"
        );

        Ok(DeductionOutcome {
            results,
            movements,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use stockflow_core::DEFAULT_PRECISION;
    use stockflow_inventory::CheckFailure;

    use crate::store::{InMemoryLedgerStore, InMemoryMappingStore};

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    struct Fixture {
        store: StoreId,
        resolver: ConversionResolver<Arc<InMemoryMappingStore>>,
        ledger: FractionalStockLedger<Arc<InMemoryLedgerStore>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: StoreId::new(),
                resolver: ConversionResolver::new(InMemoryMappingStore::arc()),
                ledger: FractionalStockLedger::new(
                    InMemoryLedgerStore::arc(),
                    DEFAULT_PRECISION,
                    Duration::from_millis(200),
                ),
            }
        }

        fn stock(&self, name: &str, total: &str, ingredient: &str, unit: &str, factor: &str) -> InventoryStockId {
            let item = InventoryStockItem::new(InventoryStockId::new(), self.store, name, "units", q(total), DEFAULT_PRECISION)
                .unwrap();
            let id = self.ledger.insert_item(item).unwrap().id_typed();
            self.resolver
                .register(self.store, ingredient, unit, id, factor.parse::<Decimal>().unwrap())
                .unwrap();
            id
        }

        fn executor(&self) -> DeductionExecutor<'_, Arc<InMemoryMappingStore>, Arc<InMemoryLedgerStore>> {
            DeductionExecutor::new(&self.resolver, &self.ledger)
        }
    }

    fn req(name: &str, unit: &str, qty: &str) -> RecipeIngredientRequirement {
        RecipeIngredientRequirement::new(name, unit, q(qty))
    }

    #[test]
    fn half_unit_factor_leaves_a_fraction() {
        let f = Fixture::new();
        let x = f.stock("X", "10", "x", "portion", "0.5");

        let outcome = f
            .executor()
            .deduct(ReferenceId::generate(), f.store, &[req("x", "portion", "3")])
            .unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.quantity_deducted, q("1.5"));
        assert_eq!(result.remaining_stock_quantity, 8);
        assert_eq!(result.remaining_fractional_stock, q("0.5"));
        assert_eq!(f.ledger.peek(x).unwrap(), q("8.5"));
    }

    #[test]
    fn shortage_reports_only_failing_entries_and_writes_nothing() {
        let f = Fixture::new();
        let a = f.stock("A", "5", "a", "pcs", "1");
        let b = f.stock("B", "1", "b", "pcs", "1");

        let err = f
            .executor()
            .deduct(ReferenceId::generate(), f.store, &[req("a", "pcs", "2"), req("b", "pcs", "2")])
            .unwrap_err();

        let InventoryError::InsufficientStock { failures } = err else {
            panic!("expected insufficient stock");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].ingredient_name, "b");
        assert_eq!(failures[0].failure, Some(CheckFailure::InsufficientStock));
        assert_eq!(f.ledger.peek(a).unwrap(), q("5"));
        assert_eq!(f.ledger.peek(b).unwrap(), q("1"));
        assert_eq!(f.ledger.store().movement_count(), 0);
    }

    #[test]
    fn one_movement_per_touched_item() {
        let f = Fixture::new();
        let sugar = f.stock("Sugar", "2", "sugar", "g", "0.001");
        f.resolver
            .register(f.store, "brown sugar", "g", sugar, Decimal::new(1, 3))
            .unwrap();
        let reference = ReferenceId::generate();

        let outcome = f
            .executor()
            .deduct(reference, f.store, &[req("sugar", "g", "300"), req("brown sugar", "g", "200")])
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].remaining_total, q("1.5"));
        assert_eq!(outcome.movements.len(), 1);
        assert_eq!(outcome.movements[0].delta, q("-0.5"));
        assert_eq!(outcome.movements[0].previous_total, q("2"));
        assert_eq!(f.ledger.movements_for(reference).unwrap().len(), 1);
    }

    #[test]
    fn unmapped_ingredient_is_a_hard_stop() {
        let f = Fixture::new();
        let a = f.stock("A", "5", "a", "pcs", "1");
        let err = f
            .executor()
            .deduct(ReferenceId::generate(), f.store, &[req("a", "pcs", "1"), req("ghost", "pcs", "1")])
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { ref failures } if failures[0].failure == Some(CheckFailure::UnmappedIngredient)));
        assert_eq!(f.ledger.peek(a).unwrap(), q("5"));
    }

    #[test]
    fn reference_cannot_be_reused() {
        let f = Fixture::new();
        f.stock("A", "5", "a", "pcs", "1");
        let reference = ReferenceId::generate();
        f.executor().deduct(reference, f.store, &[req("a", "pcs", "1")]).unwrap();
        let err = f.executor().deduct(reference, f.store, &[req("a", "pcs", "1")]).unwrap_err();
        assert_eq!(err, InventoryError::DuplicateReference(reference));
    }
}
