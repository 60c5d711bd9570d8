//! Availability Checker: resolve, convert, compare against current stock.
//!
//! Standalone checks read committed state without locks and are only a preview.
//! The executor runs the same evaluation against a locked [`LedgerTxn`], which
//! is the authoritative check.

use std::collections::HashMap;

use tracing::warn;

use stockflow_core::{DomainError, InventoryStockId, Quantity, StoreId};
use stockflow_inventory::{
    AvailabilityCheck, CheckFailure, ConversionMapping, InventoryError, InventoryResult,
    InventoryStockItem, RecipeIngredientRequirement,
};

use crate::ledger::{FractionalStockLedger, LedgerTxn};
use crate::resolver::ConversionResolver;
use crate::store::{LedgerStore, MappingStore};

/// A requirement and its mapping; `None` when the ingredient is unmapped.
#[derive(Debug, Clone)]
pub struct ResolvedRequirement {
    pub requirement: RecipeIngredientRequirement,
    pub mapping: Option<ConversionMapping>,
}

impl ResolvedRequirement {
    pub fn inventory_stock_id(&self) -> Option<InventoryStockId> {
        self.mapping.as_ref().map(ConversionMapping::inventory_stock_id)
    }
}

/// Resolve every requirement. Unmapped ingredients become per-entry failures;
/// anything else (ambiguous mappings, storage) aborts.
pub fn resolve_requirements<M>(
    resolver: &ConversionResolver<M>,
    store_id: StoreId,
    requirements: &[RecipeIngredientRequirement],
) -> InventoryResult<Vec<ResolvedRequirement>>
where
    M: MappingStore,
{
    requirements
        .iter()
        .map(|requirement| {
            let mapping = match resolver.resolve(store_id, &requirement.ingredient_name, &requirement.unit) {
                Ok(mapping) => Some(mapping),
                Err(InventoryError::UnmappedIngredient { .. }) => None,
                Err(e) => return Err(e),
            };
            Ok(ResolvedRequirement {
                requirement: requirement.clone(),
                mapping,
            })
        })
        .collect()
}

/// Source of stock item state for an evaluation.
pub trait StockLookup {
    fn lookup(&mut self, id: InventoryStockId) -> InventoryResult<Option<InventoryStockItem>>;
}

impl<S: LedgerStore> StockLookup for &FractionalStockLedger<S> {
    fn lookup(&mut self, id: InventoryStockId) -> InventoryResult<Option<InventoryStockItem>> {
        match self.item(id) {
            Ok(item) => Ok(Some(item)),
            Err(InventoryError::UnknownStockItem(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<S: LedgerStore> StockLookup for LedgerTxn<'_, S> {
    fn lookup(&mut self, id: InventoryStockId) -> InventoryResult<Option<InventoryStockItem>> {
        Ok(self.item(id)?.cloned())
    }
}

/// One evaluated requirement. `stock_delta` is this entry's own demand in stock
/// units, rounded to ledger precision (a non-zero demand stays at least one
/// tracked unit); present only for resolved entries.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub check: AvailabilityCheck,
    pub stock_delta: Option<Quantity>,
}

/// Compare each requirement against stock, accumulating demand per stock item
/// in requirement order.
pub fn evaluate<L>(
    store_id: StoreId,
    resolved: &[ResolvedRequirement],
    lookup: &mut L,
    precision: u32,
) -> InventoryResult<Vec<Evaluation>>
where
    L: StockLookup + ?Sized,
{
    let mut demand: HashMap<InventoryStockId, Quantity> = HashMap::new();
    let mut out = Vec::with_capacity(resolved.len());

    for entry in resolved {
        let requirement = &entry.requirement;
        let Some(mapping) = &entry.mapping else {
            out.push(Evaluation {
                check: AvailabilityCheck::unresolved(requirement, CheckFailure::UnmappedIngredient),
                stock_delta: None,
            });
            continue;
        };

        let stock_id = mapping.inventory_stock_id();
        let needed = mapping
            .to_stock_units(requirement.quantity)?
            .rounded_nonzero(precision);

        let mut check = AvailabilityCheck {
            ingredient_name: requirement.ingredient_name.clone(),
            recipe_unit: requirement.unit.clone(),
            recipe_quantity: requirement.quantity,
            inventory_stock_id: Some(stock_id),
            stock_unit: None,
            required_quantity: needed,
            available_quantity: Quantity::ZERO,
            is_sufficient: false,
            failure: None,
        };

        let item = match lookup.lookup(stock_id)? {
            Some(item) if item.store_id() == store_id => item,
            Some(item) => {
                warn!(
                    store_id = %store_id,
                    inventory_stock_id = %stock_id,
                    owner = %item.store_id(),
                    "mapping points at another store's stock item"
                );
                check.failure = Some(CheckFailure::UnknownStockItem);
                out.push(Evaluation { check, stock_delta: None });
                continue;
            }
            None => {
                check.failure = Some(CheckFailure::UnknownStockItem);
                out.push(Evaluation { check, stock_delta: None });
                continue;
            }
        };

        check.stock_unit = Some(item.unit().to_string());
        check.available_quantity = item.total()?;

        if !item.is_active() {
            check.failure = Some(CheckFailure::InactiveStockItem);
            out.push(Evaluation { check, stock_delta: None });
            continue;
        }

        let cumulative = demand.entry(stock_id).or_insert(Quantity::ZERO);
        *cumulative = cumulative
            .checked_add(needed)
            .ok_or_else(|| DomainError::validation("stock demand overflow"))?;

        check.required_quantity = *cumulative;
        check.is_sufficient = *cumulative <= check.available_quantity;
        if !check.is_sufficient {
            check.failure = Some(CheckFailure::InsufficientStock);
        }

        out.push(Evaluation {
            check,
            stock_delta: Some(needed),
        });
    }

    Ok(out)
}

/// Read-only availability preview over committed state.
#[derive(Debug)]
pub struct AvailabilityChecker<'a, M, S> {
    resolver: &'a ConversionResolver<M>,
    ledger: &'a FractionalStockLedger<S>,
}

impl<'a, M, S> AvailabilityChecker<'a, M, S>
where
    M: MappingStore,
    S: LedgerStore,
{
    pub fn new(resolver: &'a ConversionResolver<M>, ledger: &'a FractionalStockLedger<S>) -> Self {
        Self { resolver, ledger }
    }

    /// One result per requirement, in order. Takes no locks.
    pub fn check_all(
        &self,
        store_id: StoreId,
        requirements: &[RecipeIngredientRequirement],
    ) -> InventoryResult<Vec<AvailabilityCheck>> {
        let resolved = resolve_requirements(self.resolver, store_id, requirements)?;
        let mut view = self.ledger;
        let evaluated = evaluate(store_id, &resolved, &mut view, self.ledger.precision())?;
        Ok(evaluated.into_iter().map(|e| e.check).collect())
    }
}
