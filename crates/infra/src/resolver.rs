//! Conversion Resolver: recipe ingredient + unit -> stock item mapping.

use rust_decimal::Decimal;
use tracing::{error, info};

use stockflow_core::{DomainError, InventoryStockId, MappingId, StoreId};
use stockflow_inventory::{ConversionMapping, InventoryError, InventoryResult, MappingKey};

use crate::store::{MappingStore, StoreError};

#[derive(Debug)]
pub struct ConversionResolver<M> {
    store: M,
}

impl<M> ConversionResolver<M>
where
    M: MappingStore,
{
    pub fn new(store: M) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &M {
        &self.store
    }

    /// The single active mapping for `(ingredient_name, unit)` in `store_id`.
    ///
    /// No mapping is `UnmappedIngredient`, never a default. Several active
    /// mappings for one key is `AmbiguousMapping`, an integrity failure.
    pub fn resolve(&self, store_id: StoreId, ingredient_name: &str, unit: &str) -> InventoryResult<ConversionMapping> {
        let key = MappingKey::new(ingredient_name, unit)?;
        let mut candidates = self.store.find_active(store_id, &key)?;

        match candidates.len() {
            0 => Err(InventoryError::UnmappedIngredient {
                ingredient: ingredient_name.to_string(),
                unit: unit.to_string(),
            }),
            1 => Ok(candidates.remove(0)),
            count => {
                error!(
                    store_id = %store_id,
                    key = %key,
                    count,
                    "multiple active conversion mappings for one key"
                );
                Err(InventoryError::AmbiguousMapping {
                    ingredient: key.ingredient().to_string(),
                    unit: key.unit().to_string(),
                    count,
                })
            }
        }
    }

    /// Create and store an active mapping. A second active mapping for the same
    /// canonical key is refused.
    pub fn register(
        &self,
        store_id: StoreId,
        ingredient_name: &str,
        unit: &str,
        inventory_stock_id: InventoryStockId,
        conversion_factor: Decimal,
    ) -> InventoryResult<ConversionMapping> {
        let mapping = ConversionMapping::new(
            MappingId::new(),
            store_id,
            ingredient_name,
            unit,
            inventory_stock_id,
            conversion_factor,
        )?;

        match self.store.insert(mapping.clone()) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => {
                return Err(DomainError::conflict(format!(
                    "an active mapping already exists for {}",
                    mapping.key()
                ))
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            store_id = %store_id,
            mapping_id = %mapping.id_typed(),
            key = %mapping.key(),
            inventory_stock_id = %inventory_stock_id,
            factor = %conversion_factor,
            "conversion mapping registered"
        );
        Ok(mapping)
    }

    /// Retire a mapping; it stays stored so past deductions remain explainable.
    pub fn deactivate(&self, store_id: StoreId, mapping_id: MappingId) -> InventoryResult<ConversionMapping> {
        let current = self
            .store
            .get(store_id, mapping_id)?
            .ok_or_else(|| DomainError::not_found(format!("mapping {mapping_id}")))?;
        let next = current.deactivated();
        self.store.update(next.clone())?;
        info!(store_id = %store_id, mapping_id = %mapping_id, "conversion mapping deactivated");
        Ok(next)
    }

    pub fn list(&self, store_id: StoreId) -> InventoryResult<Vec<ConversionMapping>> {
        Ok(self.store.list(store_id)?)
    }
}
