use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{Entity, InventoryStockId, MappingId, Quantity, StoreId};

use crate::error::InventoryResult;
use crate::key::MappingKey;
use crate::unit::ConversionFactor;

/// Resolves one recipe ingredient (in one recipe unit) to a stock item.
///
/// The display name and unit are kept as typed; matching only ever uses `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMapping {
    id: MappingId,
    store_id: StoreId,
    ingredient_name: String,
    source_unit: String,
    key: MappingKey,
    inventory_stock_id: InventoryStockId,
    conversion_factor: ConversionFactor,
    active: bool,
}

impl ConversionMapping {
    pub fn new(
        id: MappingId,
        store_id: StoreId,
        ingredient_name: impl Into<String>,
        source_unit: impl Into<String>,
        inventory_stock_id: InventoryStockId,
        conversion_factor: Decimal,
    ) -> InventoryResult<Self> {
        let ingredient_name = ingredient_name.into();
        let source_unit = source_unit.into();
        let key = MappingKey::new(&ingredient_name, &source_unit)?;
        let conversion_factor = ConversionFactor::new(conversion_factor)?;
        Ok(Self {
            id,
            store_id,
            ingredient_name,
            source_unit,
            key,
            inventory_stock_id,
            conversion_factor,
            active: true,
        })
    }

    pub fn id_typed(&self) -> MappingId {
        self.id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn ingredient_name(&self) -> &str {
        &self.ingredient_name
    }

    pub fn source_unit(&self) -> &str {
        &self.source_unit
    }

    pub fn key(&self) -> &MappingKey {
        &self.key
    }

    pub fn inventory_stock_id(&self) -> InventoryStockId {
        self.inventory_stock_id
    }

    pub fn conversion_factor(&self) -> ConversionFactor {
        self.conversion_factor
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mappings are retired, never deleted, so past deductions stay reproducible.
    pub fn deactivated(&self) -> Self {
        let mut next = self.clone();
        next.active = false;
        next
    }

    /// Recipe quantity to stock units (unrounded).
    pub fn to_stock_units(&self, recipe_quantity: Quantity) -> InventoryResult<Quantity> {
        self.conversion_factor.apply(recipe_quantity)
    }
}

impl Entity for ConversionMapping {
    type Id = MappingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
