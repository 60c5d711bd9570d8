//! Recipes, sale line items and the requirements they expand into.

use serde::{Deserialize, Serialize};

use stockflow_core::{BundleId, DomainError, DomainResult, Quantity, RecipeId, StoreId};

use crate::error::{InventoryError, InventoryResult};

/// One ingredient line of a recipe, per unit of the recipe sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    pub unit: String,
    pub quantity_per_unit: Quantity,
}

impl RecipeIngredient {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, quantity_per_unit: Quantity) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            quantity_per_unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub store_id: StoreId,
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub active: bool,
}

impl Recipe {
    pub fn new(
        id: RecipeId,
        store_id: StoreId,
        name: impl Into<String>,
        ingredients: Vec<RecipeIngredient>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("recipe name cannot be empty"));
        }
        if let Some(bad) = ingredients.iter().find(|i| !i.quantity_per_unit.is_positive()) {
            return Err(DomainError::validation(format!(
                "ingredient '{}' must have a positive quantity",
                bad.name
            )));
        }
        Ok(Self {
            id,
            store_id,
            name,
            ingredients,
            active: true,
        })
    }

    /// Per-unit quantities multiplied by `quantity_sold`.
    pub fn requirements(&self, quantity_sold: Quantity) -> InventoryResult<Vec<RecipeIngredientRequirement>> {
        if !self.active {
            return Err(InventoryError::InactiveRecipe(self.id));
        }
        ensure_positive(quantity_sold)?;

        self.ingredients
            .iter()
            .map(|ingredient| -> InventoryResult<RecipeIngredientRequirement> {
                let quantity = ingredient
                    .quantity_per_unit
                    .checked_mul(quantity_sold)
                    .ok_or_else(|| DomainError::validation("recipe quantity overflow"))?;
                Ok(RecipeIngredientRequirement::new(
                    ingredient.name.clone(),
                    ingredient.unit.clone(),
                    quantity,
                ))
            })
            .collect()
    }
}

/// Ingredient demand of one sale, in recipe units. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredientRequirement {
    pub ingredient_name: String,
    pub unit: String,
    pub quantity: Quantity,
}

impl RecipeIngredientRequirement {
    pub fn new(ingredient_name: impl Into<String>, unit: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            ingredient_name: ingredient_name.into(),
            unit: unit.into(),
            quantity,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LineItemKind {
    Recipe(RecipeId),
    Bundle(BundleId),
}

/// What the register sold: a recipe or a bundle, and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineItem {
    pub kind: LineItemKind,
    pub quantity: Quantity,
}

impl SaleLineItem {
    pub fn recipe(id: RecipeId, quantity: Quantity) -> Self {
        Self {
            kind: LineItemKind::Recipe(id),
            quantity,
        }
    }

    pub fn bundle(id: BundleId, quantity: Quantity) -> Self {
        Self {
            kind: LineItemKind::Bundle(id),
            quantity,
        }
    }
}

pub(crate) fn ensure_positive(quantity: Quantity) -> DomainResult<()> {
    if !quantity.is_positive() {
        return Err(DomainError::validation(format!(
            "quantity sold must be positive, got {quantity}"
        )));
    }
    Ok(())
}
