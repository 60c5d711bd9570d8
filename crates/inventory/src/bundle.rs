//! Composite products and their recursive expansion into leaf requirements.

use serde::{Deserialize, Serialize};

use stockflow_core::{BundleId, DomainError, DomainResult, Quantity, RecipeId, StoreId};

use crate::error::{InventoryError, InventoryResult};
use crate::recipe::{Recipe, RecipeIngredientRequirement, ensure_positive};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductBundle {
    pub id: BundleId,
    pub store_id: StoreId,
    pub name: String,
    pub active: bool,
}

impl ProductBundle {
    pub fn new(id: BundleId, store_id: StoreId, name: impl Into<String>) -> Self {
        Self {
            id,
            store_id,
            name: name.into(),
            active: true,
        }
    }
}

/// What one bundle component points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentTarget {
    /// A leaf ingredient, resolved later through the conversion mappings.
    Ingredient { name: String },
    /// A nested bundle, expanded recursively.
    Bundle { id: BundleId },
    /// A recipe, expanded into its ingredient lines.
    Recipe { id: RecipeId },
}

/// `quantity` units of `target` per one unit of `bundle_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleComponent {
    pub bundle_id: BundleId,
    pub target: ComponentTarget,
    pub quantity: Quantity,
    pub unit: String,
    pub active: bool,
}

impl BundleComponent {
    pub fn new(
        bundle_id: BundleId,
        target: ComponentTarget,
        quantity: Quantity,
        unit: impl Into<String>,
    ) -> DomainResult<Self> {
        if !quantity.is_positive() {
            return Err(DomainError::validation(format!(
                "bundle component quantity must be positive, got {quantity}"
            )));
        }
        if target == (ComponentTarget::Bundle { id: bundle_id }) {
            return Err(DomainError::validation("a bundle cannot contain itself"));
        }
        Ok(Self {
            bundle_id,
            target,
            quantity,
            unit: unit.into(),
            active: true,
        })
    }

    pub fn ingredient(
        bundle_id: BundleId,
        name: impl Into<String>,
        unit: impl Into<String>,
        quantity: Quantity,
    ) -> DomainResult<Self> {
        Self::new(bundle_id, ComponentTarget::Ingredient { name: name.into() }, quantity, unit)
    }

    pub fn nested(bundle_id: BundleId, child: BundleId, quantity: Quantity) -> DomainResult<Self> {
        Self::new(bundle_id, ComponentTarget::Bundle { id: child }, quantity, "each")
    }

    pub fn recipe(bundle_id: BundleId, recipe: RecipeId, quantity: Quantity) -> DomainResult<Self> {
        Self::new(bundle_id, ComponentTarget::Recipe { id: recipe }, quantity, "each")
    }
}

/// Read access to bundle definitions (and the recipes they may reference).
pub trait BundleCatalog {
    fn bundle(&self, id: BundleId) -> InventoryResult<Option<ProductBundle>>;

    fn components(&self, id: BundleId) -> InventoryResult<Vec<BundleComponent>>;

    fn recipe(&self, id: RecipeId) -> InventoryResult<Option<Recipe>>;
}

impl<C> BundleCatalog for std::sync::Arc<C>
where
    C: BundleCatalog + ?Sized,
{
    fn bundle(&self, id: BundleId) -> InventoryResult<Option<ProductBundle>> {
        (**self).bundle(id)
    }

    fn components(&self, id: BundleId) -> InventoryResult<Vec<BundleComponent>> {
        (**self).components(id)
    }

    fn recipe(&self, id: RecipeId) -> InventoryResult<Option<Recipe>> {
        (**self).recipe(id)
    }
}

/// Expand `quantity_sold` units of a bundle into leaf ingredient requirements.
///
/// Leaf quantity = `quantity_sold × Π(component quantity at each level)`. Shared
/// sub-bundles (diamonds) are expanded once per path; a bundle already on the
/// current path is a cycle. Nested bundles and recipes must belong to the same
/// store as the root bundle; foreign ones are reported as unknown.
pub fn expand<C>(
    catalog: &C,
    bundle_id: BundleId,
    quantity_sold: Quantity,
) -> InventoryResult<Vec<RecipeIngredientRequirement>>
where
    C: BundleCatalog + ?Sized,
{
    ensure_positive(quantity_sold)?;
    let owner = catalog
        .bundle(bundle_id)?
        .ok_or(InventoryError::UnknownBundle(bundle_id))?
        .store_id;
    let mut out = Vec::new();
    let mut path = Vec::new();
    expand_into(catalog, owner, bundle_id, quantity_sold, &mut path, &mut out)?;
    Ok(out)
}

fn expand_into<C>(
    catalog: &C,
    owner: StoreId,
    bundle_id: BundleId,
    multiplier: Quantity,
    path: &mut Vec<BundleId>,
    out: &mut Vec<RecipeIngredientRequirement>,
) -> InventoryResult<()>
where
    C: BundleCatalog + ?Sized,
{
    if path.contains(&bundle_id) {
        return Err(InventoryError::CyclicBundle(bundle_id));
    }

    let bundle = catalog
        .bundle(bundle_id)?
        .filter(|b| b.store_id == owner)
        .ok_or(InventoryError::UnknownBundle(bundle_id))?;
    if !bundle.active {
        return Err(InventoryError::InactiveBundle(bundle_id));
    }

    path.push(bundle_id);
    for component in catalog.components(bundle_id)? {
        if !component.active {
            return Err(InventoryError::InactiveBundle(bundle_id));
        }
        let quantity = multiplier
            .checked_mul(component.quantity)
            .ok_or_else(|| DomainError::validation("bundle quantity overflow"))?;

        match &component.target {
            ComponentTarget::Ingredient { name } => {
                out.push(RecipeIngredientRequirement::new(
                    name.clone(),
                    component.unit.clone(),
                    quantity,
                ));
            }
            ComponentTarget::Bundle { id } => {
                expand_into(catalog, owner, *id, quantity, path, out)?;
            }
            ComponentTarget::Recipe { id } => {
                let recipe = catalog
                    .recipe(*id)?
                    .filter(|r| r.store_id == owner)
                    .ok_or(InventoryError::UnknownRecipe(*id))?;
                out.extend(recipe.requirements(quantity)?);
            }
        }
    }
    path.pop();

    Ok(())
}
