//! Turns sale line items into ingredient requirements (recipe units).

use stockflow_core::{DomainError, StoreId};
use stockflow_inventory::{
    BundleCatalog, InventoryError, InventoryResult, LineItemKind, RecipeIngredientRequirement,
    SaleLineItem, expand,
};

/// Expand every line, in order. Recipes multiply out directly; bundles go
/// through the recursive expander.
pub fn plan_requirements<C>(
    catalog: &C,
    store_id: StoreId,
    line_items: &[SaleLineItem],
) -> InventoryResult<Vec<RecipeIngredientRequirement>>
where
    C: BundleCatalog + ?Sized,
{
    if line_items.is_empty() {
        return Err(DomainError::validation("a sale needs at least one line item").into());
    }

    let mut requirements = Vec::new();
    for line in line_items {
        match line.kind {
            LineItemKind::Recipe(recipe_id) => {
                let recipe = catalog
                    .recipe(recipe_id)?
                    .filter(|r| r.store_id == store_id)
                    .ok_or(InventoryError::UnknownRecipe(recipe_id))?;
                requirements.extend(recipe.requirements(line.quantity)?);
            }
            LineItemKind::Bundle(bundle_id) => {
                catalog
                    .bundle(bundle_id)?
                    .filter(|b| b.store_id == store_id)
                    .ok_or(InventoryError::UnknownBundle(bundle_id))?;
                requirements.extend(expand(catalog, bundle_id, line.quantity)?);
            }
        }
    }
    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::{BundleId, Quantity, RecipeId};
    use stockflow_inventory::{BundleComponent, ProductBundle, Recipe, RecipeIngredient};

    use crate::store::{CatalogStore, InMemoryCatalogStore};

    fn latte(store: StoreId) -> Recipe {
        Recipe::new(
            RecipeId::new(),
            store,
            "Latte",
            vec![
                RecipeIngredient::new("espresso", "shot", Quantity::from_whole(2)),
                RecipeIngredient::new("milk", "ml", Quantity::from_whole(200)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn recipe_lines_multiply_by_quantity_sold() {
        let catalog = InMemoryCatalogStore::new();
        let store = StoreId::new();
        let recipe = latte(store);
        catalog.insert_recipe(recipe.clone()).unwrap();

        let reqs =
            plan_requirements(&catalog, store, &[SaleLineItem::recipe(recipe.id, Quantity::from_whole(3))])
                .unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].quantity, Quantity::from_whole(600));
    }

    #[test]
    fn lines_from_another_store_are_unknown() {
        let catalog = InMemoryCatalogStore::new();
        let recipe = latte(StoreId::new());
        catalog.insert_recipe(recipe.clone()).unwrap();

        let err = plan_requirements(&catalog, StoreId::new(), &[SaleLineItem::recipe(recipe.id, Quantity::ONE)])
            .unwrap_err();
        assert_eq!(err, InventoryError::UnknownRecipe(recipe.id));
    }

    #[test]
    fn bundle_cannot_pull_in_another_stores_recipe() {
        let catalog = InMemoryCatalogStore::new();
        let store = StoreId::new();
        let foreign = latte(StoreId::new());
        catalog.insert_recipe(foreign.clone()).unwrap();
        let combo = ProductBundle::new(BundleId::new(), store, "Borrowed latte");
        catalog.insert_bundle(combo.clone()).unwrap();
        catalog
            .add_component(BundleComponent::recipe(combo.id, foreign.id, Quantity::ONE).unwrap())
            .unwrap();

        let err = plan_requirements(&catalog, store, &[SaleLineItem::bundle(combo.id, Quantity::ONE)])
            .unwrap_err();
        assert_eq!(err, InventoryError::UnknownRecipe(foreign.id));
    }

    #[test]
    fn bundles_and_recipes_mix() {
        let catalog = InMemoryCatalogStore::new();
        let store = StoreId::new();
        let recipe = latte(store);
        catalog.insert_recipe(recipe.clone()).unwrap();
        let combo = ProductBundle::new(BundleId::new(), store, "Latte + cookie");
        catalog.insert_bundle(combo.clone()).unwrap();
        catalog
            .add_component(BundleComponent::recipe(combo.id, recipe.id, Quantity::ONE).unwrap())
            .unwrap();
        catalog
            .add_component(BundleComponent::ingredient(combo.id, "cookie", "pcs", Quantity::ONE).unwrap())
            .unwrap();

        let reqs = plan_requirements(
            &catalog,
            store,
            &[
                SaleLineItem::bundle(combo.id, Quantity::from_whole(2)),
                SaleLineItem::recipe(recipe.id, Quantity::ONE),
            ],
        )
        .unwrap();
        assert_eq!(reqs.len(), 5);
        assert_eq!(reqs[2].ingredient_name, "cookie");
        assert_eq!(reqs[2].quantity, Quantity::from_whole(2));
    }

    #[test]
    fn empty_sale_is_invalid() {
        let catalog = InMemoryCatalogStore::new();
        assert!(plan_requirements(&catalog, StoreId::new(), &[]).is_err());
    }
}
