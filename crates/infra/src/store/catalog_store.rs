//! Recipe and bundle definitions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stockflow_core::{BundleId, RecipeId, StoreId};
use stockflow_inventory::{
    BundleCatalog, BundleComponent, InventoryResult, ProductBundle, Recipe,
};

use super::StoreError;

/// Writable catalog; reads go through [`BundleCatalog`].
pub trait CatalogStore: BundleCatalog + Send + Sync {
    fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError>;

    fn set_recipe_active(&self, id: RecipeId, active: bool) -> Result<(), StoreError>;

    fn list_recipes(&self, store_id: StoreId) -> Result<Vec<Recipe>, StoreError>;

    fn insert_bundle(&self, bundle: ProductBundle) -> Result<(), StoreError>;

    fn set_bundle_active(&self, id: BundleId, active: bool) -> Result<(), StoreError>;

    /// Attach a component; the owning bundle must exist.
    fn add_component(&self, component: BundleComponent) -> Result<(), StoreError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        (**self).insert_recipe(recipe)
    }

    fn set_recipe_active(&self, id: RecipeId, active: bool) -> Result<(), StoreError> {
        (**self).set_recipe_active(id, active)
    }

    fn list_recipes(&self, store_id: StoreId) -> Result<Vec<Recipe>, StoreError> {
        (**self).list_recipes(store_id)
    }

    fn insert_bundle(&self, bundle: ProductBundle) -> Result<(), StoreError> {
        (**self).insert_bundle(bundle)
    }

    fn set_bundle_active(&self, id: BundleId, active: bool) -> Result<(), StoreError> {
        (**self).set_bundle_active(id, active)
    }

    fn add_component(&self, component: BundleComponent) -> Result<(), StoreError> {
        (**self).add_component(component)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    recipes: HashMap<RecipeId, Recipe>,
    bundles: HashMap<BundleId, ProductBundle>,
    components: HashMap<BundleId, Vec<BundleComponent>>,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl BundleCatalog for InMemoryCatalogStore {
    fn bundle(&self, id: BundleId) -> InventoryResult<Option<ProductBundle>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned("catalog"))?;
        Ok(state.bundles.get(&id).cloned())
    }

    fn components(&self, id: BundleId) -> InventoryResult<Vec<BundleComponent>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned("catalog"))?;
        Ok(state.components.get(&id).cloned().unwrap_or_default())
    }

    fn recipe(&self, id: RecipeId) -> InventoryResult<Option<Recipe>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned("catalog"))?;
        Ok(state.recipes.get(&id).cloned())
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned("catalog"))?;
        if state.recipes.contains_key(&recipe.id) {
            return Err(StoreError::AlreadyExists(format!("recipe {}", recipe.id)));
        }
        state.recipes.insert(recipe.id, recipe);
        Ok(())
    }

    fn set_recipe_active(&self, id: RecipeId, active: bool) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned("catalog"))?;
        let recipe = state
            .recipes
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("recipe {id}")))?;
        recipe.active = active;
        Ok(())
    }

    fn list_recipes(&self, store_id: StoreId) -> Result<Vec<Recipe>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::poisoned("catalog"))?;
        Ok(state
            .recipes
            .values()
            .filter(|r| r.store_id == store_id)
            .cloned()
            .collect())
    }

    fn insert_bundle(&self, bundle: ProductBundle) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned("catalog"))?;
        if state.bundles.contains_key(&bundle.id) {
            return Err(StoreError::AlreadyExists(format!("bundle {}", bundle.id)));
        }
        state.bundles.insert(bundle.id, bundle);
        Ok(())
    }

    fn set_bundle_active(&self, id: BundleId, active: bool) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned("catalog"))?;
        let bundle = state
            .bundles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("bundle {id}")))?;
        bundle.active = active;
        Ok(())
    }

    fn add_component(&self, component: BundleComponent) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned("catalog"))?;
        if !state.bundles.contains_key(&component.bundle_id) {
            return Err(StoreError::NotFound(format!("bundle {}", component.bundle_id)));
        }
        state.components.entry(component.bundle_id).or_default().push(component);
        Ok(())
    }
}
