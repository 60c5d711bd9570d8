//! Inventory domain module: recipe-to-stock conversion rules.
//!
//! This crate contains business rules only, implemented as deterministic domain
//! logic (no IO, no locking, no storage): canonical ingredient keys, the unit
//! converter, fractional stock recombination, bundle expansion and the value
//! objects the engine hands back to its callers.

pub mod bundle;
pub mod error;
pub mod event;
pub mod key;
pub mod mapping;
pub mod movement;
pub mod outcome;
pub mod recipe;
pub mod stock;
pub mod unit;

pub use bundle::{BundleCatalog, BundleComponent, ComponentTarget, ProductBundle, expand};
pub use error::{InventoryError, InventoryResult};
pub use event::{InventoryEvent, LowStock, SaleCommitted, SaleVoided, StockLevelChanged};
pub use key::{MappingKey, canonical_ingredient, canonical_unit};
pub use mapping::ConversionMapping;
pub use movement::{InventoryMovement, MovementKind};
pub use outcome::{
    AvailabilityCheck, CheckFailure, DeductionFailure, InventoryDeductionResult, ReversalSummary,
    all_sufficient,
};
pub use recipe::{
    LineItemKind, Recipe, RecipeIngredient, RecipeIngredientRequirement, SaleLineItem,
};
pub use stock::{InventoryStockItem, StockBreakdown, StockSnapshot};
pub use unit::{ConversionFactor, convert};
