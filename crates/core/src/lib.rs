//! `stockflow-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the fixed-point `Quantity`, the domain error model and the
//! optimistic version check shared by every storage backend.

pub mod entity;
pub mod error;
pub mod id;
pub mod quantity;
pub mod value_object;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BundleId, InventoryStockId, MappingId, MovementId, RecipeId, ReferenceId, StoreId};
pub use quantity::{DEFAULT_PRECISION, MAX_PRECISION, Quantity};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
