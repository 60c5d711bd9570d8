//! Response value objects handed back across the sale-commit boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockflow_core::{InventoryStockId, Quantity, ReferenceId};

use crate::error::InventoryError;
use crate::recipe::RecipeIngredientRequirement;

/// Why a single requirement cannot be served.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckFailure {
    InsufficientStock,
    UnmappedIngredient,
    InactiveStockItem,
    UnknownStockItem,
}

impl CheckFailure {
    pub fn code(&self) -> &'static str {
        match self {
            CheckFailure::InsufficientStock => "insufficient_stock",
            CheckFailure::UnmappedIngredient => "unmapped_ingredient",
            CheckFailure::InactiveStockItem => "inactive_stock_item",
            CheckFailure::UnknownStockItem => "unknown_stock_item",
        }
    }
}

/// Outcome of checking one requirement against current stock.
///
/// `required_quantity` is in stock units (rounded to ledger precision) and is the
/// cumulative demand on the stock item up to and including this requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub ingredient_name: String,
    pub recipe_unit: String,
    pub recipe_quantity: Quantity,
    pub inventory_stock_id: Option<InventoryStockId>,
    pub stock_unit: Option<String>,
    pub required_quantity: Quantity,
    pub available_quantity: Quantity,
    pub is_sufficient: bool,
    pub failure: Option<CheckFailure>,
}

impl AvailabilityCheck {
    pub fn unresolved(requirement: &RecipeIngredientRequirement, failure: CheckFailure) -> Self {
        Self {
            ingredient_name: requirement.ingredient_name.clone(),
            recipe_unit: requirement.unit.clone(),
            recipe_quantity: requirement.quantity,
            inventory_stock_id: None,
            stock_unit: None,
            required_quantity: Quantity::ZERO,
            available_quantity: Quantity::ZERO,
            is_sufficient: false,
            failure: Some(failure),
        }
    }

    /// Human-readable line for the cashier.
    pub fn describe(&self) -> String {
        let unit = self.stock_unit.as_deref().unwrap_or("");
        match self.failure {
            None => format!(
                "{}: {} {unit} available, {} {unit} required",
                self.ingredient_name, self.available_quantity, self.required_quantity
            ),
            Some(CheckFailure::InsufficientStock) => format!(
                "{}: required {} {unit}, available {} {unit}",
                self.ingredient_name, self.required_quantity, self.available_quantity
            ),
            Some(CheckFailure::UnmappedIngredient) => format!(
                "{}: no inventory mapping for unit '{}'",
                self.ingredient_name, self.recipe_unit
            ),
            Some(CheckFailure::InactiveStockItem) => {
                format!("{}: stock item is inactive", self.ingredient_name)
            }
            Some(CheckFailure::UnknownStockItem) => {
                format!("{}: mapped stock item does not exist", self.ingredient_name)
            }
        }
    }
}

/// The sale-level decision: proceed only if every entry is sufficient.
pub fn all_sufficient(checks: &[AvailabilityCheck]) -> bool {
    checks.iter().all(|c| c.is_sufficient)
}

/// One committed requirement: what was taken and what is left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDeductionResult {
    pub ingredient_name: String,
    pub inventory_stock_id: InventoryStockId,
    pub quantity_deducted: Quantity,
    pub previous_total: Quantity,
    pub remaining_stock_quantity: i64,
    pub remaining_fractional_stock: Quantity,
    pub remaining_total: Quantity,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalSummary {
    pub reference_id: ReferenceId,
    pub movements_reversed: usize,
}

/// Failure surfaced by the sale-facing operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeductionFailure {
    /// Expected, recoverable: every requirement that blocked the sale.
    #[error("sale rejected: {} requirement(s) cannot be fulfilled", .failures.len())]
    Rejected { failures: Vec<AvailabilityCheck> },

    /// The request itself was wrong (bad bundle, unknown recipe, reused reference).
    #[error("invalid request: {0}")]
    Invalid(InventoryError),

    /// A broken precondition; nothing was committed.
    #[error("integrity failure: {0}")]
    Integrity(InventoryError),
}

impl DeductionFailure {
    pub fn code(&self) -> &'static str {
        match self {
            DeductionFailure::Rejected { failures } => failures
                .iter()
                .filter_map(|c| c.failure)
                .find(|f| *f != CheckFailure::InsufficientStock)
                .map_or("insufficient_stock", |f| f.code()),
            DeductionFailure::Invalid(e) | DeductionFailure::Integrity(e) => e.code(),
        }
    }

    /// Text safe to show at the register.
    pub fn user_message(&self) -> String {
        match self {
            DeductionFailure::Rejected { failures } => {
                let lines: Vec<String> = failures.iter().map(AvailabilityCheck::describe).collect();
                format!("This sale cannot be completed:\n{}", lines.join("\n"))
            }
            DeductionFailure::Invalid(e) => e.to_string(),
            DeductionFailure::Integrity(_) => {
                "Inventory could not be updated. Please try again or contact support.".to_string()
            }
        }
    }
}

impl From<InventoryError> for DeductionFailure {
    fn from(value: InventoryError) -> Self {
        match value {
            InventoryError::InsufficientStock { failures } => DeductionFailure::Rejected { failures },
            e if e.is_integrity_failure() => DeductionFailure::Integrity(e),
            e => DeductionFailure::Invalid(e),
        }
    }
}
