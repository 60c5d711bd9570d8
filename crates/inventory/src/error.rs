//! Failure taxonomy of the deduction engine.

use thiserror::Error;

use rust_decimal::Decimal;
use stockflow_core::{BundleId, DomainError, InventoryStockId, Quantity, RecipeId, ReferenceId};

use crate::outcome::AvailabilityCheck;

pub type InventoryResult<T> = Result<T, InventoryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// No active mapping exists for the ingredient/unit pair. Never defaulted.
    #[error("no active conversion mapping for ingredient '{ingredient}' ({unit})")]
    UnmappedIngredient { ingredient: String, unit: String },

    /// More than one active mapping shares a canonical key (data integrity).
    #[error("{count} active conversion mappings for ingredient '{ingredient}' ({unit})")]
    AmbiguousMapping {
        ingredient: String,
        unit: String,
        count: usize,
    },

    #[error("conversion factor must be greater than zero, got {0}")]
    InvalidFactor(Decimal),

    #[error("bundle {0} contains itself")]
    CyclicBundle(BundleId),

    #[error("bundle {0} or one of its components is inactive")]
    InactiveBundle(BundleId),

    #[error("unknown bundle {0}")]
    UnknownBundle(BundleId),

    #[error("unknown recipe {0}")]
    UnknownRecipe(RecipeId),

    #[error("recipe {0} is inactive")]
    InactiveRecipe(RecipeId),

    /// Every requirement that blocked the sale, each with its own reason.
    #[error("{} requirement(s) cannot be fulfilled", .failures.len())]
    InsufficientStock { failures: Vec<AvailabilityCheck> },

    /// A committed-path mutation would have driven stock below zero.
    #[error("stock item {item} would go negative ({total} + {delta})")]
    NegativeStockResult {
        item: InventoryStockId,
        total: Quantity,
        delta: Quantity,
    },

    #[error("unknown stock item {0}")]
    UnknownStockItem(InventoryStockId),

    #[error("reference {0} already has unreversed deductions")]
    DuplicateReference(ReferenceId),

    #[error("timed out after {waited_ms} ms waiting for stock item locks")]
    LockTimeout { waited_ms: u64 },

    #[error("storage failure: {0}")]
    Storage(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl InventoryError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            InventoryError::UnmappedIngredient { .. } => "unmapped_ingredient",
            InventoryError::AmbiguousMapping { .. } => "ambiguous_mapping",
            InventoryError::InvalidFactor(_) => "invalid_factor",
            InventoryError::CyclicBundle(_) => "cyclic_bundle",
            InventoryError::InactiveBundle(_) => "inactive_bundle",
            InventoryError::UnknownBundle(_) => "unknown_bundle",
            InventoryError::UnknownRecipe(_) => "unknown_recipe",
            InventoryError::InactiveRecipe(_) => "inactive_recipe",
            InventoryError::InsufficientStock { .. } => "insufficient_stock",
            InventoryError::NegativeStockResult { .. } => "negative_stock_result",
            InventoryError::UnknownStockItem(_) => "unknown_stock_item",
            InventoryError::DuplicateReference(_) => "duplicate_reference",
            InventoryError::LockTimeout { .. } => "lock_timeout",
            InventoryError::Storage(_) => "storage",
            InventoryError::Domain(DomainError::Validation(_)) => "validation",
            InventoryError::Domain(DomainError::InvalidId(_)) => "invalid_id",
            InventoryError::Domain(DomainError::NotFound(_)) => "not_found",
            InventoryError::Domain(DomainError::Conflict(_)) => "conflict",
            InventoryError::Domain(DomainError::InvariantViolation(_)) => "invariant_violation",
        }
    }

    /// Broken preconditions: operators must look at these, cashiers only retry.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            InventoryError::AmbiguousMapping { .. }
                | InventoryError::NegativeStockResult { .. }
                | InventoryError::LockTimeout { .. }
                | InventoryError::Storage(_)
                | InventoryError::Domain(DomainError::Conflict(_))
                | InventoryError::Domain(DomainError::InvariantViolation(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_classification() {
        let negative = InventoryError::NegativeStockResult {
            item: InventoryStockId::new(),
            total: Quantity::from_whole(1),
            delta: Quantity::from_whole(-2),
        };
        assert!(negative.is_integrity_failure());
        assert!(
            InventoryError::AmbiguousMapping {
                ingredient: "milk".into(),
                unit: "ml".into(),
                count: 2
            }
            .is_integrity_failure()
        );
        assert!(
            !InventoryError::UnmappedIngredient {
                ingredient: "milk".into(),
                unit: "ml".into()
            }
            .is_integrity_failure()
        );
        assert!(!InventoryError::InsufficientStock { failures: vec![] }.is_integrity_failure());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(InventoryError::InvalidFactor(Decimal::ZERO).code(), "invalid_factor");
        assert_eq!(
            InventoryError::from(DomainError::validation("x")).code(),
            "validation"
        );
    }
}
