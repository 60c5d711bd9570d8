//! Storage abstractions for the engine and their in-memory backends.
//!
//! Each store is a trait (so a database backend can be swapped in) plus an
//! `InMemory*` implementation used by tests, benchmarks and embedded deployments.

pub mod catalog_store;
pub mod ledger_store;
pub mod mapping_store;

pub use catalog_store::{CatalogStore, InMemoryCatalogStore};
pub use ledger_store::{InMemoryLedgerStore, LedgerBatch, LedgerStore};
pub use mapping_store::{InMemoryMappingStore, MappingStore};

use thiserror::Error;

use stockflow_core::{DomainError, ExpectedVersion, ReferenceId};
use stockflow_inventory::InventoryError;

/// Backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("version conflict on {what}: expected {expected:?}, found {actual}")]
    Conflict {
        what: String,
        expected: ExpectedVersion,
        actual: u64,
    },
    #[error("reference {0} already has outstanding deductions")]
    ReferenceInUse(ReferenceId),
    #[error("store isolation violation: {0}")]
    StoreIsolation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub(crate) fn poisoned(what: &str) -> Self {
        StoreError::Storage(format!("{what} lock poisoned"))
    }
}

impl From<StoreError> for InventoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::ReferenceInUse(reference_id) => InventoryError::DuplicateReference(reference_id),
            StoreError::Conflict { .. } => InventoryError::Domain(DomainError::conflict(value.to_string())),
            StoreError::AlreadyExists(what) => InventoryError::Domain(DomainError::conflict(format!(
                "already exists: {what}"
            ))),
            other => InventoryError::storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_reuse_maps_to_duplicate_reference() {
        let reference = ReferenceId::generate();
        let err = InventoryError::from(StoreError::ReferenceInUse(reference));
        assert_eq!(err, InventoryError::DuplicateReference(reference));
        assert!(!err.is_integrity_failure());
    }

    #[test]
    fn version_conflicts_are_integrity_failures() {
        let err = InventoryError::from(StoreError::Conflict {
            what: "item".into(),
            expected: ExpectedVersion::Exact(1),
            actual: 2,
        });
        assert!(err.is_integrity_failure());
        assert_eq!(err.code(), "conflict");
    }
}
