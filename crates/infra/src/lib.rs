//! Engine layer: storage, locking, the stock ledger and the sale-facing facade.
//!
//! ```text
//! SaleLineItem[] --plan--> requirements --resolve--> mappings
//!      --lock items--> re-check availability --apply--> ledger txn --commit--> store
//!                                                                    \--> event bus
//! ```

pub mod availability;
pub mod config;
pub mod executor;
pub mod ledger;
pub mod locks;
pub mod planner;
pub mod resolver;
pub mod reversal;
pub mod service;
pub mod store;


pub use availability::{AvailabilityChecker, ResolvedRequirement, StockLookup};
pub use config::EngineConfig;
pub use executor::{DeductionExecutor, DeductionOutcome};
pub use ledger::{FractionalStockLedger, LedgerTxn};
pub use locks::{LockGuard, LockTable};
pub use planner::plan_requirements;
pub use resolver::ConversionResolver;
pub use reversal::{MovementReversal, ReversalOutcome};
pub use service::InventoryEngine;
pub use store::{
    CatalogStore, InMemoryCatalogStore, InMemoryLedgerStore, InMemoryMappingStore, LedgerBatch,
    LedgerStore, MappingStore, StoreError,
};
