//! Persistence for stock items and the append-only movement log.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stockflow_core::{Entity, ExpectedVersion, InventoryStockId, MovementId, ReferenceId, StoreId};
use stockflow_inventory::{InventoryMovement, InventoryStockItem};

use super::StoreError;

/// Everything one ledger transaction writes, applied atomically or not at all.
#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    /// New item states, each guarded by the version it was read at.
    pub items: Vec<(InventoryStockItem, ExpectedVersion)>,
    pub movements: Vec<InventoryMovement>,
    /// Deduction movements to flag as reversed.
    pub reversed: Vec<MovementId>,
    /// Fail with `ReferenceInUse` if this reference already owns outstanding deductions.
    pub claim_reference: Option<ReferenceId>,
}

impl LedgerBatch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.movements.is_empty() && self.reversed.is_empty()
    }
}

/// Stock item + movement storage.
///
/// `commit` is the only write path for quantities; backends must apply a batch in
/// one transaction and reject it whole on any version mismatch.
pub trait LedgerStore: Send + Sync {
    fn get_item(&self, id: InventoryStockId) -> Result<Option<InventoryStockItem>, StoreError>;

    /// Receive a new stock item.
    fn insert_item(&self, item: InventoryStockItem) -> Result<(), StoreError>;

    fn list_items(&self, store_id: StoreId) -> Result<Vec<InventoryStockItem>, StoreError>;

    fn commit(&self, batch: LedgerBatch) -> Result<(), StoreError>;

    /// All movements for a reference, in the order they were recorded.
    fn movements_for(&self, reference_id: ReferenceId) -> Result<Vec<InventoryMovement>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn get_item(&self, id: InventoryStockId) -> Result<Option<InventoryStockItem>, StoreError> {
        (**self).get_item(id)
    }

    fn insert_item(&self, item: InventoryStockItem) -> Result<(), StoreError> {
        (**self).insert_item(item)
    }

    fn list_items(&self, store_id: StoreId) -> Result<Vec<InventoryStockItem>, StoreError> {
        (**self).list_items(store_id)
    }

    fn commit(&self, batch: LedgerBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }

    fn movements_for(&self, reference_id: ReferenceId) -> Result<Vec<InventoryMovement>, StoreError> {
        (**self).movements_for(reference_id)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    items: HashMap<InventoryStockId, InventoryStockItem>,
    movements: Vec<InventoryMovement>,
    by_reference: HashMap<ReferenceId, Vec<usize>>,
    by_id: HashMap<MovementId, usize>,
}

/// In-memory ledger for tests/dev. One `RwLock` makes every batch atomic.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of movements ever recorded.
    pub fn movement_count(&self) -> usize {
        self.state.read().map(|s| s.movements.len()).unwrap_or(0)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn get_item(&self, id: InventoryStockId) -> Result<Option<InventoryStockItem>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::poisoned("ledger"))?;
        Ok(state.items.get(&id).cloned())
    }

    fn insert_item(&self, item: InventoryStockItem) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned("ledger"))?;
        let id = *item.id();
        if state.items.contains_key(&id) {
            return Err(StoreError::AlreadyExists(format!("stock item {id}")));
        }
        state.items.insert(id, item);
        Ok(())
    }

    fn list_items(&self, store_id: StoreId) -> Result<Vec<InventoryStockItem>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::poisoned("ledger"))?;
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| item.store_id() == store_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(items)
    }

    fn commit(&self, batch: LedgerBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().map_err(|_| StoreError::poisoned("ledger"))?;

        // Validate the whole batch before touching anything.
        if let Some(reference_id) = batch.claim_reference {
            let outstanding = state
                .by_reference
                .get(&reference_id)
                .into_iter()
                .flatten()
                .any(|&idx| state.movements[idx].is_outstanding());
            if outstanding {
                return Err(StoreError::ReferenceInUse(reference_id));
            }
        }

        for (item, expected) in &batch.items {
            let id = item.id_typed();
            let current = state
                .items
                .get(&id)
                .ok_or_else(|| StoreError::NotFound(format!("stock item {id}")))?;
            if current.store_id() != item.store_id() {
                return Err(StoreError::StoreIsolation(format!(
                    "stock item {id} belongs to another store"
                )));
            }
            if !expected.matches(current.version()) {
                return Err(StoreError::Conflict {
                    what: format!("stock item {id}"),
                    expected: *expected,
                    actual: current.version(),
                });
            }
        }

        for movement_id in &batch.reversed {
            let idx = *state
                .by_id
                .get(movement_id)
                .ok_or_else(|| StoreError::NotFound(format!("movement {movement_id}")))?;
            if !state.movements[idx].is_outstanding() {
                return Err(StoreError::Conflict {
                    what: format!("movement {movement_id}"),
                    expected: ExpectedVersion::Any,
                    actual: 1,
                });
            }
        }

        for movement in &batch.movements {
            if state.by_id.contains_key(&movement.id) {
                return Err(StoreError::AlreadyExists(format!("movement {}", movement.id)));
            }
        }

        // Apply.
        for (item, _) in batch.items {
            state.items.insert(*item.id(), item);
        }
        for movement_id in batch.reversed {
            let idx = state.by_id.get(&movement_id).copied();
            if let Some(idx) = idx {
                state.movements[idx].reversed = true;
            }
        }
        for movement in batch.movements {
            let idx = state.movements.len();
            state.by_id.insert(movement.id, idx);
            state.by_reference.entry(movement.reference_id).or_default().push(idx);
            state.movements.push(movement);
        }

        Ok(())
    }

    fn movements_for(&self, reference_id: ReferenceId) -> Result<Vec<InventoryMovement>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::poisoned("ledger"))?;
        Ok(state
            .by_reference
            .get(&reference_id)
            .into_iter()
            .flatten()
            .map(|&idx| state.movements[idx].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockflow_core::{DEFAULT_PRECISION, Quantity};

    fn item(store: StoreId, name: &str, total: i64) -> InventoryStockItem {
        InventoryStockItem::new(
            InventoryStockId::new(),
            store,
            name,
            "pieces",
            Quantity::from_whole(total),
            DEFAULT_PRECISION,
        )
        .unwrap()
    }

    #[test]
    fn stale_version_rejects_whole_batch() {
        let store = InMemoryLedgerStore::new();
        let shop = StoreId::new();
        let a = item(shop, "a", 10);
        let b = item(shop, "b", 10);
        store.insert_item(a.clone()).unwrap();
        store.insert_item(b.clone()).unwrap();

        let (a2, _) = a.apply_delta(Quantity::from_whole(-1), DEFAULT_PRECISION).unwrap();
        let (b2, _) = b.apply_delta(Quantity::from_whole(-1), DEFAULT_PRECISION).unwrap();

        let err = store
            .commit(LedgerBatch {
                items: vec![(a2, ExpectedVersion::Exact(0)), (b2, ExpectedVersion::Exact(7))],
                ..LedgerBatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.get_item(a.id_typed()).unwrap().unwrap().total().unwrap(), Quantity::from_whole(10));
    }

    #[test]
    fn claimed_reference_cannot_be_reused_while_outstanding() {
        let store = InMemoryLedgerStore::new();
        let shop = StoreId::new();
        let a = item(shop, "a", 10);
        store.insert_item(a.clone()).unwrap();
        let reference = ReferenceId::generate();

        let movement = InventoryMovement::deduction(
            reference,
            shop,
            a.id_typed(),
            Quantity::from_whole(-1),
            Quantity::from_whole(10),
            Quantity::from_whole(9),
            Utc::now(),
        );
        store
            .commit(LedgerBatch {
                movements: vec![movement.clone()],
                claim_reference: Some(reference),
                ..LedgerBatch::default()
            })
            .unwrap();

        let again = InventoryMovement { id: stockflow_core::MovementId::new(), ..movement.clone() };
        let err = store
            .commit(LedgerBatch {
                movements: vec![again],
                claim_reference: Some(reference),
                ..LedgerBatch::default()
            })
            .unwrap_err();
        assert_eq!(err, StoreError::ReferenceInUse(reference));

        store
            .commit(LedgerBatch { reversed: vec![movement.id], ..LedgerBatch::default() })
            .unwrap();
        let log = store.movements_for(reference).unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].reversed);

        // Reversing twice is a conflict at the storage level.
        assert!(store
            .commit(LedgerBatch { reversed: vec![movement.id], ..LedgerBatch::default() })
            .is_err());
    }

    #[test]
    fn list_is_scoped_to_store() {
        let store = InMemoryLedgerStore::new();
        let shop = StoreId::new();
        store.insert_item(item(shop, "b", 1)).unwrap();
        store.insert_item(item(shop, "a", 1)).unwrap();
        store.insert_item(item(StoreId::new(), "c", 1)).unwrap();

        let names: Vec<_> = store
            .list_items(shop)
            .unwrap()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
