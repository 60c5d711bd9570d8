//! Fractional Stock Ledger: the only path that changes stock quantities.
//!
//! Writes happen inside a [`LedgerTxn`]: the transaction holds the item locks,
//! stages new item states and movements in memory, and hands them to the store
//! as one [`LedgerBatch`] on [`LedgerTxn::commit`]. Dropping an uncommitted
//! transaction discards everything it staged.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use stockflow_core::{
    DomainError, ExpectedVersion, InventoryStockId, MovementId, Quantity, ReferenceId, StoreId,
};
use stockflow_inventory::{
    InventoryError, InventoryMovement, InventoryResult, InventoryStockItem, StockSnapshot,
};

use crate::locks::{LockGuard, LockTable};
use crate::store::{LedgerBatch, LedgerStore};

#[derive(Debug)]
pub struct FractionalStockLedger<S> {
    store: S,
    locks: LockTable,
    precision: u32,
    lock_timeout: Duration,
}

impl<S> FractionalStockLedger<S>
where
    S: LedgerStore,
{
    pub fn new(store: S, precision: u32, lock_timeout: Duration) -> Self {
        Self {
            store,
            locks: LockTable::new(),
            precision,
            lock_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn item(&self, id: InventoryStockId) -> InventoryResult<InventoryStockItem> {
        self.store
            .get_item(id)?
            .ok_or(InventoryError::UnknownStockItem(id))
    }

    /// Current total in stock units. Takes no lock; may be stale by the time
    /// the caller acts on it.
    pub fn peek(&self, id: InventoryStockId) -> InventoryResult<Quantity> {
        Ok(self.item(id)?.total()?)
    }

    pub fn list_items(&self, store_id: StoreId) -> InventoryResult<Vec<InventoryStockItem>> {
        Ok(self.store.list_items(store_id)?)
    }

    pub fn movements_for(&self, reference_id: ReferenceId) -> InventoryResult<Vec<InventoryMovement>> {
        Ok(self.store.movements_for(reference_id)?)
    }

    /// Receive a new stock item, rounding its opening total to ledger precision.
    pub fn insert_item(&self, item: InventoryStockItem) -> InventoryResult<InventoryStockItem> {
        let total = item.total()?;
        if total.rounded(self.precision) != total {
            return Err(DomainError::validation(format!(
                "opening stock {total} has more than {} decimal places",
                self.precision
            ))
            .into());
        }
        self.store.insert_item(item.clone())?;
        debug!(inventory_stock_id = %item.id_typed(), store_id = %item.store_id(), total = %total, "stock item received");
        Ok(item)
    }

    /// Soft-deactivate under the item lock so no sale is mid-flight on it.
    pub fn deactivate_item(&self, id: InventoryStockId) -> InventoryResult<InventoryStockItem> {
        let _guard = self.locks.acquire(&[id], self.lock_timeout)?;
        let current = self.item(id)?;
        let next = current.deactivated();
        self.store.commit(LedgerBatch {
            items: vec![(next.clone(), ExpectedVersion::Exact(current.version()))],
            ..LedgerBatch::default()
        })?;
        debug!(inventory_stock_id = %id, "stock item deactivated");
        Ok(next)
    }

    /// Lock `ids` and open a transaction over them.
    pub fn begin(&self, ids: &[InventoryStockId]) -> InventoryResult<LedgerTxn<'_, S>> {
        let guard = self.locks.acquire(ids, self.lock_timeout)?;
        Ok(LedgerTxn {
            ledger: self,
            guard,
            staged: HashMap::new(),
            order: Vec::new(),
            movements: Vec::new(),
            reversed: Vec::new(),
            claim_reference: None,
            committed: false,
        })
    }

    /// Apply one signed delta outside a sale (stock receiving, manual counts).
    /// No movement is recorded; sale-related changes go through a transaction.
    pub fn apply(&self, id: InventoryStockId, delta: Quantity) -> InventoryResult<StockSnapshot> {
        let mut txn = self.begin(&[id])?;
        let snapshot = txn.apply(id, delta)?;
        txn.commit()?;
        Ok(snapshot)
    }
}

#[derive(Debug)]
struct Staged {
    item: InventoryStockItem,
    read_version: u64,
}

/// Locked, staged unit of work over a fixed set of stock items.
#[derive(Debug)]
pub struct LedgerTxn<'a, S: LedgerStore> {
    ledger: &'a FractionalStockLedger<S>,
    guard: LockGuard<'a>,
    staged: HashMap<InventoryStockId, Staged>,
    order: Vec<InventoryStockId>,
    movements: Vec<InventoryMovement>,
    reversed: Vec<MovementId>,
    claim_reference: Option<ReferenceId>,
    committed: bool,
}

impl<S> LedgerTxn<'_, S>
where
    S: LedgerStore,
{
    /// Whether this transaction holds the lock for `id`.
    pub fn covers(&self, id: InventoryStockId) -> bool {
        self.guard.covers(id)
    }

    /// Staged view of an item; `None` if the store has no such item.
    pub fn item(&mut self, id: InventoryStockId) -> InventoryResult<Option<&InventoryStockItem>> {
        if !self.guard.covers(id) {
            return Err(DomainError::invariant(format!(
                "stock item {id} is not locked by this transaction"
            ))
            .into());
        }
        if !self.staged.contains_key(&id) {
            let Some(item) = self.ledger.store.get_item(id)? else {
                return Ok(None);
            };
            let read_version = item.version();
            self.staged.insert(id, Staged { item, read_version });
            self.order.push(id);
        }
        Ok(self.staged.get(&id).map(|s| &s.item))
    }

    /// Staged total in stock units.
    pub fn peek(&mut self, id: InventoryStockId) -> InventoryResult<Quantity> {
        Ok(self
            .item(id)?
            .map(InventoryStockItem::total)
            .ok_or(InventoryError::UnknownStockItem(id))??)
    }

    /// Recombine `delta` into the staged item. Fails with `NegativeStockResult`
    /// rather than clamping; the caller must then drop the transaction.
    pub fn apply(&mut self, id: InventoryStockId, delta: Quantity) -> InventoryResult<StockSnapshot> {
        let precision = self.ledger.precision;
        self.item(id)?.ok_or(InventoryError::UnknownStockItem(id))?;
        let staged = self
            .staged
            .get_mut(&id)
            .ok_or(InventoryError::UnknownStockItem(id))?;

        let (next, snapshot) = staged.item.apply_delta(delta, precision)?;
        staged.item = next;
        debug!(
            inventory_stock_id = %id,
            delta = %snapshot.delta,
            previous_total = %snapshot.previous_total,
            new_total = %snapshot.new_total,
            "ledger applied"
        );
        Ok(snapshot)
    }

    pub fn record(&mut self, movement: InventoryMovement) {
        self.movements.push(movement);
    }

    pub fn mark_reversed(&mut self, movement_id: MovementId) {
        self.reversed.push(movement_id);
    }

    /// Make the commit fail if `reference_id` already has outstanding deductions.
    pub fn claim_reference(&mut self, reference_id: ReferenceId) {
        self.claim_reference = Some(reference_id);
    }

    /// Write everything staged in one batch. Returns the changed items.
    pub fn commit(mut self) -> InventoryResult<Vec<InventoryStockItem>> {
        let changed: Vec<InventoryStockItem> = self
            .order
            .iter()
            .filter_map(|id| self.staged.get(id))
            .filter(|s| s.item.version() != s.read_version)
            .map(|s| s.item.clone())
            .collect();

        let items = changed
            .iter()
            .filter_map(|item| {
                self.staged
                    .get(&item.id_typed())
                    .map(|s| (item.clone(), ExpectedVersion::Exact(s.read_version)))
            })
            .collect();

        let batch = LedgerBatch {
            items,
            movements: std::mem::take(&mut self.movements),
            reversed: std::mem::take(&mut self.reversed),
            claim_reference: self.claim_reference,
        };

        self.ledger.store.commit(batch)?;
        self.committed = true;
        Ok(changed)
    }
}

impl<S: LedgerStore> Drop for LedgerTxn<'_, S> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let dirty = self.staged.values().any(|s| s.item.version() != s.read_version)
            || !self.movements.is_empty();
        if dirty {
            warn!(items = self.staged.len(), "ledger transaction rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stockflow_core::DEFAULT_PRECISION;

    use crate::store::InMemoryLedgerStore;

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    fn ledger() -> FractionalStockLedger<Arc<InMemoryLedgerStore>> {
        FractionalStockLedger::new(InMemoryLedgerStore::arc(), DEFAULT_PRECISION, Duration::from_millis(100))
    }

    fn receive(ledger: &FractionalStockLedger<Arc<InMemoryLedgerStore>>, total: &str) -> InventoryStockId {
        let item = InventoryStockItem::new(
            InventoryStockId::new(),
            StoreId::new(),
            "Milk",
            "liters",
            q(total),
            DEFAULT_PRECISION,
        )
        .unwrap();
        ledger.insert_item(item).unwrap().id_typed()
    }

    #[test]
    fn apply_recombines_and_persists() {
        let ledger = ledger();
        let id = receive(&ledger, "10");

        let snapshot = ledger.apply(id, q("-1.5")).unwrap();
        assert_eq!(snapshot.new_total, q("8.5"));

        let item = ledger.item(id).unwrap();
        assert_eq!(item.stock_quantity(), 8);
        assert_eq!(item.fractional_stock(), q("0.5"));
        assert_eq!(ledger.peek(id).unwrap(), q("8.5"));
    }

    #[test]
    fn dropped_transaction_changes_nothing() {
        let ledger = ledger();
        let a = receive(&ledger, "5");
        let b = receive(&ledger, "1");

        {
            let mut txn = ledger.begin(&[a, b]).unwrap();
            txn.apply(a, q("-2")).unwrap();
            let err = txn.apply(b, q("-2")).unwrap_err();
            assert!(matches!(err, InventoryError::NegativeStockResult { .. }));
        }

        assert_eq!(ledger.peek(a).unwrap(), q("5"));
        assert_eq!(ledger.peek(b).unwrap(), q("1"));
    }

    #[test]
    fn transaction_sees_its_own_writes() {
        let ledger = ledger();
        let a = receive(&ledger, "3");

        let mut txn = ledger.begin(&[a]).unwrap();
        txn.apply(a, q("-1.25")).unwrap();
        assert_eq!(txn.peek(a).unwrap(), q("1.75"));
        assert_eq!(ledger.peek(a).unwrap(), q("3"), "uncommitted");
        let changed = txn.commit().unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(ledger.peek(a).unwrap(), q("1.75"));
    }

    #[test]
    fn unlocked_items_are_refused() {
        let ledger = ledger();
        let a = receive(&ledger, "3");
        let b = receive(&ledger, "3");

        let mut txn = ledger.begin(&[a]).unwrap();
        assert!(txn.apply(b, q("-1")).is_err());
    }

    #[test]
    fn deactivation_keeps_the_row() {
        let ledger = ledger();
        let a = receive(&ledger, "3");
        let item = ledger.deactivate_item(a).unwrap();
        assert!(!item.is_active());
        assert_eq!(ledger.peek(a).unwrap(), q("3"));
    }

    #[test]
    fn over_precise_opening_stock_is_rejected() {
        let ledger = ledger();
        let item = InventoryStockItem::new(
            InventoryStockId::new(),
            StoreId::new(),
            "Salt",
            "kg",
            q("1.5"),
            8,
        )
        .unwrap();
        let coarse = FractionalStockLedger::new(InMemoryLedgerStore::arc(), 0, Duration::from_millis(10));
        assert!(coarse.insert_item(item.clone()).is_err());
        assert!(ledger.insert_item(item).is_ok());
    }
}
