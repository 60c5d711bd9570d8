//! Per-stock-item exclusive locks.
//!
//! A deduction or void locks every item it touches before re-checking and
//! writing. Ids are sorted and deduplicated first, so two sales sharing items
//! always acquire in the same order and cannot deadlock. Sales on disjoint
//! items never wait on each other.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use stockflow_core::InventoryStockId;
use stockflow_inventory::{InventoryError, InventoryResult};

#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<InventoryStockId>>,
    released: Condvar,
}

/// Releases its items on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    ids: Vec<InventoryStockId>,
}

impl LockGuard<'_> {
    /// Locked ids, sorted.
    pub fn ids(&self) -> &[InventoryStockId] {
        &self.ids
    }

    pub fn covers(&self, id: InventoryStockId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<InventoryStockId>> {
        // The set is only ever mutated by insert/remove; a panic elsewhere
        // cannot leave it half-updated.
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock every id (sorted, deduplicated), waiting at most `timeout` in total.
    pub fn acquire(&self, ids: &[InventoryStockId], timeout: Duration) -> InventoryResult<LockGuard<'_>> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let deadline = Instant::now() + timeout;
        let mut guard = LockGuard {
            table: self,
            ids: Vec::with_capacity(ordered.len()),
        };

        let mut held = self.held();
        for id in ordered {
            while held.contains(&id) {
                let now = Instant::now();
                if now >= deadline {
                    drop(held);
                    // `guard` drops here and releases what was taken so far.
                    return Err(InventoryError::LockTimeout {
                        waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                let (next, _) = self
                    .released
                    .wait_timeout(held, deadline - now)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                held = next;
            }
            held.insert(id);
            guard.ids.push(id);
        }

        Ok(guard)
    }

    /// Currently held ids (diagnostics).
    pub fn held_count(&self) -> usize {
        self.held().len()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let mut held = self.table.held();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.table.released.notify_all();
    }
}
