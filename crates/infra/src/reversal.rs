//! Movement Reversal: void every outstanding deduction of one reference.

use chrono::Utc;
use tracing::{debug, info};

use stockflow_core::{DomainError, InventoryStockId, ReferenceId};
use stockflow_inventory::{InventoryMovement, InventoryResult, InventoryStockItem, ReversalSummary};

use crate::ledger::{FractionalStockLedger, LedgerTxn};
use crate::store::LedgerStore;

/// How often the lock set is re-taken when a reference's movements change
/// between the unlocked read and the locked re-read.
const MAX_LOCK_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct ReversalOutcome {
    pub summary: ReversalSummary,
    /// The compensating movements appended.
    pub movements: Vec<InventoryMovement>,
    pub items: Vec<InventoryStockItem>,
}

#[derive(Debug)]
pub struct MovementReversal<'a, S> {
    ledger: &'a FractionalStockLedger<S>,
}

impl<'a, S> MovementReversal<'a, S>
where
    S: LedgerStore,
{
    pub fn new(ledger: &'a FractionalStockLedger<S>) -> Self {
        Self { ledger }
    }

    /// Append a negated movement for each outstanding deduction and flag the
    /// originals reversed. A reference with nothing outstanding reports zero.
    pub fn reverse(&self, reference_id: ReferenceId) -> InventoryResult<ReversalOutcome> {
        let mut outstanding = self.outstanding(reference_id)?;
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            if outstanding.is_empty() {
                debug!(reference_id = %reference_id, "nothing to reverse");
                return Ok(Self::nothing(reference_id));
            }

            let ids: Vec<InventoryStockId> = outstanding.iter().map(|m| m.inventory_stock_id).collect();
            let txn = self.ledger.begin(&ids)?;

            // Re-read under the locks: a concurrent void may have won, or the
            // reference may have been voided and sold again on other items.
            outstanding = self.outstanding(reference_id)?;
            if outstanding.iter().all(|m| txn.covers(m.inventory_stock_id)) {
                return self.reverse_locked(reference_id, txn, &outstanding);
            }
            debug!(reference_id = %reference_id, attempt, "movements moved to unlocked items, retrying");
        }

        Err(DomainError::conflict(format!(
            "movements for reference {reference_id} kept changing during reversal"
        ))
        .into())
    }

    fn reverse_locked(
        &self,
        reference_id: ReferenceId,
        mut txn: LedgerTxn<'_, S>,
        outstanding: &[InventoryMovement],
    ) -> InventoryResult<ReversalOutcome> {
        if outstanding.is_empty() {
            return Ok(Self::nothing(reference_id));
        }

        let recorded_at = Utc::now();
        let mut movements = Vec::with_capacity(outstanding.len());
        for original in outstanding {
            let snapshot = txn.apply(original.inventory_stock_id, original.delta.negated())?;
            let reversal = original.reversal(&snapshot, recorded_at);
            txn.record(reversal.clone());
            txn.mark_reversed(original.id);
            movements.push(reversal);
        }

        let items = txn.commit()?;
        info!(
            reference_id = %reference_id,
            movements_reversed = outstanding.len(),
            "sale reversed"
        );

        Ok(ReversalOutcome {
            summary: ReversalSummary {
                reference_id,
                movements_reversed: outstanding.len(),
            },
            movements,
            items,
        })
    }

    fn outstanding(&self, reference_id: ReferenceId) -> InventoryResult<Vec<InventoryMovement>> {
        Ok(self
            .ledger
            .movements_for(reference_id)?
            .into_iter()
            .filter(InventoryMovement::is_outstanding)
            .collect())
    }

    fn nothing(reference_id: ReferenceId) -> ReversalOutcome {
        ReversalOutcome {
            summary: ReversalSummary {
                reference_id,
                movements_reversed: 0,
            },
            movements: Vec::new(),
            items: Vec::new(),
        }
    }
}
