//! Append-only movement records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{Entity, InventoryStockId, MovementId, Quantity, ReferenceId, StoreId};

use crate::stock::StockSnapshot;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Deduction,
    Reversal,
}

/// One signed change to one stock item, tagged with the sale that caused it.
///
/// Movements are never deleted. A void appends a `Reversal` with the inverted
/// delta and flags the original `reversed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub reference_id: ReferenceId,
    pub store_id: StoreId,
    pub inventory_stock_id: InventoryStockId,
    pub kind: MovementKind,
    /// Negative for deductions, positive for reversals.
    pub delta: Quantity,
    pub previous_total: Quantity,
    pub new_total: Quantity,
    pub reversed: bool,
    pub reverses: Option<MovementId>,
    pub recorded_at: DateTime<Utc>,
}

impl InventoryMovement {
    pub fn deduction(
        reference_id: ReferenceId,
        store_id: StoreId,
        inventory_stock_id: InventoryStockId,
        delta: Quantity,
        previous_total: Quantity,
        new_total: Quantity,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            reference_id,
            store_id,
            inventory_stock_id,
            kind: MovementKind::Deduction,
            delta,
            previous_total,
            new_total,
            reversed: false,
            reverses: None,
            recorded_at,
        }
    }

    /// Compensating movement for `self`, built from the ledger snapshot of the
    /// negated delta.
    pub fn reversal(&self, snapshot: &StockSnapshot, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: MovementId::new(),
            reference_id: self.reference_id,
            store_id: self.store_id,
            inventory_stock_id: self.inventory_stock_id,
            kind: MovementKind::Reversal,
            delta: snapshot.delta,
            previous_total: snapshot.previous_total,
            new_total: snapshot.new_total,
            reversed: false,
            reverses: Some(self.id),
            recorded_at,
        }
    }

    /// A deduction that has not been voided yet.
    pub fn is_outstanding(&self) -> bool {
        self.kind == MovementKind::Deduction && !self.reversed
    }
}

impl Entity for InventoryMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
