//! Facts the engine publishes once a stock change is durable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{InventoryStockId, Quantity, ReferenceId, StoreId};
use stockflow_events::Event;

use crate::outcome::InventoryDeductionResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCommitted {
    pub reference_id: ReferenceId,
    pub store_id: StoreId,
    pub deductions: Vec<InventoryDeductionResult>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleVoided {
    pub reference_id: ReferenceId,
    pub store_id: StoreId,
    pub movements_reversed: usize,
    pub occurred_at: DateTime<Utc>,
}

/// One item's total moved. Emitted per touched item, after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevelChanged {
    pub store_id: StoreId,
    pub inventory_stock_id: InventoryStockId,
    pub reference_id: ReferenceId,
    pub previous_total: Quantity,
    pub new_total: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// An item crossed below the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStock {
    pub store_id: StoreId,
    pub inventory_stock_id: InventoryStockId,
    pub name: String,
    pub total: Quantity,
    pub threshold: Quantity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    SaleCommitted(SaleCommitted),
    SaleVoided(SaleVoided),
    StockLevelChanged(StockLevelChanged),
    LowStock(LowStock),
}

impl InventoryEvent {
    pub fn store_id(&self) -> StoreId {
        match self {
            InventoryEvent::SaleCommitted(e) => e.store_id,
            InventoryEvent::SaleVoided(e) => e.store_id,
            InventoryEvent::StockLevelChanged(e) => e.store_id,
            InventoryEvent::LowStock(e) => e.store_id,
        }
    }

    pub fn reference_id(&self) -> Option<ReferenceId> {
        match self {
            InventoryEvent::SaleCommitted(e) => Some(e.reference_id),
            InventoryEvent::SaleVoided(e) => Some(e.reference_id),
            InventoryEvent::StockLevelChanged(e) => Some(e.reference_id),
            InventoryEvent::LowStock(_) => None,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::SaleCommitted(_) => "inventory.sale.committed",
            InventoryEvent::SaleVoided(_) => "inventory.sale.voided",
            InventoryEvent::StockLevelChanged(_) => "inventory.stock.level_changed",
            InventoryEvent::LowStock(_) => "inventory.stock.low",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::SaleCommitted(e) => e.occurred_at,
            InventoryEvent::SaleVoided(e) => e.occurred_at,
            InventoryEvent::StockLevelChanged(e) => e.occurred_at,
            InventoryEvent::LowStock(e) => e.occurred_at,
        }
    }
}
