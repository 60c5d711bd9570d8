//! `InventoryEngine`: the surface the checkout and void flows call.
//!
//! Every operation returns structured results; nothing panics or throws across
//! this boundary. Events go out on the injected bus only after the ledger
//! commit succeeded, and a failed publish never undoes a sale.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{error, info, warn};

use rust_decimal::Decimal;

use stockflow_core::{DomainError, DomainResult, InventoryStockId, Quantity, ReferenceId, StoreId};
use stockflow_events::{EventBus, EventEnvelope};
use stockflow_inventory::{
    AvailabilityCheck, DeductionFailure, InventoryDeductionResult, InventoryError, InventoryEvent,
    InventoryMovement, InventoryResult, InventoryStockItem, LineItemKind, LowStock, ReversalSummary,
    SaleCommitted, SaleLineItem, SaleVoided, StockLevelChanged, all_sufficient,
};

use crate::availability::{AvailabilityChecker, evaluate, resolve_requirements};
use crate::config::EngineConfig;
use crate::executor::{DeductionExecutor, DeductionOutcome};
use crate::ledger::FractionalStockLedger;
use crate::planner::plan_requirements;
use crate::resolver::ConversionResolver;
use crate::reversal::MovementReversal;
use crate::store::{CatalogStore, LedgerStore, MappingStore};

#[derive(Debug)]
pub struct InventoryEngine<S, M, C, B> {
    ledger: FractionalStockLedger<S>,
    resolver: ConversionResolver<M>,
    catalog: C,
    bus: B,
    config: EngineConfig,
    sequence: AtomicU64,
}

impl<S, M, C, B> InventoryEngine<S, M, C, B>
where
    S: LedgerStore,
    M: MappingStore,
    C: CatalogStore,
    B: EventBus<EventEnvelope<InventoryEvent>>,
{
    pub fn new(ledger_store: S, mapping_store: M, catalog: C, bus: B, config: EngineConfig) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            ledger: FractionalStockLedger::new(ledger_store, config.fractional_precision, config.lock_timeout),
            resolver: ConversionResolver::new(mapping_store),
            catalog,
            bus,
            config,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn ledger(&self) -> &FractionalStockLedger<S> {
        &self.ledger
    }

    pub fn resolver(&self) -> &ConversionResolver<M> {
        &self.resolver
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Checkout preview: one entry per ingredient requirement. Not a reservation.
    pub fn check_availability(
        &self,
        store_id: StoreId,
        line_items: &[SaleLineItem],
    ) -> Result<Vec<AvailabilityCheck>, DeductionFailure> {
        let run = || -> InventoryResult<Vec<AvailabilityCheck>> {
            let requirements = plan_requirements(&self.catalog, store_id, line_items)?;
            AvailabilityChecker::new(&self.resolver, &self.ledger).check_all(store_id, &requirements)
        };
        run().map_err(|e| self.failed("check_availability", None, store_id, e.into()))
    }

    /// Deduct everything one completed sale consumed, or nothing.
    ///
    /// `reference_id` must be the sale's own transaction id; it binds the
    /// movements written here so [`Self::void_sale`] can find them.
    pub fn commit_sale(
        &self,
        reference_id: ReferenceId,
        store_id: StoreId,
        line_items: &[SaleLineItem],
    ) -> Result<Vec<InventoryDeductionResult>, DeductionFailure> {
        let run = || -> InventoryResult<DeductionOutcome> {
            let requirements = plan_requirements(&self.catalog, store_id, line_items)?;
            DeductionExecutor::new(&self.resolver, &self.ledger).deduct(reference_id, store_id, &requirements)
        };
        let outcome = run().map_err(|e| self.failed("commit_sale", Some(reference_id), store_id, e.into()))?;

        let now = Utc::now();
        self.publish(
            store_id,
            Some(reference_id),
            InventoryEvent::SaleCommitted(SaleCommitted {
                reference_id,
                store_id,
                deductions: outcome.results.clone(),
                occurred_at: now,
            }),
        );
        self.publish_stock_changes(store_id, reference_id, &outcome.movements, &outcome.items);

        Ok(outcome.results)
    }

    /// Reverse every outstanding movement of `reference_id`. Voiding twice
    /// reports zero the second time.
    pub fn void_sale(&self, reference_id: ReferenceId) -> Result<ReversalSummary, DeductionFailure> {
        let outcome = MovementReversal::new(&self.ledger).reverse(reference_id).map_err(|e| {
            let failure = DeductionFailure::from(e);
            self.log_failure("void_sale", Some(reference_id), None, &failure);
            failure
        })?;

        if let Some(store_id) = outcome.movements.first().map(|m| m.store_id) {
            self.publish(
                store_id,
                Some(reference_id),
                InventoryEvent::SaleVoided(SaleVoided {
                    reference_id,
                    store_id,
                    movements_reversed: outcome.summary.movements_reversed,
                    occurred_at: Utc::now(),
                }),
            );
            self.publish_stock_changes(store_id, reference_id, &outcome.movements, &outcome.items);
        }

        Ok(outcome.summary)
    }

    /// Largest whole quantity of one recipe or bundle current stock supports.
    /// Zero when any ingredient is unmapped or its stock item is unusable, and
    /// for lines that consume no tracked stock.
    pub fn max_makeable(&self, store_id: StoreId, kind: LineItemKind) -> Result<i64, DeductionFailure> {
        let run = || -> InventoryResult<i64> {
            let unit = [SaleLineItem { kind, quantity: Quantity::ONE }];
            let requirements = plan_requirements(&self.catalog, store_id, &unit)?;
            let resolved = resolve_requirements(&self.resolver, store_id, &requirements)?;

            // Per stock item: unrounded demand for one unit and how many
            // requirements feed it.
            let mut per_unit: HashMap<InventoryStockId, (Quantity, i64)> = HashMap::new();
            for entry in &resolved {
                let Some(mapping) = &entry.mapping else {
                    return Ok(0);
                };
                let needed = mapping.to_stock_units(entry.requirement.quantity)?;
                let slot = per_unit
                    .entry(mapping.inventory_stock_id())
                    .or_insert((Quantity::ZERO, 0));
                slot.0 = slot
                    .0
                    .checked_add(needed)
                    .ok_or_else(|| DomainError::validation("stock demand overflow"))?;
                slot.1 += 1;
            }

            let tracked_unit = Quantity::from_decimal(Decimal::new(1, self.ledger.precision()));
            let mut best: Option<i64> = None;
            for (stock_id, (demand, entries)) in per_unit {
                if !demand.is_positive() {
                    continue;
                }
                let item = match self.ledger.item(stock_id) {
                    Ok(item) if item.is_active() && item.store_id() == store_id => item,
                    Ok(_) | Err(InventoryError::UnknownStockItem(_)) => return Ok(0),
                    Err(e) => return Err(e),
                };
                // Each requirement rounds by less than one tracked unit, so this
                // bound is never below the true limit.
                let slack = tracked_unit
                    .checked_mul(Quantity::from_whole(entries))
                    .ok_or_else(|| DomainError::validation("stock demand overflow"))?;
                let bound = item
                    .total()?
                    .checked_add(slack)
                    .and_then(|headroom| headroom.checked_div(demand))
                    .ok_or_else(|| DomainError::validation("makeable quantity overflow"))?
                    .whole()?
                    .max(0);
                best = Some(best.map_or(bound, |b| b.min(bound)));
            }

            // Availability is monotone in the quantity sold: search the bound
            // for the largest quantity the full evaluation accepts.
            let (mut low, mut high) = (0, best.unwrap_or(0));
            while low < high {
                let mid = low + (high - low + 1) / 2;
                if self.fits(store_id, kind, mid)? {
                    low = mid;
                } else {
                    high = mid - 1;
                }
            }
            Ok(low)
        };
        run().map_err(|e| self.failed("max_makeable", None, store_id, e.into()))
    }

    fn fits(&self, store_id: StoreId, kind: LineItemKind, quantity: i64) -> InventoryResult<bool> {
        let line = [SaleLineItem { kind, quantity: Quantity::from_whole(quantity) }];
        let requirements = plan_requirements(&self.catalog, store_id, &line)?;
        let resolved = resolve_requirements(&self.resolver, store_id, &requirements)?;
        let mut view = &self.ledger;
        let evaluated = evaluate(store_id, &resolved, &mut view, self.ledger.precision())?;
        let checks: Vec<AvailabilityCheck> = evaluated.into_iter().map(|e| e.check).collect();
        Ok(all_sufficient(&checks))
    }

    fn failed(
        &self,
        operation: &'static str,
        reference_id: Option<ReferenceId>,
        store_id: StoreId,
        failure: DeductionFailure,
    ) -> DeductionFailure {
        self.log_failure(operation, reference_id, Some(store_id), &failure);
        failure
    }

    fn log_failure(
        &self,
        operation: &'static str,
        reference_id: Option<ReferenceId>,
        store_id: Option<StoreId>,
        failure: &DeductionFailure,
    ) {
        let reference = reference_id.map(|r| r.to_string()).unwrap_or_default();
        let store = store_id.map(|s| s.to_string()).unwrap_or_default();
        match failure {
            DeductionFailure::Rejected { failures } => {
                info!(operation, reference_id = %reference, store_id = %store, short = failures.len(), "rejected");
            }
            DeductionFailure::Invalid(e) => {
                warn!(operation, reference_id = %reference, store_id = %store, code = e.code(), error = %e, "invalid request");
            }
            DeductionFailure::Integrity(e) => {
                error!(operation, reference_id = %reference, store_id = %store, code = e.code(), error = ?e, "integrity failure");
            }
        }
    }

    fn publish_stock_changes(
        &self,
        store_id: StoreId,
        reference_id: ReferenceId,
        movements: &[InventoryMovement],
        items: &[InventoryStockItem],
    ) {
        let now = Utc::now();
        for movement in movements {
            self.publish(
                store_id,
                Some(reference_id),
                InventoryEvent::StockLevelChanged(StockLevelChanged {
                    store_id,
                    inventory_stock_id: movement.inventory_stock_id,
                    reference_id,
                    previous_total: movement.previous_total,
                    new_total: movement.new_total,
                    occurred_at: now,
                }),
            );

            let Some(threshold) = self.config.low_stock_threshold else {
                continue;
            };
            let crossed = movement.new_total < threshold && movement.previous_total >= threshold;
            if !crossed {
                continue;
            }
            let name = items
                .iter()
                .find(|i| i.id_typed() == movement.inventory_stock_id)
                .map(|i| i.name().to_string())
                .unwrap_or_default();
            warn!(
                store_id = %store_id,
                inventory_stock_id = %movement.inventory_stock_id,
                total = %movement.new_total,
                threshold = %threshold,
                "stock below threshold"
            );
            self.publish(
                store_id,
                None,
                InventoryEvent::LowStock(LowStock {
                    store_id,
                    inventory_stock_id: movement.inventory_stock_id,
                    name,
                    total: movement.new_total,
                    threshold,
                    occurred_at: now,
                }),
            );
        }
    }

    fn publish(&self, store_id: StoreId, reference_id: Option<ReferenceId>, event: InventoryEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::wrap(store_id, reference_id, sequence, event);
        let event_type = envelope.event_type().to_string();
        if let Err(e) = self.bus.publish(envelope) {
            warn!(event_type = %event_type, sequence, error = ?e, "event publish failed; state already committed");
        }
    }
}
