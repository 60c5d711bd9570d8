use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockflow_core::{ReferenceId, StoreId};

use crate::event::Event;

/// Envelope for a published event, carrying store + correlation metadata.
///
/// - `store_id` scopes the event; subscribers for one store filter on it.
/// - `reference_id` is the sale the event belongs to, when there is one.
/// - `sequence_number` increases monotonically per publishing engine, so a
///   subscriber can detect gaps and duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    store_id: StoreId,
    reference_id: Option<ReferenceId>,
    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,
    sequence_number: u64,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, copying its type/version/time metadata.
    pub fn wrap(
        store_id: StoreId,
        reference_id: Option<ReferenceId>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            store_id,
            reference_id,
            event_type: payload.event_type().to_string(),
            event_version: payload.version(),
            occurred_at: payload.occurred_at(),
            sequence_number,
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn reference_id(&self) -> Option<ReferenceId> {
        self.reference_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
