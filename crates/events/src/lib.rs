//! Engine events and the explicit channel they travel on.
//!
//! Consumers (price displays, low-stock dashboards, audit exporters) subscribe to
//! an `EventBus` instance they are handed. There is no process-wide listener set:
//! whoever constructs the engine owns the bus and decides who subscribes.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
