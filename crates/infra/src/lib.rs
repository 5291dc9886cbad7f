//! Infrastructure layer: event store, dispatch, lifecycle engine, workers.

pub mod command_dispatcher;
pub mod event_store;
pub mod lifecycle;
pub mod locks;
pub mod notifier;
pub mod payments;
pub mod projections;
pub mod read_model;
pub mod workers;

#[cfg(test)]
mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use lifecycle::RentalLifecycle;
pub use locks::ItemLockRegistry;
pub use notifier::spawn_rental_notifier;
pub use payments::{PaymentConfirmation, PaymentProcessor, PaymentStatus};
