//! Notification relay: rental events → counterparty feed messages.
//!
//! Runs as a bus worker, fully decoupled from the command path. A failed or
//! slow delivery never blocks the lifecycle operation that produced the
//! event; failures are logged and dropped.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use rentloop_core::UserId;
use rentloop_events::{EventBus, EventEnvelope};
use rentloop_notifications::{Notification, NotificationCategory, NotificationDispatcher};
use rentloop_rentals::RentalEvent;

use crate::workers::{ProjectionWorker, WorkerHandle};

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("failed to deserialize rental event: {0}")]
    Deserialize(String),

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// The party to notify and the message, for one rental event.
///
/// Each transition notifies the side that did not act: the store hears about
/// requests and reported returns, the customer hears about decisions.
pub fn counterparty_message(event: &RentalEvent) -> (UserId, String) {
    match event {
        RentalEvent::RentalRequested(e) => (
            e.store_id,
            "You have a new rental request.".to_string(),
        ),
        RentalEvent::RentalApproved(e) => (
            e.customer_id,
            "Your rental request has been approved.".to_string(),
        ),
        RentalEvent::RentalRejected(e) => (
            e.customer_id,
            "Your rental request has been rejected.".to_string(),
        ),
        RentalEvent::ReturnReported(e) => (
            e.store_id,
            "A renter has marked their rental as returned.".to_string(),
        ),
        RentalEvent::ReturnConfirmed(e) => (
            e.customer_id,
            "Your rental return has been confirmed.".to_string(),
        ),
    }
}

/// Relay one published envelope into the feed. Ignores non-rental streams.
pub fn relay_envelope(
    envelope: &EventEnvelope<JsonValue>,
    dispatcher: &dyn NotificationDispatcher,
) -> Result<(), NotifierError> {
    if envelope.aggregate_type() != "rentals.rental" {
        return Ok(());
    }

    let event: RentalEvent = serde_json::from_value(envelope.payload().clone())
        .map_err(|e| NotifierError::Deserialize(e.to_string()))?;

    let (recipient, message) = counterparty_message(&event);
    let occurred_at = rentloop_events::Event::occurred_at(&event);

    dispatcher
        .dispatch(Notification::new(
            recipient,
            NotificationCategory::Rental,
            message,
            occurred_at,
        ))
        .map_err(|e| NotifierError::Delivery(e.to_string()))
}

/// Spawn the relay worker on a bus subscription.
pub fn spawn_rental_notifier<B>(
    bus: B,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> WorkerHandle
where
    B: EventBus<EventEnvelope<JsonValue>> + Send + Sync + 'static,
{
    ProjectionWorker::spawn("rental-notifier", bus, move |envelope| {
        relay_envelope(&envelope, dispatcher.as_ref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rentloop_core::AggregateId;
    use rentloop_inventory::ClothingItemId;
    use rentloop_rentals::{RentalApproved, RentalId, RentalRequested};

    fn ids() -> (RentalId, UserId, UserId, ClothingItemId) {
        (
            RentalId::new(AggregateId::new()),
            UserId::new(),
            UserId::new(),
            ClothingItemId::new(AggregateId::new()),
        )
    }

    #[test]
    fn requested_notifies_the_store() {
        let (rental_id, customer_id, store_id, item_id) = ids();
        let event = RentalEvent::RentalRequested(RentalRequested {
            rental_id,
            customer_id,
            store_id,
            item_id,
            start_date: "2030-01-01".parse().unwrap(),
            end_date: "2030-01-02".parse().unwrap(),
            total_price: 200_00,
            occurred_at: Utc::now(),
        });

        let (recipient, message) = counterparty_message(&event);
        assert_eq!(recipient, store_id);
        assert!(message.contains("new rental request"));
    }

    #[test]
    fn approved_notifies_the_customer() {
        let (rental_id, customer_id, store_id, item_id) = ids();
        let event = RentalEvent::RentalApproved(RentalApproved {
            rental_id,
            customer_id,
            store_id,
            item_id,
            occurred_at: Utc::now(),
        });

        let (recipient, message) = counterparty_message(&event);
        assert_eq!(recipient, customer_id);
        assert!(message.contains("approved"));
    }

    #[test]
    fn non_rental_streams_are_ignored() {
        use rentloop_notifications::InMemoryNotificationFeed;

        let feed = InMemoryNotificationFeed::new();
        let envelope = EventEnvelope::new(
            uuid::Uuid::now_v7(),
            AggregateId::new(),
            "inventory.item",
            1,
            serde_json::json!({"unrelated": true}),
        );

        relay_envelope(&envelope, &feed).unwrap();
    }
}
