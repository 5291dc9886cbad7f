//! Payment confirmation processing.
//!
//! The payment gateway calls back with the final status of a checkout. A
//! completed payment approves the rental (with the usual stock pairing) and
//! drops a payment notification in the store's feed.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use rentloop_events::{EventBus, EventEnvelope};
use rentloop_notifications::{Notification, NotificationCategory, NotificationDispatcher};
use rentloop_rentals::RentalId;

use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStore;
use crate::lifecycle::RentalLifecycle;

/// Gateway-reported outcome of a checkout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Complete,
    Pending,
    Failed,
}

/// Callback payload from the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub rental_id: RentalId,
    pub status: PaymentStatus,
}

/// Applies payment confirmations to the rental lifecycle.
pub struct PaymentProcessor<S, B> {
    lifecycle: Arc<RentalLifecycle<S, B>>,
    notifications: Arc<dyn NotificationDispatcher>,
}

impl<S, B> PaymentProcessor<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        lifecycle: Arc<RentalLifecycle<S, B>>,
        notifications: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            lifecycle,
            notifications,
        }
    }

    /// Process one gateway confirmation.
    ///
    /// Only `COMPLETE` acts on the rental; `PENDING` and `FAILED` are logged
    /// and acknowledged so the gateway stops retrying. A confirmation for an
    /// already-approved rental is treated as a duplicate delivery, not an
    /// error.
    pub fn process(&self, confirmation: &PaymentConfirmation) -> Result<(), DispatchError> {
        let rental_id = confirmation.rental_id;

        match confirmation.status {
            PaymentStatus::Complete => {}
            status => {
                info!(rental_id = %rental_id, ?status, "ignoring non-complete payment status");
                return Ok(());
            }
        }

        let rental = match self.lifecycle.approve_settled(rental_id) {
            Ok(rental) => rental,
            Err(DispatchError::InvalidTransition(_)) => {
                info!(rental_id = %rental_id, "payment confirmation replayed, rental already settled");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        if let Some(store_id) = rental.store_id() {
            let delivery = self.notifications.dispatch(Notification::new(
                store_id,
                NotificationCategory::Payment,
                "Payment received for a rental of your item.",
                Utc::now(),
            ));
            if let Err(err) = delivery {
                // Notification loss is acceptable; the approval already stuck.
                warn!(rental_id = %rental_id, error = %err, "payment notification failed");
            }
        }

        info!(rental_id = %rental_id, "payment settled and rental approved");
        Ok(())
    }
}
