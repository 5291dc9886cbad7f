use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use rentloop_core::{AggregateId, UserId};
use rentloop_events::EventEnvelope;
use rentloop_inventory::ClothingItemId;
use rentloop_rentals::{RentalEvent, RentalId, RentalStatus};

use crate::read_model::ReadModelStore;

/// Queryable rental read model: one row per rental request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalReadModel {
    pub rental_id: RentalId,
    pub customer_id: UserId,
    pub store_id: UserId,
    pub item_id: ClothingItemId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: u64,
    pub status: RentalStatus,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RentalsProjectionError {
    #[error("failed to deserialize rental event: {0}")]
    Deserialize(String),

    #[error("transition event for unknown rental {0}")]
    UnknownRental(RentalId),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Rentals projection.
///
/// Consumes published envelopes (JSON payloads) and maintains the rental
/// listing read model. Disposable and rebuildable from the event stream.
#[derive(Debug)]
pub struct RentalsProjection<S>
where
    S: ReadModelStore<RentalId, RentalReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> RentalsProjection<S>
where
    S: ReadModelStore<RentalId, RentalReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, rental_id: &RentalId) -> Option<RentalReadModel> {
        self.store.get(rental_id)
    }

    /// Rentals requested by one customer, newest first.
    pub fn list_by_customer(&self, customer_id: UserId) -> Vec<RentalReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|r| r.customer_id == customer_id)
            .collect();
        rows.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        rows
    }

    /// Incoming rentals for one store's items, newest first.
    pub fn list_by_store(&self, store_id: UserId) -> Vec<RentalReadModel> {
        let mut rows: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|r| r.store_id == store_id)
            .collect();
        rows.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        rows
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces monotonic sequence per aggregate stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), RentalsProjectionError> {
        if envelope.aggregate_type() != "rentals.rental" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        // Cursors and rows are rebuildable from the event stream, so a
        // poisoned lock is recovered rather than silently dropping the event.
        let mut cursors = match self.cursors.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let last = *cursors.get(&aggregate_id).unwrap_or(&0);

        if seq == 0 {
            return Err(RentalsProjectionError::NonMonotonicSequence { last, found: seq });
        }

        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }

        if seq != last + 1 && last != 0 {
            return Err(RentalsProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: RentalEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| RentalsProjectionError::Deserialize(e.to_string()))?;

        match event {
            RentalEvent::RentalRequested(e) => {
                self.store.upsert(
                    e.rental_id,
                    RentalReadModel {
                        rental_id: e.rental_id,
                        customer_id: e.customer_id,
                        store_id: e.store_id,
                        item_id: e.item_id,
                        start_date: e.start_date,
                        end_date: e.end_date,
                        total_price: e.total_price,
                        status: RentalStatus::Pending,
                        requested_at: e.occurred_at,
                    },
                );
            }
            RentalEvent::RentalApproved(e) => {
                self.set_status(e.rental_id, RentalStatus::Approved)?;
            }
            RentalEvent::RentalRejected(e) => {
                self.set_status(e.rental_id, RentalStatus::Rejected)?;
            }
            RentalEvent::ReturnReported(e) => {
                self.set_status(e.rental_id, RentalStatus::ReturnedPending)?;
            }
            RentalEvent::ReturnConfirmed(e) => {
                self.set_status(e.rental_id, RentalStatus::ReturnedConfirmed)?;
            }
        }

        // Advance cursor after successful apply.
        cursors.insert(aggregate_id, seq);

        Ok(())
    }

    fn set_status(
        &self,
        rental_id: RentalId,
        status: RentalStatus,
    ) -> Result<(), RentalsProjectionError> {
        let mut row = self
            .store
            .get(&rental_id)
            .ok_or(RentalsProjectionError::UnknownRental(rental_id))?;
        row.status = status;
        self.store.upsert(rental_id, row);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), RentalsProjectionError> {
        match self.cursors.write() {
            Ok(mut cursors) => cursors.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.store.clear();

        // Deterministic replay order: aggregate, then sequence.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Utc;
    use uuid::Uuid;

    use rentloop_rentals::RentalRequested;

    use super::*;
    use crate::read_model::InMemoryReadModelStore;

    fn requested_envelope(rental_id: RentalId, seq: u64) -> EventEnvelope<JsonValue> {
        let start = "2030-05-01".parse().unwrap();
        let event = RentalEvent::RentalRequested(RentalRequested {
            rental_id,
            customer_id: UserId::new(),
            store_id: UserId::new(),
            item_id: ClothingItemId::new(AggregateId::new()),
            start_date: start,
            end_date: "2030-05-03".parse().unwrap(),
            total_price: 300_00,
            occurred_at: Utc::now(),
        });
        EventEnvelope::new(
            Uuid::now_v7(),
            rental_id.0,
            "rentals.rental",
            seq,
            serde_json::to_value(&event).unwrap(),
        )
    }

    #[test]
    fn poisoned_cursor_lock_does_not_drop_events() {
        let projection = Arc::new(RentalsProjection::new(Arc::new(
            InMemoryReadModelStore::new(),
        )));

        let poisoner = Arc::clone(&projection);
        let _ = thread::spawn(move || {
            let _guard = poisoner.cursors.write().unwrap();
            panic!("poison the cursor lock");
        })
        .join();

        let rental_id = RentalId::new(AggregateId::new());
        projection
            .apply_envelope(&requested_envelope(rental_id, 1))
            .unwrap();

        let row = projection.get(&rental_id).unwrap();
        assert_eq!(row.status, RentalStatus::Pending);

        // The cursor advanced too: a replay of the same envelope is ignored.
        projection
            .apply_envelope(&requested_envelope(rental_id, 1))
            .unwrap();
    }
}
