use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use rentloop_core::{AggregateId, UserId};
use rentloop_events::EventEnvelope;
use rentloop_inventory::{Availability, ClothingItemId, InventoryEvent};

use crate::read_model::ReadModelStore;

/// Queryable catalog read model: current listing state per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReadModel {
    pub item_id: ClothingItemId,
    pub store_id: UserId,
    pub name: String,
    pub daily_rate: u64,
    pub deposit: u64,
    pub stock: i64,
    pub availability: Availability,
    /// Mirrors the aggregate's manual-override flag so stock changes here
    /// derive availability the same way the aggregate does.
    pinned: bool,
}

impl CatalogReadModel {
    fn recompute_availability(&mut self) {
        if self.pinned {
            return;
        }
        self.availability = if self.stock > 0 {
            Availability::Available
        } else {
            Availability::Unavailable
        };
    }
}

#[derive(Debug, Error)]
pub enum CatalogProjectionError {
    #[error("failed to deserialize inventory event: {0}")]
    Deserialize(String),

    #[error("event for unknown item {0}")]
    UnknownItem(ClothingItemId),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Catalog projection.
///
/// Maintains the browsable item listing from inventory events. Disposable
/// and rebuildable from the event stream.
#[derive(Debug)]
pub struct CatalogProjection<S>
where
    S: ReadModelStore<ClothingItemId, CatalogReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> CatalogProjection<S>
where
    S: ReadModelStore<ClothingItemId, CatalogReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, item_id: &ClothingItemId) -> Option<CatalogReadModel> {
        self.store.get(item_id)
    }

    /// Full catalog, unordered.
    pub fn list(&self) -> Vec<CatalogReadModel> {
        self.store.list()
    }

    /// Items listed by one store.
    pub fn list_by_store(&self, store_id: UserId) -> Vec<CatalogReadModel> {
        self.store
            .list()
            .into_iter()
            .filter(|i| i.store_id == store_id)
            .collect()
    }

    /// Apply a published envelope into the projection.
    ///
    /// Same cursor discipline as the rentals projection: monotonic per
    /// stream, replays ignored.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CatalogProjectionError> {
        if envelope.aggregate_type() != "inventory.item" {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        // Same poison stance as the rentals projection: the read model is
        // rebuildable, so recover the lock instead of dropping the event.
        let mut cursors = match self.cursors.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let last = *cursors.get(&aggregate_id).unwrap_or(&0);

        if seq == 0 {
            return Err(CatalogProjectionError::NonMonotonicSequence { last, found: seq });
        }

        if seq <= last {
            return Ok(());
        }

        if seq != last + 1 && last != 0 {
            return Err(CatalogProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: InventoryEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CatalogProjectionError::Deserialize(e.to_string()))?;

        match event {
            InventoryEvent::ItemListed(e) => {
                let mut row = CatalogReadModel {
                    item_id: e.item_id,
                    store_id: e.store_id,
                    name: e.name,
                    daily_rate: e.daily_rate,
                    deposit: e.deposit,
                    stock: e.initial_stock,
                    availability: Availability::Unavailable,
                    pinned: false,
                };
                row.recompute_availability();
                self.store.upsert(e.item_id, row);
            }
            InventoryEvent::Restocked(e) => {
                self.update(e.item_id, |row| {
                    row.stock += e.quantity;
                    row.recompute_availability();
                })?;
            }
            InventoryEvent::UnitReserved(e) => {
                self.update(e.item_id, |row| {
                    row.stock -= 1;
                    row.recompute_availability();
                })?;
            }
            InventoryEvent::UnitReleased(e) => {
                self.update(e.item_id, |row| {
                    row.stock += 1;
                    row.recompute_availability();
                })?;
            }
            InventoryEvent::AvailabilityForced(e) => {
                self.update(e.item_id, |row| {
                    if e.availability == Availability::Available {
                        row.pinned = false;
                        row.recompute_availability();
                    } else {
                        row.pinned = true;
                        row.availability = e.availability;
                    }
                })?;
            }
        }

        cursors.insert(aggregate_id, seq);

        Ok(())
    }

    fn update(
        &self,
        item_id: ClothingItemId,
        f: impl FnOnce(&mut CatalogReadModel),
    ) -> Result<(), CatalogProjectionError> {
        let mut row = self
            .store
            .get(&item_id)
            .ok_or(CatalogProjectionError::UnknownItem(item_id))?;
        f(&mut row);
        self.store.upsert(item_id, row);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), CatalogProjectionError> {
        match self.cursors.write() {
            Ok(mut cursors) => cursors.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.store.clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
