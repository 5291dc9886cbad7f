use std::sync::Arc;

use rentloop_events::{EventEnvelope, JsonEnvelopeBus};
use rentloop_infra::{
    CommandDispatcher, PaymentProcessor, RentalLifecycle,
    event_store::InMemoryEventStore,
    notifier::spawn_rental_notifier,
    projections::{CatalogProjection, CatalogReadModel, RentalReadModel, RentalsProjection},
    read_model::InMemoryReadModelStore,
    workers::{ProjectionWorker, WorkerHandle},
};
use rentloop_inventory::ClothingItemId;
use rentloop_notifications::InMemoryNotificationFeed;
use rentloop_rentals::RentalId;

type Bus = Arc<JsonEnvelopeBus>;
type Lifecycle = RentalLifecycle<Arc<InMemoryEventStore>, Bus>;
type RentalsProj = RentalsProjection<Arc<InMemoryReadModelStore<RentalId, RentalReadModel>>>;
type CatalogProj = CatalogProjection<Arc<InMemoryReadModelStore<ClothingItemId, CatalogReadModel>>>;

/// Shared application services behind the HTTP handlers.
pub struct AppServices {
    lifecycle: Arc<Lifecycle>,
    payments: PaymentProcessor<Arc<InMemoryEventStore>, Bus>,
    rentals_projection: Arc<RentalsProj>,
    catalog_projection: Arc<CatalogProj>,
    feed: Arc<InMemoryNotificationFeed>,
    // Keep worker handles alive for the lifetime of the process.
    _workers: Vec<WorkerHandle>,
}

/// In-memory infra wiring: store + bus + lifecycle + projections + relay.
pub fn build_services() -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(JsonEnvelopeBus::new());

    let lifecycle = Arc::new(RentalLifecycle::new(CommandDispatcher::new(
        Arc::clone(&store),
        Arc::clone(&bus),
    )));

    let rentals_projection: Arc<RentalsProj> =
        Arc::new(RentalsProjection::new(Arc::new(InMemoryReadModelStore::new())));
    let catalog_projection: Arc<CatalogProj> =
        Arc::new(CatalogProjection::new(Arc::new(InMemoryReadModelStore::new())));

    let feed = Arc::new(InMemoryNotificationFeed::new());

    // Background subscribers: bus -> projections, bus -> notification feed.
    let mut workers = Vec::new();
    {
        let rentals_projection = Arc::clone(&rentals_projection);
        let catalog_projection = Arc::clone(&catalog_projection);
        workers.push(ProjectionWorker::spawn(
            "projections",
            Arc::clone(&bus),
            move |envelope: EventEnvelope<serde_json::Value>| {
                rentals_projection
                    .apply_envelope(&envelope)
                    .map_err(|e| e.to_string())?;
                catalog_projection
                    .apply_envelope(&envelope)
                    .map_err(|e| e.to_string())
            },
        ));
    }
    workers.push(spawn_rental_notifier(
        Arc::clone(&bus),
        Arc::clone(&feed) as Arc<dyn rentloop_notifications::NotificationDispatcher>,
    ));

    let payments = PaymentProcessor::new(
        Arc::clone(&lifecycle),
        Arc::clone(&feed) as Arc<dyn rentloop_notifications::NotificationDispatcher>,
    );

    AppServices {
        lifecycle,
        payments,
        rentals_projection,
        catalog_projection,
        feed,
        _workers: workers,
    }
}

impl AppServices {
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn payments(&self) -> &PaymentProcessor<Arc<InMemoryEventStore>, Bus> {
        &self.payments
    }

    pub fn feed(&self) -> &InMemoryNotificationFeed {
        &self.feed
    }

    pub fn rentals(&self) -> &RentalsProj {
        &self.rentals_projection
    }

    pub fn catalog(&self) -> &CatalogProj {
        &self.catalog_projection
    }
}
