//! End-to-end tests over the in-memory store, bus, and lifecycle engine.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use rentloop_auth::{Principal, Role};
use rentloop_core::UserId;
use rentloop_events::{EventBus, EventEnvelope, JsonEnvelopeBus, Subscription};
use rentloop_inventory::{Availability, ClothingItem, ClothingItemId};
use rentloop_notifications::InMemoryNotificationFeed;
use rentloop_rentals::{Rental, RentalId, RentalStatus};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::InMemoryEventStore;
use crate::lifecycle::RentalLifecycle;
use crate::notifier::relay_envelope;
use crate::payments::{PaymentConfirmation, PaymentProcessor, PaymentStatus};
use crate::projections::{CatalogProjection, RentalsProjection};
use crate::read_model::InMemoryReadModelStore;

type Envelope = EventEnvelope<JsonValue>;
type Bus = Arc<JsonEnvelopeBus>;
type Lifecycle = RentalLifecycle<Arc<InMemoryEventStore>, Bus>;

fn setup() -> (Arc<Lifecycle>, Bus) {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(JsonEnvelopeBus::new());
    let dispatcher = CommandDispatcher::new(store, Arc::clone(&bus));
    (Arc::new(RentalLifecycle::new(dispatcher)), bus)
}

fn store_principal() -> Principal {
    Principal {
        user_id: UserId::new(),
        role: Role::Store,
    }
}

fn customer_principal() -> Principal {
    Principal {
        user_id: UserId::new(),
        role: Role::Customer,
    }
}

fn listed_item(lifecycle: &Lifecycle, owner: &Principal, stock: i64) -> ClothingItemId {
    lifecycle
        .list_item(owner, "Velvet blazer".to_string(), 100_00, 500_00, stock)
        .unwrap()
}

fn requested_rental(
    lifecycle: &Lifecycle,
    customer: &Principal,
    item_id: ClothingItemId,
) -> RentalId {
    let start = Utc::now().date_naive() + Duration::days(7);
    let end = start + Duration::days(2);
    lifecycle
        .request_rental(customer, item_id, start, end)
        .unwrap()
}

fn item_stock(lifecycle: &Lifecycle, item_id: ClothingItemId) -> i64 {
    lifecycle
        .dispatcher()
        .load::<ClothingItem>(item_id.0, |id| ClothingItem::empty(ClothingItemId::new(id)))
        .unwrap()
        .stock()
}

fn rental_status(lifecycle: &Lifecycle, rental_id: RentalId) -> RentalStatus {
    lifecycle
        .dispatcher()
        .load::<Rental>(rental_id.0, |id| Rental::empty(RentalId::new(id)))
        .unwrap()
        .status()
}

fn drain(sub: &Subscription<Envelope>) -> Vec<Envelope> {
    let mut out = Vec::new();
    while let Ok(env) = sub.try_recv() {
        out.push(env);
    }
    out
}

#[test]
fn full_lifecycle_restores_stock() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let customer = customer_principal();

    let item_id = listed_item(&lifecycle, &owner, 5);
    let rental_id = requested_rental(&lifecycle, &customer, item_id);
    assert_eq!(item_stock(&lifecycle, item_id), 5);

    lifecycle.approve(&owner, rental_id).unwrap();
    assert_eq!(item_stock(&lifecycle, item_id), 4);
    assert_eq!(rental_status(&lifecycle, rental_id), RentalStatus::Approved);

    lifecycle.mark_returned(&customer, rental_id).unwrap();
    assert_eq!(item_stock(&lifecycle, item_id), 4);

    lifecycle.confirm_return(&owner, rental_id).unwrap();
    assert_eq!(item_stock(&lifecycle, item_id), 5);
    assert_eq!(
        rental_status(&lifecycle, rental_id),
        RentalStatus::ReturnedConfirmed
    );
}

#[test]
fn quoted_price_uses_inclusive_days() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let customer = customer_principal();

    let item_id = listed_item(&lifecycle, &owner, 1);
    let start = Utc::now().date_naive() + Duration::days(1);
    // Three inclusive days at 100.00/day.
    let rental_id = lifecycle
        .request_rental(&customer, item_id, start, start + Duration::days(2))
        .unwrap();

    let rental = lifecycle
        .dispatcher()
        .load::<Rental>(rental_id.0, |id| Rental::empty(RentalId::new(id)))
        .unwrap();
    assert_eq!(rental.total_price(), 300_00);
}

#[test]
fn concurrent_approvals_of_last_unit_yield_one_winner() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();

    let item_id = listed_item(&lifecycle, &owner, 1);
    let rental_a = requested_rental(&lifecycle, &customer_principal(), item_id);
    let rental_b = requested_rental(&lifecycle, &customer_principal(), item_id);

    let handles: Vec<_> = [rental_a, rental_b]
        .into_iter()
        .map(|rental_id| {
            let lifecycle = Arc::clone(&lifecycle);
            let owner = owner.clone();
            thread::spawn(move || lifecycle.approve(&owner, rental_id))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one approval must win the last unit");
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(DispatchError::OutOfStock))),
        "the loser must see OutOfStock"
    );
    assert_eq!(item_stock(&lifecycle, item_id), 0);
}

#[test]
fn reject_leaves_stock_untouched() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let customer = customer_principal();

    let item_id = listed_item(&lifecycle, &owner, 3);
    let rental_id = requested_rental(&lifecycle, &customer, item_id);

    lifecycle.reject(&owner, rental_id).unwrap();
    assert_eq!(item_stock(&lifecycle, item_id), 3);
    assert_eq!(rental_status(&lifecycle, rental_id), RentalStatus::Rejected);
}

#[test]
fn approve_after_approve_neither_burns_stock_nor_changes_status() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();

    let item_id = listed_item(&lifecycle, &owner, 2);
    let rental_id = requested_rental(&lifecycle, &customer_principal(), item_id);

    lifecycle.approve(&owner, rental_id).unwrap();
    let err = lifecycle.approve(&owner, rental_id).unwrap_err();
    assert!(matches!(err, DispatchError::InvalidTransition(_)));
    assert_eq!(item_stock(&lifecycle, item_id), 1);
}

#[test]
fn role_and_ownership_gates() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let other_store = store_principal();
    let customer = customer_principal();

    let item_id = listed_item(&lifecycle, &owner, 1);
    let rental_id = requested_rental(&lifecycle, &customer, item_id);

    // Wrong role.
    assert!(matches!(
        lifecycle.approve(&customer, rental_id),
        Err(DispatchError::Forbidden)
    ));
    assert!(matches!(
        lifecycle.mark_returned(&owner, rental_id),
        Err(DispatchError::Forbidden)
    ));

    // Right role, wrong owner: indistinguishable from missing.
    assert!(matches!(
        lifecycle.approve(&other_store, rental_id),
        Err(DispatchError::NotFound)
    ));
    assert!(matches!(
        lifecycle.mark_returned(&customer_principal(), rental_id),
        Err(DispatchError::NotFound)
    ));

    // Stores cannot request rentals, customers cannot list items.
    assert!(matches!(
        lifecycle.request_rental(
            &owner,
            item_id,
            Utc::now().date_naive() + Duration::days(1),
            Utc::now().date_naive() + Duration::days(2),
        ),
        Err(DispatchError::Forbidden)
    ));
    assert!(matches!(
        lifecycle.list_item(&customer, "Dress".to_string(), 10_00, 0, 1),
        Err(DispatchError::Forbidden)
    ));
}

#[test]
fn request_for_missing_item_is_not_found() {
    let (lifecycle, _bus) = setup();
    let customer = customer_principal();

    let err = lifecycle
        .request_rental(
            &customer,
            ClothingItemId::new(rentloop_core::AggregateId::new()),
            Utc::now().date_naive() + Duration::days(1),
            Utc::now().date_naive() + Duration::days(2),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound));
}

#[test]
fn request_against_empty_stock_is_out_of_stock() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let item_id = listed_item(&lifecycle, &owner, 0);

    let err = lifecycle
        .request_rental(
            &customer_principal(),
            item_id,
            Utc::now().date_naive() + Duration::days(1),
            Utc::now().date_naive() + Duration::days(2),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::OutOfStock));
}

#[test]
fn backdated_request_is_rejected() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let customer = customer_principal();
    let item_id = listed_item(&lifecycle, &owner, 1);

    let err = lifecycle
        .request_rental(
            &customer,
            item_id,
            Utc::now().date_naive() - Duration::days(1),
            Utc::now().date_naive() + Duration::days(1),
        )
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidDateRange(_)));
}

#[test]
fn projections_follow_the_bus() {
    let (lifecycle, bus) = setup();
    let sub = bus.subscribe();

    let owner = store_principal();
    let customer = customer_principal();
    let item_id = listed_item(&lifecycle, &owner, 2);
    let rental_id = requested_rental(&lifecycle, &customer, item_id);
    lifecycle.approve(&owner, rental_id).unwrap();

    let rentals = RentalsProjection::new(InMemoryReadModelStore::new());
    let catalog = CatalogProjection::new(InMemoryReadModelStore::new());
    for envelope in drain(&sub) {
        rentals.apply_envelope(&envelope).unwrap();
        catalog.apply_envelope(&envelope).unwrap();
    }

    let mine = rentals.list_by_customer(customer.user_id);
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].rental_id, rental_id);
    assert_eq!(mine[0].status, RentalStatus::Approved);
    assert_eq!(mine[0].total_price, 300_00);

    let incoming = rentals.list_by_store(owner.user_id);
    assert_eq!(incoming.len(), 1);

    let row = catalog.get(&item_id).unwrap();
    assert_eq!(row.stock, 1);
    assert_eq!(row.availability, Availability::Available);
}

#[test]
fn projection_replay_is_idempotent() {
    let (lifecycle, bus) = setup();
    let sub = bus.subscribe();

    let owner = store_principal();
    let item_id = listed_item(&lifecycle, &owner, 3);
    let rental_id = requested_rental(&lifecycle, &customer_principal(), item_id);
    lifecycle.approve(&owner, rental_id).unwrap();

    let catalog = CatalogProjection::new(InMemoryReadModelStore::new());
    let envelopes = drain(&sub);
    for envelope in &envelopes {
        catalog.apply_envelope(envelope).unwrap();
    }
    // At-least-once delivery: a full redelivery must not move stock again.
    for envelope in &envelopes {
        catalog.apply_envelope(envelope).unwrap();
    }

    assert_eq!(catalog.get(&item_id).unwrap().stock, 2);
}

#[test]
fn notification_relay_addresses_the_counterparty() {
    let (lifecycle, bus) = setup();
    let sub = bus.subscribe();
    let feed = InMemoryNotificationFeed::new();

    let owner = store_principal();
    let customer = customer_principal();
    let item_id = listed_item(&lifecycle, &owner, 1);
    let rental_id = requested_rental(&lifecycle, &customer, item_id);
    lifecycle.approve(&owner, rental_id).unwrap();

    for envelope in drain(&sub) {
        relay_envelope(&envelope, &feed).unwrap();
    }

    let store_feed = feed.list(owner.user_id).unwrap();
    assert_eq!(store_feed.len(), 1);
    assert!(store_feed[0].message().contains("new rental request"));

    let customer_feed = feed.list(customer.user_id).unwrap();
    assert_eq!(customer_feed.len(), 1);
    assert!(customer_feed[0].message().contains("approved"));
}

#[test]
fn completed_payment_settles_the_rental() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let customer = customer_principal();
    let item_id = listed_item(&lifecycle, &owner, 1);
    let rental_id = requested_rental(&lifecycle, &customer, item_id);

    let feed = Arc::new(InMemoryNotificationFeed::new());
    let processor = PaymentProcessor::new(Arc::clone(&lifecycle), feed.clone());

    processor
        .process(&PaymentConfirmation {
            rental_id,
            status: PaymentStatus::Complete,
        })
        .unwrap();

    assert_eq!(rental_status(&lifecycle, rental_id), RentalStatus::Approved);
    assert_eq!(item_stock(&lifecycle, item_id), 0);

    let store_feed = feed.list(owner.user_id).unwrap();
    assert!(store_feed.iter().any(|n| n.message().contains("Payment")));

    // Gateway retries must not double-reserve.
    processor
        .process(&PaymentConfirmation {
            rental_id,
            status: PaymentStatus::Complete,
        })
        .unwrap();
    assert_eq!(item_stock(&lifecycle, item_id), 0);
}

#[test]
fn failed_payment_is_acknowledged_without_side_effects() {
    let (lifecycle, _bus) = setup();
    let owner = store_principal();
    let item_id = listed_item(&lifecycle, &owner, 1);
    let rental_id = requested_rental(&lifecycle, &customer_principal(), item_id);

    let feed = Arc::new(InMemoryNotificationFeed::new());
    let processor = PaymentProcessor::new(Arc::clone(&lifecycle), feed);

    processor
        .process(&PaymentConfirmation {
            rental_id,
            status: PaymentStatus::Failed,
        })
        .unwrap();

    assert_eq!(rental_status(&lifecycle, rental_id), RentalStatus::Pending);
    assert_eq!(item_stock(&lifecycle, item_id), 1);
}

#[test]
fn pinned_availability_survives_the_lifecycle() {
    let (lifecycle, bus) = setup();
    let sub = bus.subscribe();

    let owner = store_principal();
    let item_id = listed_item(&lifecycle, &owner, 2);
    lifecycle
        .set_availability(&owner, item_id, Availability::Rented)
        .unwrap();

    let rental_id = requested_rental(&lifecycle, &customer_principal(), item_id);
    lifecycle.approve(&owner, rental_id).unwrap();

    let catalog = CatalogProjection::new(InMemoryReadModelStore::new());
    for envelope in drain(&sub) {
        catalog.apply_envelope(&envelope).unwrap();
    }

    // Stock moved, but the manual pin still wins.
    let row = catalog.get(&item_id).unwrap();
    assert_eq!(row.stock, 1);
    assert_eq!(row.availability, Availability::Rented);
}
