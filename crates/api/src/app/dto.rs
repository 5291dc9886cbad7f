//! Request/response DTOs and JSON mapping helpers.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use rentloop_infra::projections::{CatalogReadModel, RentalReadModel};
use rentloop_notifications::Notification;
use rentloop_core::Entity;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    /// Cents per day.
    pub daily_rate: u64,
    /// Cents, refundable.
    #[serde(default)]
    pub deposit: u64,
    pub initial_stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub availability: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRentalRequest {
    pub item_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub fn catalog_item_to_json(item: CatalogReadModel) -> JsonValue {
    json!({
        "id": item.item_id.to_string(),
        "store_id": item.store_id.to_string(),
        "name": item.name,
        "daily_rate": item.daily_rate,
        "deposit": item.deposit,
        "stock": item.stock,
        "availability": availability_str(item.availability),
    })
}

pub fn rental_to_json(rental: RentalReadModel) -> JsonValue {
    json!({
        "id": rental.rental_id.to_string(),
        "customer_id": rental.customer_id.to_string(),
        "store_id": rental.store_id.to_string(),
        "item_id": rental.item_id.to_string(),
        "start_date": rental.start_date,
        "end_date": rental.end_date,
        "total_price": rental.total_price,
        "status": rental.status.to_string(),
        "requested_at": rental.requested_at,
    })
}

pub fn notification_to_json(notification: &Notification) -> JsonValue {
    json!({
        "id": notification.id().to_string(),
        "category": notification.category(),
        "message": notification.message(),
        "read": notification.is_read(),
        "created_at": notification.created_at(),
    })
}

fn availability_str(a: rentloop_inventory::Availability) -> &'static str {
    match a {
        rentloop_inventory::Availability::Available => "available",
        rentloop_inventory::Availability::Unavailable => "unavailable",
        rentloop_inventory::Availability::Rented => "rented",
    }
}

pub fn parse_availability(s: &str) -> Option<rentloop_inventory::Availability> {
    match s.to_ascii_lowercase().as_str() {
        "available" => Some(rentloop_inventory::Availability::Available),
        "unavailable" => Some(rentloop_inventory::Availability::Unavailable),
        "rented" => Some(rentloop_inventory::Availability::Rented),
        _ => None,
    }
}
