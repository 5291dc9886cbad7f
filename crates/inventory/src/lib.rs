//! `rentloop-inventory` — clothing item aggregate (stock + availability).

pub mod item;

pub use item::{
    Availability, AvailabilityForced, ClothingItem, ClothingItemId, InventoryCommand,
    InventoryEvent, ItemListed, ListItem, ReleaseUnit, ReserveUnit, Restock, Restocked,
    SetAvailability, UnitReleased, UnitReserved,
};
