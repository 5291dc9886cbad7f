//! Rental lifecycle engine.
//!
//! Orchestrates the cross-aggregate operations of the marketplace: every
//! guarded transition runs its role check, its ownership check, and (when the
//! transition moves stock) the paired inventory mutation.
//!
//! ## Stock pairing
//!
//! Approve and confirm-return each touch two streams: the rental and its
//! item. There is no multi-stream transaction, so the engine serializes per
//! item via `ItemLockRegistry` and orders writes stock-first:
//!
//! 1. acquire the item lock
//! 2. append the stock mutation (reserve/release)
//! 3. append the rental transition
//! 4. on step 3 failure, append the inverse stock mutation (compensation)
//!
//! Stock-first means a failure can only leave a compensated (or, in the worst
//! case, conservatively under-counted) stock, never an approved rental
//! without a reserved unit.
//!
//! ## Ownership scoping
//!
//! A rental that does not exist and a rental owned by someone else are the
//! same `NotFound` to the caller; wrong-status on a rental the caller does
//! own is `InvalidTransition`.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{error, info};

use rentloop_auth::{Principal, Role, require_role};
use rentloop_core::{Aggregate, AggregateId, UserId};
use rentloop_events::{EventBus, EventEnvelope};
use rentloop_inventory::{
    Availability, ClothingItem, ClothingItemId, InventoryCommand, ListItem, ReleaseUnit,
    ReserveUnit, Restock, SetAvailability,
};
use rentloop_rentals::{
    ApproveRental, ConfirmReturn, MarkReturned, RejectRental, Rental, RentalAction, RentalCommand,
    RentalId, RentalPeriod, RequestRental, quote, required_role,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::locks::ItemLockRegistry;

const RENTAL_AGGREGATE: &str = "rentals.rental";
const ITEM_AGGREGATE: &str = "inventory.item";

/// Application service for the rental and inventory lifecycle.
pub struct RentalLifecycle<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    locks: ItemLockRegistry,
}

impl<S, B> RentalLifecycle<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(dispatcher: CommandDispatcher<S, B>) -> Self {
        Self {
            dispatcher,
            locks: ItemLockRegistry::new(),
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }

    // ---- inventory operations ----

    /// List a new item for rent. Store accounts only.
    pub fn list_item(
        &self,
        principal: &Principal,
        name: String,
        daily_rate: u64,
        deposit: u64,
        initial_stock: i64,
    ) -> Result<ClothingItemId, DispatchError> {
        require_role(principal, Role::Store).map_err(|_| DispatchError::Forbidden)?;

        let item_id = ClothingItemId::new(AggregateId::new());
        self.dispatcher.dispatch::<ClothingItem>(
            item_id.0,
            ITEM_AGGREGATE,
            InventoryCommand::ListItem(ListItem {
                item_id,
                store_id: principal.user_id,
                name,
                daily_rate,
                deposit,
                initial_stock,
                occurred_at: Utc::now(),
            }),
            |id| ClothingItem::empty(ClothingItemId::new(id)),
        )?;

        info!(item_id = %item_id, "item listed");
        Ok(item_id)
    }

    /// Add rentable units to an owned item.
    pub fn restock(
        &self,
        principal: &Principal,
        item_id: ClothingItemId,
        quantity: i64,
    ) -> Result<(), DispatchError> {
        require_role(principal, Role::Store).map_err(|_| DispatchError::Forbidden)?;
        self.load_owned_item(item_id, principal.user_id)?;

        let guard = self.locks.acquire(item_id.0);
        let _held = guard.lock();

        self.dispatcher.dispatch::<ClothingItem>(
            item_id.0,
            ITEM_AGGREGATE,
            InventoryCommand::Restock(Restock {
                item_id,
                quantity,
                occurred_at: Utc::now(),
            }),
            |id| ClothingItem::empty(ClothingItemId::new(id)),
        )?;
        Ok(())
    }

    /// Pin or unpin an owned item's availability.
    pub fn set_availability(
        &self,
        principal: &Principal,
        item_id: ClothingItemId,
        availability: Availability,
    ) -> Result<(), DispatchError> {
        require_role(principal, Role::Store).map_err(|_| DispatchError::Forbidden)?;
        self.load_owned_item(item_id, principal.user_id)?;

        self.dispatcher.dispatch::<ClothingItem>(
            item_id.0,
            ITEM_AGGREGATE,
            InventoryCommand::SetAvailability(SetAvailability {
                item_id,
                availability,
                occurred_at: Utc::now(),
            }),
            |id| ClothingItem::empty(ClothingItemId::new(id)),
        )?;
        Ok(())
    }

    // ---- rental operations ----

    /// Submit a rental request for an item. Customer accounts only.
    ///
    /// The total price is quoted here from the item's daily rate and the date
    /// range, then fixed on the rental for good. Stock is untouched until the
    /// store approves.
    pub fn request_rental(
        &self,
        principal: &Principal,
        item_id: ClothingItemId,
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
    ) -> Result<RentalId, DispatchError> {
        require_role(principal, Role::Customer).map_err(|_| DispatchError::Forbidden)?;

        let item = self
            .dispatcher
            .load::<ClothingItem>(item_id.0, |id| ClothingItem::empty(ClothingItemId::new(id)))?;
        if !item.exists() {
            return Err(DispatchError::NotFound);
        }
        let Some(store_id) = item.store_id() else {
            return Err(DispatchError::NotFound);
        };

        // Logical pre-check only; the unit is reserved at approval time.
        if item.stock() <= 0 {
            return Err(DispatchError::OutOfStock);
        }

        let now = Utc::now();
        let period = RentalPeriod::new(start_date, end_date, now.date_naive())
            .map_err(DispatchError::from)?;
        let total_price = quote(item.daily_rate(), &period).map_err(DispatchError::from)?;

        let rental_id = RentalId::new(AggregateId::new());
        self.dispatcher.dispatch::<Rental>(
            rental_id.0,
            RENTAL_AGGREGATE,
            RentalCommand::RequestRental(RequestRental {
                rental_id,
                customer_id: principal.user_id,
                store_id,
                item_id,
                start_date: period.start(),
                end_date: period.end(),
                total_price,
                occurred_at: now,
            }),
            |id| Rental::empty(RentalId::new(id)),
        )?;

        info!(rental_id = %rental_id, item_id = %item_id, total_price, "rental requested");
        Ok(rental_id)
    }

    /// Approve a pending rental, reserving one unit of stock.
    pub fn approve(&self, principal: &Principal, rental_id: RentalId) -> Result<(), DispatchError> {
        require_role(principal, required_role(RentalAction::Approve))
            .map_err(|_| DispatchError::Forbidden)?;
        let rental = self.load_owned_rental_for_store(rental_id, principal.user_id)?;
        self.approve_with_stock(&rental, rental_id)
    }

    /// Approve a rental on behalf of a settled payment.
    ///
    /// Payment confirmations arrive from the processor, not from a store
    /// session, so the role and ownership gates are skipped; the transition
    /// guard and the stock pairing still apply.
    pub fn approve_settled(&self, rental_id: RentalId) -> Result<Rental, DispatchError> {
        let rental = self
            .dispatcher
            .load::<Rental>(rental_id.0, |id| Rental::empty(RentalId::new(id)))?;
        if !rental.exists() {
            return Err(DispatchError::NotFound);
        }
        self.approve_with_stock(&rental, rental_id)?;
        Ok(rental)
    }

    /// Reject a pending rental. Stock is untouched.
    pub fn reject(&self, principal: &Principal, rental_id: RentalId) -> Result<(), DispatchError> {
        require_role(principal, required_role(RentalAction::Reject))
            .map_err(|_| DispatchError::Forbidden)?;
        self.load_owned_rental_for_store(rental_id, principal.user_id)?;

        self.dispatcher.dispatch::<Rental>(
            rental_id.0,
            RENTAL_AGGREGATE,
            RentalCommand::RejectRental(RejectRental {
                rental_id,
                occurred_at: Utc::now(),
            }),
            |id| Rental::empty(RentalId::new(id)),
        )?;
        Ok(())
    }

    /// Customer reports the garment sent back. Stock is untouched until the
    /// store confirms receipt.
    pub fn mark_returned(
        &self,
        principal: &Principal,
        rental_id: RentalId,
    ) -> Result<(), DispatchError> {
        require_role(principal, required_role(RentalAction::MarkReturned))
            .map_err(|_| DispatchError::Forbidden)?;

        let rental = self
            .dispatcher
            .load::<Rental>(rental_id.0, |id| Rental::empty(RentalId::new(id)))?;
        if !rental.exists() || rental.customer_id() != Some(principal.user_id) {
            return Err(DispatchError::NotFound);
        }

        self.dispatcher.dispatch::<Rental>(
            rental_id.0,
            RENTAL_AGGREGATE,
            RentalCommand::MarkReturned(MarkReturned {
                rental_id,
                occurred_at: Utc::now(),
            }),
            |id| Rental::empty(RentalId::new(id)),
        )?;
        Ok(())
    }

    /// Store confirms receipt of the returned garment, releasing one unit of
    /// stock back into the pool.
    pub fn confirm_return(
        &self,
        principal: &Principal,
        rental_id: RentalId,
    ) -> Result<(), DispatchError> {
        require_role(principal, required_role(RentalAction::ConfirmReturn))
            .map_err(|_| DispatchError::Forbidden)?;
        let rental = self.load_owned_rental_for_store(rental_id, principal.user_id)?;

        let Some(item_id) = rental.item_id() else {
            return Err(DispatchError::NotFound);
        };

        // Fail the transition guard before moving any stock.
        rental
            .handle(&RentalCommand::ConfirmReturn(ConfirmReturn {
                rental_id,
                occurred_at: Utc::now(),
            }))
            .map_err(DispatchError::from)?;

        let guard = self.locks.acquire(item_id.0);
        let _held = guard.lock();

        self.dispatcher.dispatch::<ClothingItem>(
            item_id.0,
            ITEM_AGGREGATE,
            InventoryCommand::ReleaseUnit(ReleaseUnit {
                item_id,
                occurred_at: Utc::now(),
            }),
            |id| ClothingItem::empty(ClothingItemId::new(id)),
        )?;

        let transition = self.dispatcher.dispatch::<Rental>(
            rental_id.0,
            RENTAL_AGGREGATE,
            RentalCommand::ConfirmReturn(ConfirmReturn {
                rental_id,
                occurred_at: Utc::now(),
            }),
            |id| Rental::empty(RentalId::new(id)),
        );

        if let Err(err) = transition {
            self.compensate_stock(
                item_id,
                InventoryCommand::ReserveUnit(ReserveUnit {
                    item_id,
                    occurred_at: Utc::now(),
                }),
            );
            return Err(err);
        }

        Ok(())
    }

    // ---- internals ----

    fn approve_with_stock(
        &self,
        rental: &Rental,
        rental_id: RentalId,
    ) -> Result<(), DispatchError> {
        let Some(item_id) = rental.item_id() else {
            return Err(DispatchError::NotFound);
        };

        // Fail the transition guard before moving any stock: approving an
        // already-approved rental must not burn a unit.
        rental
            .handle(&RentalCommand::ApproveRental(ApproveRental {
                rental_id,
                occurred_at: Utc::now(),
            }))
            .map_err(DispatchError::from)?;

        let guard = self.locks.acquire(item_id.0);
        let _held = guard.lock();

        self.dispatcher.dispatch::<ClothingItem>(
            item_id.0,
            ITEM_AGGREGATE,
            InventoryCommand::ReserveUnit(ReserveUnit {
                item_id,
                occurred_at: Utc::now(),
            }),
            |id| ClothingItem::empty(ClothingItemId::new(id)),
        )?;

        let transition = self.dispatcher.dispatch::<Rental>(
            rental_id.0,
            RENTAL_AGGREGATE,
            RentalCommand::ApproveRental(ApproveRental {
                rental_id,
                occurred_at: Utc::now(),
            }),
            |id| Rental::empty(RentalId::new(id)),
        );

        if let Err(err) = transition {
            self.compensate_stock(
                item_id,
                InventoryCommand::ReleaseUnit(ReleaseUnit {
                    item_id,
                    occurred_at: Utc::now(),
                }),
            );
            return Err(err);
        }

        info!(rental_id = %rental_id, item_id = %item_id, "rental approved");
        Ok(())
    }

    /// Undo a stock mutation after the paired rental append failed.
    ///
    /// A failure here leaves the item under-counted, which only withholds
    /// units; it never over-sells. Surfaced in the log for the operator.
    fn compensate_stock(&self, item_id: ClothingItemId, command: InventoryCommand) {
        let result = self.dispatcher.dispatch::<ClothingItem>(
            item_id.0,
            ITEM_AGGREGATE,
            command,
            |id| ClothingItem::empty(ClothingItemId::new(id)),
        );
        if let Err(err) = result {
            error!(item_id = %item_id, error = ?err, "stock compensation failed");
        }
    }

    fn load_owned_item(
        &self,
        item_id: ClothingItemId,
        owner: UserId,
    ) -> Result<ClothingItem, DispatchError> {
        let item = self
            .dispatcher
            .load::<ClothingItem>(item_id.0, |id| ClothingItem::empty(ClothingItemId::new(id)))?;
        if !item.exists() || item.store_id() != Some(owner) {
            return Err(DispatchError::NotFound);
        }
        Ok(item)
    }

    fn load_owned_rental_for_store(
        &self,
        rental_id: RentalId,
        store_id: UserId,
    ) -> Result<Rental, DispatchError> {
        let rental = self
            .dispatcher
            .load::<Rental>(rental_id.0, |id| Rental::empty(RentalId::new(id)))?;
        if !rental.exists() || rental.store_id() != Some(store_id) {
            return Err(DispatchError::NotFound);
        }
        Ok(rental)
    }
}
