use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rentloop_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use rentloop_events::Event;
use rentloop_inventory::ClothingItemId;

use crate::transitions::{RentalAction, next_status};

/// Rental identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentalId(pub AggregateId);

impl RentalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RentalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Rental status lifecycle.
///
/// Directed, acyclic; `Rejected` and `ReturnedConfirmed` are terminal. See
/// `transitions` for the one authoritative table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Pending,
    Approved,
    Rejected,
    Rented,
    ReturnedPending,
    ReturnedConfirmed,
}

impl core::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Approved => "approved",
            RentalStatus::Rejected => "rejected",
            RentalStatus::Rented => "rented",
            RentalStatus::ReturnedPending => "returned_pending",
            RentalStatus::ReturnedConfirmed => "returned_confirmed",
        };
        f.write_str(s)
    }
}

/// Aggregate root: Rental.
///
/// A rental request is owned by the marketplace, references its customer,
/// store, and item, and is never physically deleted — the status is the
/// record of outcome. Total price is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rental {
    id: RentalId,
    customer_id: Option<UserId>,
    store_id: Option<UserId>,
    item_id: Option<ClothingItemId>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    total_price: u64,
    status: RentalStatus,
    requested_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Rental {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RentalId) -> Self {
        Self {
            id,
            customer_id: None,
            store_id: None,
            item_id: None,
            start_date: None,
            end_date: None,
            total_price: 0,
            status: RentalStatus::Pending,
            requested_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RentalId {
        self.id
    }

    pub fn customer_id(&self) -> Option<UserId> {
        self.customer_id
    }

    pub fn store_id(&self) -> Option<UserId> {
        self.store_id
    }

    pub fn item_id(&self) -> Option<ClothingItemId> {
        self.item_id
    }

    pub fn status(&self) -> RentalStatus {
        self.status
    }

    pub fn total_price(&self) -> u64 {
        self.total_price
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Rental {
    type Id = RentalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RequestRental (customer submits a rental request).
///
/// `total_price` is computed by the caller via the pricing calculator and is
/// immutable afterwards; `store_id` is the item owner's id at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRental {
    pub rental_id: RentalId,
    pub customer_id: UserId,
    pub store_id: UserId,
    pub item_id: ClothingItemId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveRental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRental {
    pub rental_id: RentalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectRental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRental {
    pub rental_id: RentalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkReturned (customer reports the garment returned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReturned {
    pub rental_id: RentalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmReturn (store confirms receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmReturn {
    pub rental_id: RentalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalCommand {
    RequestRental(RequestRental),
    ApproveRental(ApproveRental),
    RejectRental(RejectRental),
    MarkReturned(MarkReturned),
    ConfirmReturn(ConfirmReturn),
}

/// Event: RentalRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalRequested {
    pub rental_id: RentalId,
    pub customer_id: UserId,
    pub store_id: UserId,
    pub item_id: ClothingItemId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalApproved.
///
/// Transition events carry the parties and the item so downstream consumers
/// (read models, the notification relay) can address the counterparty without
/// loading the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalApproved {
    pub rental_id: RentalId,
    pub customer_id: UserId,
    pub store_id: UserId,
    pub item_id: ClothingItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalRejected {
    pub rental_id: RentalId,
    pub customer_id: UserId,
    pub store_id: UserId,
    pub item_id: ClothingItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnReported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnReported {
    pub rental_id: RentalId,
    pub customer_id: UserId,
    pub store_id: UserId,
    pub item_id: ClothingItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnConfirmed {
    pub rental_id: RentalId,
    pub customer_id: UserId,
    pub store_id: UserId,
    pub item_id: ClothingItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalEvent {
    RentalRequested(RentalRequested),
    RentalApproved(RentalApproved),
    RentalRejected(RentalRejected),
    ReturnReported(ReturnReported),
    ReturnConfirmed(ReturnConfirmed),
}

impl Event for RentalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RentalEvent::RentalRequested(_) => "rentals.rental.requested",
            RentalEvent::RentalApproved(_) => "rentals.rental.approved",
            RentalEvent::RentalRejected(_) => "rentals.rental.rejected",
            RentalEvent::ReturnReported(_) => "rentals.rental.return_reported",
            RentalEvent::ReturnConfirmed(_) => "rentals.rental.return_confirmed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RentalEvent::RentalRequested(e) => e.occurred_at,
            RentalEvent::RentalApproved(e) => e.occurred_at,
            RentalEvent::RentalRejected(e) => e.occurred_at,
            RentalEvent::ReturnReported(e) => e.occurred_at,
            RentalEvent::ReturnConfirmed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Rental {
    type Command = RentalCommand;
    type Event = RentalEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RentalEvent::RentalRequested(e) => {
                self.id = e.rental_id;
                self.customer_id = Some(e.customer_id);
                self.store_id = Some(e.store_id);
                self.item_id = Some(e.item_id);
                self.start_date = Some(e.start_date);
                self.end_date = Some(e.end_date);
                self.total_price = e.total_price;
                self.status = RentalStatus::Pending;
                self.requested_at = Some(e.occurred_at);
                self.created = true;
            }
            RentalEvent::RentalApproved(_) => {
                self.status = RentalStatus::Approved;
            }
            RentalEvent::RentalRejected(_) => {
                self.status = RentalStatus::Rejected;
            }
            RentalEvent::ReturnReported(_) => {
                self.status = RentalStatus::ReturnedPending;
            }
            RentalEvent::ReturnConfirmed(_) => {
                self.status = RentalStatus::ReturnedConfirmed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RentalCommand::RequestRental(cmd) => self.handle_request(cmd),
            RentalCommand::ApproveRental(cmd) => {
                self.handle_transition(cmd.rental_id, RentalAction::Approve, cmd.occurred_at)
            }
            RentalCommand::RejectRental(cmd) => {
                self.handle_transition(cmd.rental_id, RentalAction::Reject, cmd.occurred_at)
            }
            RentalCommand::MarkReturned(cmd) => {
                self.handle_transition(cmd.rental_id, RentalAction::MarkReturned, cmd.occurred_at)
            }
            RentalCommand::ConfirmReturn(cmd) => {
                self.handle_transition(cmd.rental_id, RentalAction::ConfirmReturn, cmd.occurred_at)
            }
        }
    }
}

impl Rental {
    fn ensure_rental_id(&self, rental_id: RentalId) -> Result<(), DomainError> {
        if self.id != rental_id {
            return Err(DomainError::validation("rental_id mismatch"));
        }
        Ok(())
    }

    fn handle_request(&self, cmd: &RequestRental) -> Result<Vec<RentalEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("rental already exists"));
        }
        // Date validation proper lives in the pricing calculator; this is the
        // last-line defense against a malformed command.
        if cmd.end_date < cmd.start_date {
            return Err(DomainError::invalid_date_range(
                "end date cannot be before start date",
            ));
        }
        if cmd.customer_id == cmd.store_id {
            return Err(DomainError::validation("customer cannot rent from itself"));
        }

        Ok(vec![RentalEvent::RentalRequested(RentalRequested {
            rental_id: cmd.rental_id,
            customer_id: cmd.customer_id,
            store_id: cmd.store_id,
            item_id: cmd.item_id,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            total_price: cmd.total_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Single fail-closed guarded transition: the event is emitted only when
    /// the transition table allows `(status, action)`; otherwise the rental is
    /// left untouched and a typed error is returned.
    fn handle_transition(
        &self,
        rental_id: RentalId,
        action: RentalAction,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<RentalEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_rental_id(rental_id)?;

        if next_status(self.status, action).is_none() {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} a {} rental",
                self.status
            )));
        }

        let (Some(customer_id), Some(store_id), Some(item_id)) =
            (self.customer_id, self.store_id, self.item_id)
        else {
            return Err(DomainError::validation("rental is missing its parties"));
        };

        let event = match action {
            RentalAction::Approve => RentalEvent::RentalApproved(RentalApproved {
                rental_id,
                customer_id,
                store_id,
                item_id,
                occurred_at,
            }),
            RentalAction::Reject => RentalEvent::RentalRejected(RentalRejected {
                rental_id,
                customer_id,
                store_id,
                item_id,
                occurred_at,
            }),
            RentalAction::MarkReturned => RentalEvent::ReturnReported(ReturnReported {
                rental_id,
                customer_id,
                store_id,
                item_id,
                occurred_at,
            }),
            RentalAction::ConfirmReturn => RentalEvent::ReturnConfirmed(ReturnConfirmed {
                rental_id,
                customer_id,
                store_id,
                item_id,
                occurred_at,
            }),
        };

        Ok(vec![event])
    }
}
