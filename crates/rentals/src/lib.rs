//! `rentloop-rentals` — rental aggregate, transition table, pricing.

pub mod pricing;
pub mod rental;
pub mod transitions;

pub use pricing::{RentalPeriod, quote};
pub use rental::{
    ApproveRental, ConfirmReturn, MarkReturned, RejectRental, Rental, RentalApproved,
    RentalCommand, RentalEvent, RentalId, RentalRejected, RentalRequested, RentalStatus,
    RequestRental, ReturnConfirmed, ReturnReported,
};
pub use transitions::{RentalAction, is_terminal, next_status, required_role};
