//! Projection implementations (read model builders).
//!
//! Projections consume published envelopes and build query-optimized read
//! models. All projections are:
//! - **Rebuildable**: reconstructed from the event stream at any time
//! - **Idempotent**: safe for at-least-once delivery

pub mod catalog;
pub mod rentals;

pub use catalog::{CatalogProjection, CatalogProjectionError, CatalogReadModel};
pub use rentals::{RentalReadModel, RentalsProjection, RentalsProjectionError};
