//! Background worker plumbing.

pub mod projection_worker;

pub use projection_worker::{ProjectionWorker, WorkerHandle};
