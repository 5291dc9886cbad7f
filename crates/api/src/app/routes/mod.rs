use axum::{Router, routing::get};

pub mod items;
pub mod notifications;
pub mod payments;
pub mod rentals;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/items", items::router())
        .nest("/rentals", rentals::router())
        .nest("/notifications", notifications::router())
}
