//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (event store/bus, lifecycle engine,
//!   projections, notification relay)
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: &[u8]) -> Router {
    let auth_state = middleware::AuthState::new(jwt_secret);
    let services = Arc::new(services::build_services());

    // Protected routes: require a bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::clone(&services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // The payment gateway calls back without a user session.
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/payments/confirm", post(routes::payments::confirm))
        .layer(Extension(services))
        .merge(protected)
}
