use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use rentloop_auth::Role;
use rentloop_core::AggregateId;
use rentloop_inventory::ClothingItemId;
use rentloop_rentals::{Rental, RentalId, RentalStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_rental).get(list_rentals))
        .route("/:id/approve", post(approve_rental))
        .route("/:id/reject", post(reject_rental))
        .route("/:id/return", post(mark_returned))
        .route("/:id/confirm-return", post(confirm_return))
}

pub async fn create_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateRentalRequest>,
) -> axum::response::Response {
    let Ok(agg) = body.item_id.parse::<AggregateId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id");
    };

    let rental_id = match services.lifecycle().request_rental(
        principal.principal(),
        ClothingItemId::new(agg),
        body.start_date,
        body.end_date,
    ) {
        Ok(id) => id,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": rental_id.to_string(),
            "status": RentalStatus::Pending.to_string(),
            "message": "rental requested",
        })),
    )
        .into_response()
}

/// Customers see the rentals they requested; stores see the incoming
/// requests for their items.
pub async fn list_rentals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let rows = match principal.role() {
        Role::Customer => services.rentals().list_by_customer(principal.user_id()),
        Role::Store => services.rentals().list_by_store(principal.user_id()),
    };

    let items = rows.into_iter().map(dto::rental_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn approve_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&services, &principal, &id, "rental approved", |s, p, rental_id| {
        s.lifecycle().approve(p.principal(), rental_id)
    })
}

pub async fn reject_rental(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&services, &principal, &id, "rental rejected", |s, p, rental_id| {
        s.lifecycle().reject(p.principal(), rental_id)
    })
}

pub async fn mark_returned(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&services, &principal, &id, "return reported", |s, p, rental_id| {
        s.lifecycle().mark_returned(p.principal(), rental_id)
    })
}

pub async fn confirm_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(&services, &principal, &id, "return confirmed", |s, p, rental_id| {
        s.lifecycle().confirm_return(p.principal(), rental_id)
    })
}

fn transition(
    services: &AppServices,
    principal: &PrincipalContext,
    id: &str,
    message: &'static str,
    op: impl FnOnce(
        &AppServices,
        &PrincipalContext,
        RentalId,
    ) -> Result<(), rentloop_infra::DispatchError>,
) -> axum::response::Response {
    let Ok(agg) = id.parse::<AggregateId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid rental id");
    };

    if let Err(e) = op(services, principal, RentalId::new(agg)) {
        return errors::dispatch_error_to_response(e);
    }

    // Report the post-transition state alongside the message.
    let rental = match services
        .lifecycle()
        .dispatcher()
        .load::<Rental>(agg, |rid| Rental::empty(RentalId::new(rid)))
    {
        Ok(rental) => rental,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": id,
            "status": rental.status().to_string(),
            "message": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use rentloop_auth::{Principal, Role};
    use rentloop_core::UserId;

    use super::*;
    use crate::app::services::build_services;

    #[tokio::test]
    async fn transition_response_carries_the_new_status() {
        let services = build_services();
        let owner = Principal::new(UserId::new(), Role::Store);
        let customer = Principal::new(UserId::new(), Role::Customer);

        let item_id = services
            .lifecycle()
            .list_item(&owner, "Velvet blazer".to_string(), 100_00, 500_00, 2)
            .unwrap();
        let start = Utc::now().date_naive() + Duration::days(3);
        let rental_id = services
            .lifecycle()
            .request_rental(&customer, item_id, start, start + Duration::days(1))
            .unwrap();

        let principal = PrincipalContext::new(owner.user_id, Role::Store);
        let response = transition(
            &services,
            &principal,
            &rental_id.to_string(),
            "rental approved",
            |s, p, id| s.lifecycle().approve(p.principal(), id),
        );
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["id"], rental_id.to_string());
        assert_eq!(body["status"], "approved");
        assert_eq!(body["message"], "rental approved");
    }
}
