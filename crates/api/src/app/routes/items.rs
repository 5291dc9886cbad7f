use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use rentloop_core::AggregateId;
use rentloop_inventory::ClothingItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/:id", get(get_item))
        .route("/:id/restock", post(restock_item))
        .route("/:id/availability", post(set_availability))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    let item_id = match services.lifecycle().list_item(
        principal.principal(),
        body.name,
        body.daily_rate,
        body.deposit,
        body.initial_stock,
    ) {
        Ok(id) => id,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({"id": item_id.to_string()})),
    )
        .into_response()
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .catalog()
        .list()
        .into_iter()
        .map(dto::catalog_item_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Some(item_id) = parse_item_id(&id) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id");
    };

    match services.catalog().get(&item_id) {
        Some(item) => (StatusCode::OK, Json(dto::catalog_item_to_json(item))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
    }
}

pub async fn restock_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RestockRequest>,
) -> axum::response::Response {
    let Some(item_id) = parse_item_id(&id) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id");
    };

    match services
        .lifecycle()
        .restock(principal.principal(), item_id, body.quantity)
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"id": id}))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn set_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetAvailabilityRequest>,
) -> axum::response::Response {
    let Some(item_id) = parse_item_id(&id) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id");
    };
    let Some(availability) = dto::parse_availability(&body.availability) else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_availability",
            "availability must be one of: available, unavailable, rented",
        );
    };

    match services
        .lifecycle()
        .set_availability(principal.principal(), item_id, availability)
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"id": id}))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

fn parse_item_id(id: &str) -> Option<ClothingItemId> {
    id.parse::<AggregateId>().ok().map(ClothingItemId::new)
}
