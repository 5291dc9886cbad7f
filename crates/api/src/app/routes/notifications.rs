use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use rentloop_notifications::{NotificationFeedError, NotificationId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.feed().list(principal.user_id()) {
        Ok(page) => {
            let items = page.iter().map(dto::notification_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => feed_error_to_response(e),
    }
}

pub async fn unread_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.feed().unread_count(principal.user_id()) {
        Ok(count) => (StatusCode::OK, Json(serde_json::json!({"unread": count}))).into_response(),
        Err(e) => feed_error_to_response(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(uuid) = id.parse::<Uuid>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid notification id");
    };

    match services
        .feed()
        .mark_read(principal.user_id(), NotificationId(uuid))
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"id": id}))).into_response(),
        Err(e) => feed_error_to_response(e),
    }
}

pub async fn mark_all_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.feed().mark_all_read(principal.user_id()) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"ok": true}))).into_response(),
        Err(e) => feed_error_to_response(e),
    }
}

fn feed_error_to_response(err: NotificationFeedError) -> axum::response::Response {
    match err {
        NotificationFeedError::NotFound => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", "notification not found")
        }
        NotificationFeedError::Poisoned => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "feed_error",
            "notification feed unavailable",
        ),
    }
}
