use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use rentloop_infra::PaymentConfirmation;

use crate::app::errors;
use crate::app::services::AppServices;

/// Gateway callback. Unauthenticated by design: the gateway holds no user
/// session, and the payload only ever moves a rental along its own lifecycle.
pub async fn confirm(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PaymentConfirmation>,
) -> axum::response::Response {
    match services.payments().process(&body) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"ok": true}))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
