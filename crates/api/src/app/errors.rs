use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use rentloop_infra::command_dispatcher::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DispatchError::InvalidDateRange(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_date_range", msg)
        }
        DispatchError::InvalidTransition(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_transition", msg)
        }
        DispatchError::OutOfStock => {
            json_error(StatusCode::BAD_REQUEST, "out_of_stock", "item is out of stock")
        }
        DispatchError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            format!("{e:?}"),
        ),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (DispatchError::OutOfStock, StatusCode::BAD_REQUEST),
            (DispatchError::NotFound, StatusCode::NOT_FOUND),
            (DispatchError::Forbidden, StatusCode::FORBIDDEN),
            (
                DispatchError::InvalidTransition("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DispatchError::Concurrency("stale".into()),
                StatusCode::CONFLICT,
            ),
            (
                DispatchError::Publish("bus down".into()),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(dispatch_error_to_response(err).status(), expected);
        }
    }
}
