use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use laundry_infra::BoardStoreError;

/// Map a store error to its response. Reorder failures go through this same
/// mapping (400/404/500 by kind) rather than a blanket 500.
pub fn store_error_to_response(err: BoardStoreError) -> axum::response::Response {
    match err {
        BoardStoreError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        BoardStoreError::NotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        BoardStoreError::Capacity(ref lane) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "lane_at_capacity",
                "message": err.to_string(),
                "lane": lane,
            })),
        )
            .into_response(),
        BoardStoreError::Store(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            err.to_string(),
        ),
    }
}

/// Malformed JSON bodies are validation errors, not framework plain-text rejections.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
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
    use laundry_board::LaneId;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (BoardStoreError::Validation("title is required".into()), StatusCode::BAD_REQUEST),
            (BoardStoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (BoardStoreError::capacity(LaneId::Washer), StatusCode::BAD_REQUEST),
            (BoardStoreError::store("disk gone"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(store_error_to_response(err).status(), status);
        }
    }
}
