use axum::http::StatusCode;

use laundry_board::LaneId;
use laundry_core::{CardId, DomainError};

use crate::app::errors;

pub fn parse_card_id(raw: &str) -> Result<CardId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid card id '{raw}'"),
        )
    })
}

pub fn parse_lane(raw: &str) -> Result<LaneId, axum::response::Response> {
    raw.parse().map_err(|e: DomainError| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
    })
}
