use axum::{
    routing::{get, post},
    Router,
};

pub mod cards;
pub mod common;
pub mod lanes;
pub mod system;

/// Router for all board endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/api/lanes", get(lanes::list_lanes))
        .route("/api/cards", get(cards::list_cards).post(cards::create_card))
        .route("/api/cards/reorder", post(cards::reorder_cards))
        .route(
            "/api/cards/:id",
            get(cards::get_card)
                .patch(cards::update_card)
                .delete(cards::delete_card),
        )
}
