use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use laundry_board::{
    BoardIntent, CreateIntent, DeleteIntent, PositionUpdate, ReorderIntent, RepositionIntent,
    TransitionIntent,
};
use laundry_infra::BoardOutcome;

use crate::app::routes::common::{parse_card_id, parse_lane};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn list_cards(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.list().await {
        Ok(cards) => {
            let body: Vec<_> = cards.into_iter().map(dto::card_to_json).collect();
            Json(body).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_card(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let card_id = match parse_card_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get(card_id).await {
        Ok(card) => Json(dto::card_to_json(card)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_card(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateCardRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let intent = BoardIntent::Create(CreateIntent {
        title: body.title,
        background_color: body.background_color,
        text_color: body.text_color,
    });

    match services.dispatch(intent).await {
        Ok(BoardOutcome::Card(card)) => {
            (StatusCode::CREATED, Json(dto::card_to_json(card))).into_response()
        }
        Ok(other) => unexpected_outcome(other),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_card(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateCardRequest>, JsonRejection>,
) -> axum::response::Response {
    let card_id = match parse_card_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let intent = match (body.status, body.position) {
        (Some(status), _) => {
            let target_lane = match parse_lane(&status) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            BoardIntent::Transition(TransitionIntent { card_id, target_lane })
        }
        (None, Some(position)) => BoardIntent::Reposition(RepositionIntent { card_id, position }),
        (None, None) => {
            return match services.get(card_id).await {
                Ok(card) => Json(dto::card_to_json(card)).into_response(),
                Err(e) => errors::store_error_to_response(e),
            };
        }
    };

    match services.dispatch(intent).await {
        Ok(BoardOutcome::Card(card)) => Json(dto::card_to_json(card)).into_response(),
        // Repositioning reports a count; answer with the card as it now stands.
        Ok(BoardOutcome::Reordered { .. }) => match services.get(card_id).await {
            Ok(card) => Json(dto::card_to_json(card)).into_response(),
            Err(e) => errors::store_error_to_response(e),
        },
        Ok(other) => unexpected_outcome(other),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_card(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let card_id = match parse_card_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.dispatch(BoardIntent::Delete(DeleteIntent { card_id })).await {
        Ok(BoardOutcome::Deleted(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(other) => unexpected_outcome(other),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn reorder_cards(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ReorderRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let lane = match body.lane.as_deref().map(parse_lane).transpose() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut updates = Vec::with_capacity(body.cards.len());
    for entry in body.cards {
        let card_id = match parse_card_id(&entry.id) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        updates.push(PositionUpdate {
            card_id,
            position: entry.position,
        });
    }

    match services.dispatch(BoardIntent::Reorder(ReorderIntent { lane, updates })).await {
        Ok(BoardOutcome::Reordered { updated }) => Json(serde_json::json!({
            "success": true,
            "updated": updated,
        }))
        .into_response(),
        Ok(other) => unexpected_outcome(other),
        Err(e) => errors::store_error_to_response(e),
    }
}

fn unexpected_outcome(outcome: BoardOutcome) -> axum::response::Response {
    tracing::error!(?outcome, "board service returned an unexpected outcome");
    errors::json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "store_error",
        "unexpected board outcome",
    )
}
