use serde::Deserialize;

use laundry_board::Card;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "backgroundColor", default)]
    pub background_color: Option<String>,
    #[serde(rename = "textColor", default)]
    pub text_color: Option<String>,
}

/// `status` moves the card to another lane; `position` reorders it within
/// its lane. When both are present the lane change wins.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCardRequest {
    #[serde(alias = "lane", default)]
    pub status: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PositionUpdateRequest {
    pub id: String,
    pub position: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(alias = "updates")]
    pub cards: Vec<PositionUpdateRequest>,
    #[serde(default)]
    pub lane: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn card_to_json(card: Card) -> serde_json::Value {
    serde_json::json!({
        "id": card.id.to_string(),
        "title": card.title,
        "status": card.lane.as_str(),
        "position": card.position,
        "created_at": card.created_at,
        "backgroundColor": card.styling.background_color,
        "textColor": card.styling.text_color,
    })
}
