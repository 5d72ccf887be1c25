use std::sync::Arc;

use axum::{extract::Extension, Json};

use laundry_board::Lane;

use crate::app::services::AppServices;

pub async fn list_lanes(Extension(services): Extension<Arc<AppServices>>) -> Json<Vec<Lane>> {
    Json(services.layout().lanes().to_vec())
}
