/// Read-back endpoints for the dashboard: /latest and /latest/image

use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// GET /latest - last prediction, or `{"status":"no_data"}`
pub async fn latest(State(state): State<Arc<AppState>>) -> Response {
    match state.snapshots.read().await {
        Some(snapshot) => Json(&snapshot.result).into_response(),
        None => Json(json!({ "status": "no_data" })).into_response(),
    }
}

/// GET /latest/image - the bytes the last prediction was made from
pub async fn latest_image(State(state): State<Arc<AppState>>) -> Response {
    match state.snapshots.read().await {
        Some(snapshot) => (
            [(header::CONTENT_TYPE, snapshot.image_mime.clone())],
            snapshot.image.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "status": "no_image" }))).into_response(),
    }
}
