/// Admin endpoints: /clear and /health

use super::StatusResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// POST /clear - forget the stored prediction, pending command and liveness
pub async fn clear(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.reset().await;
    tracing::info!("state cleared");
    Json(StatusResponse::new("cleared"))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: String,
    pub model_loaded: bool,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        time: chrono::Utc::now().to_rfc3339(),
        model_loaded: state.pipeline.classifier().is_loaded(),
    })
}
