/// Prediction endpoints: /predict/raw (device upload) and /predict (operator upload)

use crate::error::AppError;
use crate::pipeline::PredictionResult;
use crate::state::snapshot::StoredSnapshot;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub result: PredictionResult,
    pub inference_time_ms: f64,
}

/// POST /predict/raw - request body is the image
pub async fn predict_raw(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    let start = Instant::now();

    // Any arrival counts as a sign of life, even a frame that fails to decode.
    state.liveness.mark_image_received(start).await;
    tracing::info!(bytes = body.len(), "predict/raw");

    let result = infer_and_store(&state, body).await?;

    Ok(Json(PredictResponse {
        status: "ok",
        result,
        inference_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

/// POST /predict - multipart form with a `file` field
pub async fn predict_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, AppError> {
    let start = Instant::now();

    let mut image_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
            image_bytes = Some(data);
            break;
        }
    }

    let image_bytes =
        image_bytes.ok_or_else(|| AppError::BadRequest("No file field in request".to_string()))?;
    tracing::info!(bytes = image_bytes.len(), "predict");

    let result = infer_and_store(&state, image_bytes).await?;

    Ok(Json(PredictResponse {
        status: "ok",
        result,
        inference_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

/// Run the pipeline off the async workers; the snapshot is only replaced on success.
pub async fn infer_and_store(
    state: &Arc<AppState>,
    image: Bytes,
) -> Result<PredictionResult, AppError> {
    let pipeline = state.pipeline.clone();
    let input = image.clone();

    let inference = tokio::task::spawn_blocking(move || pipeline.infer(&input))
        .await
        .map_err(|e| AppError::Internal(format!("Join error: {e}")))??;

    state
        .snapshots
        .replace(StoredSnapshot {
            result: inference.result.clone(),
            image,
            image_mime: inference.mime.to_string(),
        })
        .await;

    Ok(inference.result)
}
