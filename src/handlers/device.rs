/// Device control endpoints: operator commands, device polling, heartbeat and status.

use super::StatusResponse;
use crate::error::AppError;
use crate::state::liveness::StatusReport;
use crate::state::mailbox::DeviceCommand;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Default, Deserialize)]
pub struct SprayParams {
    pub volume_ml: Option<f64>,
}

/// POST /spray?volume_ml=.. - queue a metered spray
pub async fn spray(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SprayParams>,
) -> Result<Json<StatusResponse>, AppError> {
    let volume_ml = params
        .volume_ml
        .unwrap_or(state.config.default_spray_volume_ml);

    if !volume_ml.is_finite() || volume_ml <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "volume_ml must be a positive number, got {volume_ml}"
        )));
    }

    state.commands.put(DeviceCommand::Spray { volume_ml }).await;
    tracing::info!(volume_ml, "spray command queued");

    Ok(Json(StatusResponse::new("queued")))
}

/// POST /spray/stop
pub async fn spray_stop(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.commands.put(DeviceCommand::Stop).await;
    tracing::info!("stop command queued");
    Json(StatusResponse::new("queued"))
}

/// POST /capture - ask the device for a fresh frame unless something is already pending
pub async fn capture(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    if state.commands.put(DeviceCommand::Capture).await {
        tracing::info!("capture command queued");
    } else {
        tracing::debug!("capture skipped, another command is pending");
    }
    Json(StatusResponse::new("queued"))
}

/// GET /get-command - device poll; hands out the pending command at most once
pub async fn get_command(State(state): State<Arc<AppState>>) -> Json<DeviceCommand> {
    let command = state.commands.take().await;
    if !command.is_none() {
        tracing::info!(?command, "command delivered to device");
    }
    Json(command)
}

/// POST /esp-ping - device heartbeat
pub async fn esp_ping(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.liveness.mark_heartbeat(Instant::now()).await;
    tracing::debug!("heartbeat");
    Json(StatusResponse::new("ok"))
}

/// GET /esp-status
pub async fn esp_status(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    let status = state
        .liveness
        .status(Instant::now(), state.config.liveness_threshold)
        .await;
    Json(status.into())
}
