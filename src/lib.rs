/// Leaf-photo diagnosis to spray-dose bridge for a polling camera/pump device.
///
/// The device has no push channel: it uploads frames, pings a heartbeat and polls
/// for its next command. An operator reads back the latest diagnosis and queues
/// spray/stop/capture commands.

pub mod classifier;
pub mod config;
pub mod dosage;
pub mod error;
pub mod handlers;
pub mod labels;
pub mod pipeline;
pub mod preprocess;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use classifier::onnx::OnnxLoader;
use classifier::ClassificationAdapter;
use config::Config;
use dosage::{DosageTable, DoseCalculator};
use error::AppError;
use labels::LabelSet;
use pipeline::InferencePipeline;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Assemble the pipeline from config. The model itself is loaded on first use.
pub fn build_pipeline(config: &Config) -> Result<InferencePipeline, AppError> {
    let table = DosageTable::from_path(&config.dosage_csv_path).map_err(|e| {
        AppError::Internal(format!("{}: {e}", config.dosage_csv_path.display()))
    })?;
    tracing::info!(
        rows = table.len(),
        path = %config.dosage_csv_path.display(),
        "Dosage table loaded"
    );

    let labels = match &config.labels_path {
        Some(path) => LabelSet::from_path(path)?,
        None => LabelSet::default(),
    };
    tracing::info!(classes = labels.len(), "Label vocabulary ready");

    let classifier = ClassificationAdapter::new(OnnxLoader::new(config.model_path.clone()));
    let doses = DoseCalculator::new(table, config.container_volume_ml);

    Ok(InferencePipeline::new(classifier, labels, doses).with_min_image_bytes(config.min_image_bytes))
}

pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::admin::health))
        .route("/predict/raw", post(handlers::predict::predict_raw))
        .route("/predict", post(handlers::predict::predict_upload))
        .route("/latest", get(handlers::latest::latest))
        .route("/latest/image", get(handlers::latest::latest_image))
        .route("/spray", post(handlers::device::spray))
        .route("/spray/stop", post(handlers::device::spray_stop))
        .route("/capture", post(handlers::device::capture))
        .route("/get-command", get(handlers::device::get_command))
        .route("/esp-ping", post(handlers::device::esp_ping))
        .route("/esp-status", get(handlers::device::esp_status))
        .route("/clear", post(handlers::admin::clear))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
