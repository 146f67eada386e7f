/// Environment-based configuration.

use crate::dosage::DEFAULT_CONTAINER_VOLUME_ML;
use crate::preprocess::decode::MIN_IMAGE_BYTES;
use crate::state::liveness::DEFAULT_THRESHOLD;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub model_path: PathBuf,
    pub dosage_csv_path: PathBuf,
    /// Optional newline-separated label file; the built-in vocabulary is used when unset.
    pub labels_path: Option<PathBuf>,
    pub liveness_threshold: Duration,
    pub container_volume_ml: f64,
    pub default_spray_volume_ml: f64,
    pub min_image_bytes: usize,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            model_path: PathBuf::from("plant_disease_model.onnx"),
            dosage_csv_path: PathBuf::from("pesticide_data.csv"),
            labels_path: None,
            liveness_threshold: DEFAULT_THRESHOLD,
            container_volume_ml: DEFAULT_CONTAINER_VOLUME_ML,
            default_spray_volume_ml: 10.0,
            min_image_bytes: MIN_IMAGE_BYTES,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            dosage_csv_path: std::env::var("CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dosage_csv_path),
            labels_path: std::env::var("LABELS_PATH").ok().map(PathBuf::from),
            liveness_threshold: parsed("LIVENESS_THRESHOLD_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.liveness_threshold),
            container_volume_ml: parsed("CONTAINER_VOLUME_ML")
                .unwrap_or(defaults.container_volume_ml),
            default_spray_volume_ml: parsed("DEFAULT_SPRAY_VOLUME_ML")
                .unwrap_or(defaults.default_spray_volume_ml),
            min_image_bytes: parsed("MIN_IMAGE_BYTES").unwrap_or(defaults.min_image_bytes),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
