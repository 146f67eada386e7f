/// Raw upload bytes -> prediction with a recommended dose.
///
/// decode/normalize -> classify -> interpret label -> dose. Pure: the caller
/// decides what to do with the result.

use crate::classifier::ClassificationAdapter;
use crate::dosage::{infection_percent, DoseCalculator};
use crate::labels::{interpret, LabelSet};
use crate::preprocess::decode::{normalize, MIN_IMAGE_BYTES};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    InputTooSmall { len: usize, min: usize },
    Decode(String),
    Inference(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::InputTooSmall { len, min } => {
                write!(f, "input too small: {len} bytes (minimum {min})")
            }
            PipelineError::Decode(msg) => write!(f, "image decode error: {msg}"),
            PipelineError::Inference(msg) => write!(f, "inference error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// One diagnosis. `pesticide`, `base_ml_per_liter` and `dose_ml` are all set or all unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub plant: String,
    pub disease: String,
    #[serde(rename = "label")]
    pub raw_label: String,
    pub confidence: f32,
    pub infection_percent: f64,
    pub pesticide: Option<String>,
    #[serde(rename = "base_ml_per_L")]
    pub base_ml_per_liter: Option<f64>,
    pub dose_ml: Option<f64>,
    #[serde(rename = "raw_pred")]
    pub raw_scores: Vec<f32>,
}

/// A prediction together with the MIME type of the image it was made from.
#[derive(Debug, Clone)]
pub struct Inference {
    pub result: PredictionResult,
    pub mime: &'static str,
}

pub struct InferencePipeline {
    classifier: ClassificationAdapter,
    labels: LabelSet,
    doses: DoseCalculator,
    min_image_bytes: usize,
}

impl InferencePipeline {
    pub fn new(classifier: ClassificationAdapter, labels: LabelSet, doses: DoseCalculator) -> Self {
        Self {
            classifier,
            labels,
            doses,
            min_image_bytes: MIN_IMAGE_BYTES,
        }
    }

    pub fn with_min_image_bytes(mut self, min_image_bytes: usize) -> Self {
        self.min_image_bytes = min_image_bytes;
        self
    }

    pub fn classifier(&self) -> &ClassificationAdapter {
        &self.classifier
    }

    pub fn infer(&self, bytes: &[u8]) -> Result<Inference, PipelineError> {
        let normalized = normalize(bytes, self.min_image_bytes)?;
        let classification = self.classifier.classify(&normalized.image)?;

        let raw_label = self
            .labels
            .get(classification.label_index)
            .ok_or_else(|| {
                PipelineError::Inference(format!(
                    "classifier returned class {} but only {} labels are known",
                    classification.label_index,
                    self.labels.len()
                ))
            })?
            .to_string();

        let (plant, disease) = interpret(&raw_label);
        let confidence = classification.confidence as f64;
        let dose = self.doses.dose_default(&plant, &disease, confidence);

        tracing::info!(
            label = %raw_label,
            confidence,
            dose_ml = dose.as_ref().map(|d| d.dose_ml),
            "prediction"
        );

        Ok(Inference {
            result: PredictionResult {
                plant,
                disease,
                raw_label,
                confidence: classification.confidence,
                infection_percent: infection_percent(confidence),
                pesticide: dose.as_ref().map(|d| d.pesticide.clone()),
                base_ml_per_liter: dose.as_ref().map(|d| d.base_ml_per_liter),
                dose_ml: dose.map(|d| d.dose_ml),
                raw_scores: classification.scores,
            },
            mime: normalized.mime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::FixedScores;
    use crate::dosage::{DosageTable, DEFAULT_CONTAINER_VOLUME_ML};
    use crate::preprocess::decode::tests::encode_rgb;
    use image::ImageFormat;
    use std::sync::Arc;

    const CSV: &str = "plant,disease,pesticide,base_ml_per_L\ntomato,early blight,pesticideX,2.0\n";

    fn pipeline(scores: Vec<f32>) -> InferencePipeline {
        let table = DosageTable::from_reader(CSV.as_bytes()).unwrap();
        InferencePipeline::new(
            ClassificationAdapter::preloaded(Arc::new(FixedScores::new(scores))),
            LabelSet::default(),
            DoseCalculator::new(table, DEFAULT_CONTAINER_VOLUME_ML),
        )
    }

    fn scores_for(index: usize, confidence: f32) -> Vec<f32> {
        let mut scores = vec![0.0; 23];
        scores[index] = confidence;
        scores
    }

    #[test]
    fn early_blight_gets_a_dose() {
        // 20 = Tomato___Early_blight
        let pipeline = pipeline(scores_for(20, 0.87));
        let jpeg = encode_rgb(256, 200, ImageFormat::Jpeg);

        let inference = pipeline.infer(&jpeg).unwrap();
        let result = inference.result;
        assert_eq!(inference.mime, "image/jpeg");
        assert_eq!(result.raw_label, "Tomato___Early_blight");
        assert_eq!(result.plant, "tomato");
        assert_eq!(result.disease, "early blight");
        assert_eq!(result.infection_percent, 87.0);
        assert_eq!(result.pesticide.as_deref(), Some("pesticideX"));
        assert_eq!(result.base_ml_per_liter, Some(2.0));
        assert_eq!(result.dose_ml, Some(0.174));
        assert_eq!(result.raw_scores.len(), 23);
    }

    #[test]
    fn healthy_leaf_has_no_dose() {
        // 22 = Tomato___healthy
        let pipeline = pipeline(scores_for(22, 0.95));
        let png = encode_rgb(64, 64, ImageFormat::Png);

        let result = pipeline.infer(&png).unwrap().result;
        assert_eq!(result.disease, "healthy");
        assert_eq!(result.infection_percent, 95.0);
        assert!(result.pesticide.is_none());
        assert!(result.base_ml_per_liter.is_none());
        assert!(result.dose_ml.is_none());
    }

    #[test]
    fn index_outside_label_table_is_an_inference_error() {
        let pipeline = pipeline(scores_for(22, 0.1).into_iter().chain([0.9]).collect());
        let png = encode_rgb(64, 64, ImageFormat::Png);
        assert!(matches!(pipeline.infer(&png), Err(PipelineError::Inference(_))));
    }

    #[test]
    fn stages_short_circuit() {
        let pipeline = pipeline(scores_for(20, 0.87));
        assert!(matches!(
            pipeline.infer(&[0u8; 10]),
            Err(PipelineError::InputTooSmall { len: 10, .. })
        ));
        assert!(matches!(
            pipeline.infer(&[7u8; 5000]),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn wire_names_match_dashboard() {
        let result = pipeline(scores_for(22, 0.5))
            .infer(&encode_rgb(64, 64, ImageFormat::Png))
            .unwrap()
            .result;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "Tomato___healthy");
        assert_eq!(json["infection_percent"], 50.0);
        assert!(json["pesticide"].is_null());
        assert!(json["base_ml_per_L"].is_null());
        assert!(json["dose_ml"].is_null());
        assert_eq!(json["raw_pred"].as_array().unwrap().len(), 23);
    }
}
