/// Classification adapter over an external score model.
///
/// The model is loaded lazily on first use and reused for the process lifetime.
/// Concurrent first callers block on the same initialization, so the loader runs
/// once; a failed load is not cached and the next request tries again.

pub mod onnx;

use crate::pipeline::PipelineError;
use crate::preprocess::decode::DecodedImage;
use crate::preprocess::tensor::{to_tensor, InputSpec};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// The classifier contract: a fixed input geometry and a score vector per image.
pub trait ScoreModel: Send + Sync {
    /// Cached at load time.
    fn input_spec(&self) -> InputSpec;

    /// `tensor` is laid out per `input_spec()` with values in [0,1].
    fn scores(&self, tensor: Vec<f32>) -> Result<Vec<f32>, String>;
}

pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn ScoreModel>, String>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<Arc<dyn ScoreModel>, String> + Send + Sync,
{
    fn load(&self) -> Result<Arc<dyn ScoreModel>, String> {
        self()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub label_index: usize,
    pub scores: Vec<f32>,
    pub confidence: f32,
}

pub struct ClassificationAdapter {
    loader: Box<dyn ModelLoader>,
    model: OnceCell<Arc<dyn ScoreModel>>,
}

impl ClassificationAdapter {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// Adapter over an already-loaded model.
    pub fn preloaded(model: Arc<dyn ScoreModel>) -> Self {
        Self {
            loader: Box::new(|| -> Result<Arc<dyn ScoreModel>, String> {
                Err("model is preloaded".to_string())
            }),
            model: OnceCell::with_value(model),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn model(&self) -> Result<&Arc<dyn ScoreModel>, PipelineError> {
        self.model
            .get_or_try_init(|| {
                tracing::info!("Loading classifier model");
                let model = self.loader.load()?;
                let spec = model.input_spec();
                tracing::info!(
                    width = spec.width,
                    height = spec.height,
                    layout = ?spec.layout,
                    "Classifier model loaded"
                );
                Ok(model)
            })
            .map_err(|e: String| PipelineError::Inference(format!("model load: {e}")))
    }

    /// Resize, rescale and score one image. `label_index` is the first maximum score.
    pub fn classify(&self, img: &DecodedImage) -> Result<Classification, PipelineError> {
        let model = self.model()?;
        let spec = model.input_spec();

        let tensor = to_tensor(img, &spec).map_err(PipelineError::Inference)?;
        let scores = model.scores(tensor).map_err(PipelineError::Inference)?;

        let (label_index, confidence) = argmax(&scores)
            .ok_or_else(|| PipelineError::Inference("classifier returned no scores".to_string()))?;

        Ok(Classification {
            label_index,
            scores,
            confidence,
        })
    }
}

fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::preprocess::tensor::TensorLayout;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns fixed scores and remembers the last tensor length it saw.
    pub(crate) struct FixedScores {
        pub scores: Vec<f32>,
        pub seen_len: Mutex<Option<usize>>,
    }

    impl FixedScores {
        pub(crate) fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                seen_len: Mutex::new(None),
            }
        }
    }

    impl ScoreModel for FixedScores {
        fn input_spec(&self) -> InputSpec {
            InputSpec {
                width: 8,
                height: 8,
                layout: TensorLayout::Nhwc,
            }
        }

        fn scores(&self, tensor: Vec<f32>) -> Result<Vec<f32>, String> {
            *self.seen_len.lock().unwrap() = Some(tensor.len());
            Ok(self.scores.clone())
        }
    }

    fn image() -> DecodedImage {
        DecodedImage {
            width: 20,
            height: 10,
            data: vec![128; 20 * 10 * 3],
        }
    }

    #[test]
    fn picks_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some((1, 0.7)));
        assert_eq!(argmax(&[f32::NAN, 0.3]), Some((1, 0.3)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn classify_resizes_to_model_input() {
        let model = Arc::new(FixedScores::new(vec![0.05, 0.9, 0.05]));
        let adapter = ClassificationAdapter::preloaded(model.clone());

        let result = adapter.classify(&image()).unwrap();
        assert_eq!(result.label_index, 1);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.scores, vec![0.05, 0.9, 0.05]);
        assert_eq!(*model.seen_len.lock().unwrap(), Some(8 * 8 * 3));
    }

    #[test]
    fn empty_scores_are_an_inference_error() {
        let adapter = ClassificationAdapter::preloaded(Arc::new(FixedScores::new(vec![])));
        let err = adapter.classify(&image()).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
    }

    #[test]
    fn concurrent_first_use_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let adapter = ClassificationAdapter::new(move || -> Result<Arc<dyn ScoreModel>, String> {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(FixedScores::new(vec![1.0])) as Arc<dyn ScoreModel>)
        });

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| adapter.classify(&image()).unwrap());
            }
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(adapter.is_loaded());
    }

    #[test]
    fn failed_load_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let adapter = ClassificationAdapter::new(move || -> Result<Arc<dyn ScoreModel>, String> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("model file missing".to_string())
            } else {
                Ok(Arc::new(FixedScores::new(vec![0.4, 0.6])) as Arc<dyn ScoreModel>)
            }
        });

        let err = adapter.classify(&image()).unwrap_err();
        assert!(err.to_string().contains("model file missing"));
        assert!(!adapter.is_loaded());

        assert_eq!(adapter.classify(&image()).unwrap().label_index, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
