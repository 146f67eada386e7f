/// ONNX classifier backend on tract.
///
/// The input geometry is read from the model's first input fact. Keras exports
/// are NHWC with a symbolic batch; PyTorch exports are NCHW. The batch is pinned
/// to 1 before optimizing.

use super::{ModelLoader, ScoreModel};
use crate::preprocess::tensor::{InputSpec, TensorLayout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tract_onnx::prelude::*;

type RunFn = Box<dyn Fn(Tensor) -> TractResult<TVec<TValue>> + Send + Sync>;

pub struct OnnxModel {
    spec: InputSpec,
    run: RunFn,
}

/// Loads an ONNX model file on first use.
#[derive(Clone, Debug)]
pub struct OnnxLoader {
    pub path: PathBuf,
}

impl OnnxLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelLoader for OnnxLoader {
    fn load(&self) -> Result<Arc<dyn ScoreModel>, String> {
        let model = OnnxModel::from_path(&self.path)
            .map_err(|e| format!("{}: {e}", self.path.display()))?;
        Ok(Arc::new(model))
    }
}

impl OnnxModel {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| format!("read model: {e:#}"))?;

        let typed = model
            .clone()
            .into_typed()
            .map_err(|e| format!("type model: {e:#}"))?;
        let fact = typed
            .input_fact(0)
            .map_err(|e| format!("input fact: {e:#}"))?;
        let dims: Vec<Option<usize>> = fact
            .shape
            .iter()
            .map(|d| d.to_i64().ok().and_then(|v| usize::try_from(v).ok()))
            .collect();
        let spec = input_spec_from_dims(&dims)?;

        let plan = model
            .with_input_fact(0, f32::fact(spec.shape()).into())
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| format!("optimize model: {e:#}"))?;

        Ok(Self {
            spec,
            run: Box::new(move |input: Tensor| plan.run(tvec!(input.into()))),
        })
    }
}

impl ScoreModel for OnnxModel {
    fn input_spec(&self) -> InputSpec {
        self.spec
    }

    fn scores(&self, tensor: Vec<f32>) -> Result<Vec<f32>, String> {
        let input = Tensor::from_shape::<f32>(&self.spec.shape(), &tensor)
            .map_err(|e| format!("input tensor: {e:#}"))?;

        let outputs = (self.run)(input).map_err(|e| format!("model run: {e:#}"))?;
        let output = outputs
            .first()
            .ok_or_else(|| "model produced no outputs".to_string())?;

        let view = output
            .to_array_view::<f32>()
            .map_err(|e| format!("output tensor: {e:#}"))?;
        Ok(view.iter().copied().collect())
    }
}

/// Accepts `[N, H, W, 3]` or `[N, 3, H, W]`; `N` may be symbolic.
fn input_spec_from_dims(dims: &[Option<usize>]) -> Result<InputSpec, String> {
    let spec = match dims {
        [_, Some(h), Some(w), Some(3)] => InputSpec {
            width: *w as u32,
            height: *h as u32,
            layout: TensorLayout::Nhwc,
        },
        [_, Some(3), Some(h), Some(w)] => InputSpec {
            width: *w as u32,
            height: *h as u32,
            layout: TensorLayout::Nchw,
        },
        other => return Err(format!("unsupported classifier input shape {other:?}")),
    };

    if spec.width == 0 || spec.height == 0 {
        return Err(format!("classifier input has zero size: {dims:?}"));
    }

    Ok(spec)
}
