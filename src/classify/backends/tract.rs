#![cfg(feature = "backend-tract")]

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::{Classifier, FeatureTensor, ScoreVector};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>>;

/// Tract-based backend for ONNX exports of the sign models.
///
/// The graph is loaded once; an optimized plan is built lazily per distinct
/// input shape, so a whole-sequence fingerspelling call can use a different
/// time dimension on every request.
pub struct TractClassifier {
    model: InferenceModel,
    plans: HashMap<Vec<usize>, Plan>,
}

impl TractClassifier {
    /// Load an ONNX model from disk.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?;
        Ok(Self {
            model,
            plans: HashMap::new(),
        })
    }

    fn plan_for(&mut self, shape: &[usize]) -> Result<&Plan> {
        if !self.plans.contains_key(shape) {
            let plan = self
                .model
                .clone()
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        shape.iter().copied().collect::<TVec<usize>>(),
                    ),
                )
                .context("failed to set input fact")?
                .into_optimized()
                .context("failed to optimize ONNX model")?
                .into_runnable()
                .context("failed to build runnable ONNX model")?;
            log::debug!("tract plan built for input shape {:?}", shape);
            self.plans.insert(shape.to_vec(), plan);
        }
        self.plans
            .get(shape)
            .ok_or_else(|| anyhow!("tract plan missing for shape {:?}", shape))
    }
}

fn rows_from_output(outputs: TVec<TValue>) -> Result<Vec<ScoreVector>> {
    let output = outputs
        .first()
        .ok_or_else(|| anyhow!("model produced no outputs"))?;
    let scores = output
        .to_array_view::<f32>()
        .context("model output tensor was not f32")?;
    let width = scores.shape().last().copied().unwrap_or(0);
    if width == 0 {
        return Err(anyhow!("model output has an empty class axis"));
    }
    let flat: Vec<f32> = scores.iter().copied().collect();
    Ok(flat.chunks(width).map(|row| row.to_vec()).collect())
}

impl Classifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, input: &FeatureTensor) -> Result<Vec<ScoreVector>> {
        let tensor = tract_ndarray::ArrayD::from_shape_vec(
            tract_ndarray::IxDyn(input.shape()),
            input.data().to_vec(),
        )
        .context("input tensor shape mismatch")?
        .into_tensor();
        let plan = self.plan_for(input.shape())?;
        let outputs = plan
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        rows_from_output(outputs)
    }
}
