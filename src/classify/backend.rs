use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::error::RecognitionError;

/// Raw per-class scores for one model output row. Logits or probabilities,
/// depending on how the model was exported.
pub type ScoreVector = Vec<f32>;

/// Classifier handle shared between request handlers and the live producer.
pub type SharedClassifier = Arc<Mutex<dyn Classifier>>;

/// Which model a classifier serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Single-frame hand shape (alphabet + static phrases).
    Static,
    /// 21-frame motion window.
    Movement,
    /// Sequence-to-sequence fingerspelling decoder.
    Fingerspelling,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Movement => "movement",
            Self::Fingerspelling => "fingerspelling",
        }
    }
}

/// Row-major input tensor handed to a classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl FeatureTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, RecognitionError> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(RecognitionError::input_shape(format!(
                "tensor shape {:?} does not match {} values",
                shape,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// A `[1, len]` batch of one.
    pub fn single(data: Vec<f32>) -> Self {
        Self {
            shape: vec![1, data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Opaque model boundary: `scores = infer(tensor)`.
///
/// Calls are synchronous and may block for the duration of inference. A
/// failing call is reported as an error and surfaces as a model error.
pub trait Classifier: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the model; one score vector per output row (batch/time axis).
    fn infer(&mut self, input: &FeatureTensor) -> Result<Vec<ScoreVector>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_shape_must_match_data() {
        assert!(FeatureTensor::new(vec![2, 3], vec![0.0; 6]).is_ok());
        let err = FeatureTensor::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert_eq!(err.kind(), "input_shape_error");
        assert!(FeatureTensor::new(vec![], vec![]).is_err());
    }

    #[test]
    fn single_is_batch_of_one() {
        let t = FeatureTensor::single(vec![1.0; 42]);
        assert_eq!(t.shape(), &[1, 42]);
    }
}
