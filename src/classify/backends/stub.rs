use anyhow::{anyhow, Result};

use crate::classify::backend::{Classifier, FeatureTensor, ScoreVector};

type Responder = Box<dyn FnMut(&FeatureTensor) -> Result<Vec<ScoreVector>> + Send>;

/// Deterministic stand-in for a real model.
///
/// Used by tests and demos; never touches disk. The number of `infer` calls is
/// tracked so callers can assert on how often the model was invoked.
pub struct StubClassifier {
    responder: Responder,
    calls: usize,
    last_shape: Option<Vec<usize>>,
}

impl StubClassifier {
    /// Always return the same rows.
    pub fn fixed(rows: Vec<ScoreVector>) -> Self {
        Self::from_fn(move |_| Ok(rows.clone()))
    }

    /// Compute the output from the input tensor.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: FnMut(&FeatureTensor) -> Result<Vec<ScoreVector>> + Send + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: 0,
            last_shape: None,
        }
    }

    /// Every call fails as an unavailable model would.
    pub fn failing(message: &'static str) -> Self {
        Self::from_fn(move |_| Err(anyhow!(message)))
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn last_shape(&self) -> Option<&[usize]> {
        self.last_shape.as_deref()
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, input: &FeatureTensor) -> Result<Vec<ScoreVector>> {
        self.calls += 1;
        self.last_shape = Some(input.shape().to_vec());
        (self.responder)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_classifier_is_deterministic() {
        let mut stub = StubClassifier::fixed(vec![vec![0.1, 0.9]]);
        let input = FeatureTensor::single(vec![0.0; 4]);

        let a = stub.infer(&input).unwrap();
        let b = stub.infer(&input).unwrap();
        assert_eq!(a, b);
        assert_eq!(stub.calls(), 2);
        assert_eq!(stub.last_shape(), Some(&[1, 4][..]));
    }

    #[test]
    fn failing_stub_reports_error() {
        let mut stub = StubClassifier::failing("model unavailable");
        let err = stub.infer(&FeatureTensor::single(vec![0.0])).unwrap_err();
        assert_eq!(err.to_string(), "model unavailable");
    }
}
