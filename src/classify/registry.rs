use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::{Classifier, FeatureTensor, ModelKind, ScoreVector, SharedClassifier};

/// Thread-safe registry of classifiers, one per model kind.
///
/// Classifiers are wrapped in `Mutex` because `Classifier::infer` takes `&mut self`.
#[derive(Default)]
pub struct ClassifierRegistry {
    backends: HashMap<ModelKind, SharedClassifier>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classifier for a model kind, replacing any previous one.
    pub fn register<C: Classifier + 'static>(&mut self, kind: ModelKind, classifier: C) {
        log::debug!(
            "registered {} classifier for {} model",
            classifier.name(),
            kind.as_str()
        );
        self.backends.insert(kind, Arc::new(Mutex::new(classifier)));
    }

    /// Register an already shared classifier.
    pub fn register_shared(&mut self, kind: ModelKind, classifier: SharedClassifier) {
        self.backends.insert(kind, classifier);
    }

    pub fn get(&self, kind: ModelKind) -> Option<SharedClassifier> {
        self.backends.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        self.backends.contains_key(&kind)
    }

    /// Registered model kinds.
    pub fn kinds(&self) -> Vec<ModelKind> {
        self.backends.keys().copied().collect()
    }

    /// Run inference on the classifier registered for `kind`.
    pub fn infer(&self, kind: ModelKind, input: &FeatureTensor) -> Result<Vec<ScoreVector>> {
        let backend = self
            .get(kind)
            .ok_or_else(|| anyhow!("no classifier registered for {} model", kind.as_str()))?;
        run_shared(&backend, input)
    }
}

/// Lock a shared classifier and run it.
pub(crate) fn run_shared(
    classifier: &SharedClassifier,
    input: &FeatureTensor,
) -> Result<Vec<ScoreVector>> {
    let mut guard = classifier
        .lock()
        .map_err(|_| anyhow!("classifier lock poisoned"))?;
    guard.infer(input)
}
