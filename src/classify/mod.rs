mod backend;
mod backends;
mod rank;
mod registry;

pub use backend::{Classifier, FeatureTensor, ModelKind, ScoreVector, SharedClassifier};
pub use backends::{open_model, StubClassifier};
#[cfg(feature = "backend-tract")]
pub use backends::TractClassifier;
pub use rank::{top_n, MappedPrediction, MovementIndexMap, RankedPrediction, INVALID_LABEL};
pub use registry::ClassifierRegistry;
pub(crate) use registry::run_shared;
