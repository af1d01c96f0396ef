use std::path::Path;

use anyhow::Result;

use crate::classify::backend::SharedClassifier;

pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubClassifier;

#[cfg(feature = "backend-tract")]
pub use tract::TractClassifier;

/// Open a model file with the backend compiled into this build.
#[cfg(feature = "backend-tract")]
pub fn open_model(path: &Path) -> Result<SharedClassifier> {
    use std::sync::{Arc, Mutex};

    use crate::classify::backend::Classifier;

    let mut classifier = TractClassifier::new(path)?;
    classifier.warm_up()?;
    Ok(Arc::new(Mutex::new(classifier)))
}

#[cfg(not(feature = "backend-tract"))]
pub fn open_model(path: &Path) -> Result<SharedClassifier> {
    Err(anyhow::anyhow!(
        "cannot load {}: built without the backend-tract feature",
        path.display()
    ))
}
