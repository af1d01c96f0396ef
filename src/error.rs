//! Error categories surfaced at the request boundary.
//!
//! Plumbing (I/O, sockets, config files) uses `anyhow`. Anything a caller has to
//! react to differently is funnelled into `RecognitionError`, whose `kind()` is
//! the stable category string returned to clients.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionError {
    /// Label/vocabulary/model files missing or malformed at load time.
    Configuration(String),
    /// Landmark count, frame count or sequence dimensions do not match.
    InputShape(String),
    /// The opaque classifier call failed.
    Model(String),
}

impl RecognitionError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn input_shape(message: impl Into<String>) -> Self {
        Self::InputShape(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::InputShape(_) => "input_shape_error",
            Self::Model(_) => "model_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(m) | Self::InputShape(m) | Self::Model(m) => m,
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for RecognitionError {}

/// Failure of a single inference request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceError {
    /// Models or tables were not loaded at startup.
    Unavailable,
    Failed(RecognitionError),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable => "service_unavailable",
            Self::Failed(err) => err.kind(),
        }
    }

    /// HTTP status the request surface maps this error to.
    pub fn status(&self) -> u16 {
        match self {
            Self::Unavailable => 503,
            Self::Failed(RecognitionError::InputShape(_)) => 422,
            Self::Failed(_) => 500,
        }
    }
}

impl From<RecognitionError> for ServiceError {
    fn from(err: RecognitionError) -> Self {
        Self::Failed(err)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Model not loaded"),
            Self::Failed(err) => write!(f, "Prediction failed: {}", err),
        }
    }
}

impl std::error::Error for ServiceError {}
