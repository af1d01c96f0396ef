//! ASL recognition relay
//!
//! Turns hand landmarks into sign-language text and distributes live
//! translations to connected viewers.
//!
//! # Pipeline
//!
//! 1. **Preprocess**: a single frame is normalized (wrist-anchored, scaled to
//!    [-1, 1]); a 21-frame window is encoded as motion relative to frame 0.
//! 2. **Classify**: an opaque `Classifier` turns feature tensors into score
//!    vectors (`StubClassifier` in tests, `TractClassifier` for ONNX exports).
//! 3. **Post-process**: Top-N ranking, movement index remapping, or greedy
//!    decoding of fingerspelling output with PAD/START/END sentinels.
//! 4. **Serve**: `service::InferenceService` answers requests over the HTTP
//!    surface in `api`; the `live` loop pushes the latest detection to every
//!    subscriber.
//!
//! # Module Structure
//!
//! - `landmark`, `preprocess`: input shapes and feature encoding
//! - `classify`: classifier boundary, registry, ranking and remapping
//! - `tables`, `decode`: label/character tables and sequence decoding
//! - `recognizer`, `service`: model façades and the request-level service
//! - `ingest`, `live`: landmark sources and the live distribution loop
//! - `api`, `config`, `error`: HTTP surface, configuration, error categories

pub mod api;
pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod ingest;
pub mod landmark;
pub mod live;
pub mod preprocess;
pub mod recognizer;
pub mod service;
pub mod tables;

pub use classify::{
    top_n, Classifier, ClassifierRegistry, FeatureTensor, MappedPrediction, ModelKind,
    MovementIndexMap, RankedPrediction, ScoreVector, SharedClassifier, StubClassifier,
    INVALID_LABEL,
};
pub use config::{LiveSettings, ModelSettings, ServiceConfig};
pub use decode::{decode_sequence, decode_step, DecodedStep, Recognition};
pub use error::{RecognitionError, ServiceError};
pub use ingest::{open_source, JsonLinesSource, LandmarkSource, StubSource};
pub use landmark::{Landmark, LandmarkFrame, MovementWindow, LANDMARK_COUNT, MOVEMENT_FRAMES};
pub use preprocess::{encode_movement, normalize_landmarks};
pub use recognizer::{
    split_camel_case, DecodeGranularity, FingerspellingRecognizer, LabeledPrediction,
    SignRecognizer,
};
pub use service::InferenceService;
pub use tables::{InferenceArgs, LabelTable, Token, Vocabulary, UNKNOWN_LABEL};
