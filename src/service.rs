//! Request-level inference service.
//!
//! Each capability (fingerspelling, sign) is loaded independently at startup.
//! A capability whose model or tables failed to load stays `None` and every
//! request for it is answered with `ServiceError::Unavailable`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::classify::{open_model, ClassifierRegistry, ModelKind};
use crate::config::ModelSettings;
use crate::error::{RecognitionError, ServiceError};
use crate::landmark::{LandmarkFrame, MovementWindow};
use crate::recognizer::{
    split_camel_case, FingerspellingRecognizer, LabeledPrediction, SignRecognizer,
};
use crate::tables::{InferenceArgs, LabelTable, Vocabulary};

// -------------------- Wire types --------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FingerspellingRequest {
    /// One flattened landmark frame per entry.
    pub landmarks: Vec<Vec<f32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub text: String,
    pub confidence: f32,
    /// Milliseconds spent in preprocessing, inference and decoding.
    pub processing_time: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictMode {
    Static,
    Movement,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SignRequest {
    /// Single frame of 21 `[x, y]` points (static mode).
    pub landmarks: Option<Vec<[f32; 2]>>,
    /// 21 frames of 21 `[x, y]` points (movement mode).
    pub sequence: Option<Vec<Vec<[f32; 2]>>>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub mode: Option<PredictMode>,
}

impl SignRequest {
    /// Explicit mode, else movement when a sequence is present, else static.
    pub fn resolved_mode(&self) -> PredictMode {
        self.mode.unwrap_or(if self.sequence.is_some() {
            PredictMode::Movement
        } else {
            PredictMode::Static
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignResponse {
    pub text: String,
    pub confidence: f32,
    pub processing_time: f64,
    pub mode: PredictMode,
    pub predictions: Vec<LabeledPrediction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub model_loaded: bool,
    pub sign_model_loaded: bool,
}

// -------------------- Service --------------------

pub struct InferenceService {
    sign: Option<SignRecognizer>,
    fingerspelling: Option<FingerspellingRecognizer>,
}

impl InferenceService {
    /// Load every capability from disk. Never fails; see `health()`.
    pub fn load(settings: &ModelSettings) -> Self {
        let registry = load_registry(settings);

        let fingerspelling = match load_fingerspelling(settings, &registry) {
            Ok(recognizer) => {
                log::info!(
                    "fingerspelling model loaded: {} codes, {} decoding",
                    recognizer.vocabulary().len(),
                    recognizer.granularity().as_str()
                );
                Some(recognizer)
            }
            Err(err) => {
                log::error!("fingerspelling unavailable: {}", err);
                None
            }
        };

        let sign = match load_sign(settings, &registry) {
            Ok(recognizer) => {
                log::info!("sign models loaded: {} labels", recognizer.labels().len());
                Some(recognizer)
            }
            Err(err) => {
                log::error!("sign recognition unavailable: {}", err);
                None
            }
        };

        Self::from_parts(sign, fingerspelling)
    }

    pub fn from_parts(
        sign: Option<SignRecognizer>,
        fingerspelling: Option<FingerspellingRecognizer>,
    ) -> Self {
        Self {
            sign,
            fingerspelling,
        }
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            model_loaded: self.fingerspelling.is_some(),
            sign_model_loaded: self.sign.is_some(),
        }
    }

    pub fn predict(
        &self,
        request: &FingerspellingRequest,
    ) -> Result<PredictResponse, ServiceError> {
        let recognizer = self
            .fingerspelling
            .as_ref()
            .ok_or(ServiceError::Unavailable)?;
        let started = Instant::now();
        let recognition = recognizer.predict(&request.landmarks)?;
        Ok(PredictResponse {
            text: recognition.text,
            confidence: recognition.confidence,
            processing_time: elapsed_ms(started),
        })
    }

    pub fn predict_sign(&self, request: &SignRequest) -> Result<SignResponse, ServiceError> {
        let recognizer = self.sign.as_ref().ok_or(ServiceError::Unavailable)?;
        let started = Instant::now();
        let mode = request.resolved_mode();

        let ranked = match mode {
            PredictMode::Static => {
                let pairs = request.landmarks.as_deref().ok_or_else(|| {
                    RecognitionError::input_shape("static mode requires 'landmarks'")
                })?;
                recognizer.predict_static(&LandmarkFrame::from_pairs(pairs)?)?
            }
            PredictMode::Movement => {
                let sequence = request.sequence.as_deref().ok_or_else(|| {
                    RecognitionError::input_shape("movement mode requires 'sequence'")
                })?;
                let (width, height) = match (request.image_width, request.image_height) {
                    (Some(w), Some(h)) => (w, h),
                    _ => {
                        return Err(RecognitionError::input_shape(
                            "movement mode requires 'image_width' and 'image_height'",
                        )
                        .into())
                    }
                };
                recognizer.predict_movement(&MovementWindow::from_pairs(sequence)?, width, height)?
            }
        };

        let predictions = recognizer.visible_predictions(&ranked);
        let (text, confidence) = predictions
            .first()
            .map(|best| (split_camel_case(&best.label), best.confidence.clamp(0.0, 1.0)))
            .unwrap_or_default();

        Ok(SignResponse {
            text,
            confidence,
            processing_time: elapsed_ms(started),
            mode,
            predictions,
        })
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn load_registry(settings: &ModelSettings) -> ClassifierRegistry {
    let mut registry = ClassifierRegistry::new();
    for (kind, path) in [
        (ModelKind::Static, settings.static_model_path()),
        (ModelKind::Movement, settings.movement_model_path()),
        (ModelKind::Fingerspelling, settings.fingerspelling_model_path()),
    ] {
        match open_model(&path) {
            Ok(model) => {
                log::info!("{} model loaded from {}", kind.as_str(), path.display());
                registry.register_shared(kind, model);
            }
            Err(err) => log::warn!("{} model not loaded: {:#}", kind.as_str(), err),
        }
    }
    registry
}

fn load_fingerspelling(
    settings: &ModelSettings,
    registry: &ClassifierRegistry,
) -> Result<FingerspellingRecognizer, RecognitionError> {
    let vocab = Vocabulary::load(&settings.character_map_path())?;
    let args = InferenceArgs::load(&settings.inference_args_path())?;
    FingerspellingRecognizer::from_registry(
        registry,
        vocab,
        args.frame_width(),
        settings.decode_granularity,
    )
}

fn load_sign(
    settings: &ModelSettings,
    registry: &ClassifierRegistry,
) -> Result<SignRecognizer, RecognitionError> {
    let labels = LabelTable::load(&settings.labels_path())?;
    SignRecognizer::from_registry(
        registry,
        labels,
        settings.movement_map.clone(),
        settings.output_count,
    )
}

/// Load only the sign capability, for the live loop.
pub fn load_sign_recognizer(settings: &ModelSettings) -> Result<SignRecognizer, RecognitionError> {
    let mut registry = ClassifierRegistry::new();
    for (kind, path) in [
        (ModelKind::Static, settings.static_model_path()),
        (ModelKind::Movement, settings.movement_model_path()),
    ] {
        let model = open_model(&path).map_err(|e| {
            RecognitionError::configuration(format!("{} model: {:#}", kind.as_str(), e))
        })?;
        registry.register_shared(kind, model);
    }
    load_sign(settings, &registry)
}
