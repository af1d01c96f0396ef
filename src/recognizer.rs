//! Model façades combining preprocessing, inference and post-processing.
//!
//! `SignRecognizer` covers the static (single frame) and movement (21 frame)
//! models that share one label table. `FingerspellingRecognizer` covers the
//! sequence model decoded against the character vocabulary.

use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::anyhow;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{
    run_shared, top_n, ClassifierRegistry, FeatureTensor, MappedPrediction, ModelKind,
    MovementIndexMap, ScoreVector, SharedClassifier,
};
use crate::decode::{decode_sequence, mean, Recognition};
use crate::error::RecognitionError;
use crate::landmark::{LandmarkFrame, MovementWindow};
use crate::preprocess::{encode_movement, normalize_landmarks};
use crate::tables::{LabelTable, Vocabulary};

/// User-facing prediction entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledPrediction {
    pub label: String,
    pub confidence: f32,
}

/// `"ThankYou"` -> `"Thank You"`. Only lower-to-upper boundaries split.
pub fn split_camel_case(label: &str) -> String {
    static BOUNDARY: OnceLock<Option<Regex>> = OnceLock::new();
    match BOUNDARY.get_or_init(|| Regex::new(r"([a-z])([A-Z])").ok()) {
        Some(re) => re.replace_all(label, "$1 $2").into_owned(),
        None => label.to_string(),
    }
}

fn infer(
    model: &SharedClassifier,
    input: &FeatureTensor,
) -> Result<Vec<ScoreVector>, RecognitionError> {
    run_shared(model, input).map_err(|e| RecognitionError::model(format!("{:#}", e)))
}

fn required(
    registry: &ClassifierRegistry,
    kind: ModelKind,
) -> Result<SharedClassifier, RecognitionError> {
    registry.get(kind).ok_or_else(|| {
        RecognitionError::configuration(format!("{} model is not loaded", kind.as_str()))
    })
}

// -------------------- Static + movement --------------------

pub struct SignRecognizer {
    static_model: SharedClassifier,
    movement_model: SharedClassifier,
    labels: LabelTable,
    movement_map: MovementIndexMap,
    output_count: usize,
}

impl SignRecognizer {
    pub fn new(
        static_model: SharedClassifier,
        movement_model: SharedClassifier,
        labels: LabelTable,
        movement_map: MovementIndexMap,
        output_count: usize,
    ) -> Self {
        Self {
            static_model,
            movement_model,
            labels,
            movement_map,
            output_count,
        }
    }

    pub fn from_registry(
        registry: &ClassifierRegistry,
        labels: LabelTable,
        movement_map: MovementIndexMap,
        output_count: usize,
    ) -> Result<Self, RecognitionError> {
        Ok(Self::new(
            required(registry, ModelKind::Static)?,
            required(registry, ModelKind::Movement)?,
            labels,
            movement_map,
            output_count,
        ))
    }

    /// Top-N over the static model; label indices are the model's own classes.
    pub fn predict_static(
        &self,
        frame: &LandmarkFrame,
    ) -> Result<Vec<MappedPrediction>, RecognitionError> {
        let input = FeatureTensor::single(normalize_landmarks(frame));
        let scores = first_row(infer(&self.static_model, &input)?)?;
        Ok(top_n(&scores, self.output_count)
            .into_iter()
            .map(|p| MappedPrediction {
                label_index: i32::try_from(p.index).unwrap_or(i32::MAX),
                score: p.score,
            })
            .collect())
    }

    /// Top-N over the movement model, remapped into the label index space.
    /// Unmapped classes stay in the ranking as `INVALID_LABEL`.
    pub fn predict_movement(
        &self,
        window: &MovementWindow,
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<MappedPrediction>, RecognitionError> {
        let input = FeatureTensor::single(encode_movement(window, image_width, image_height)?);
        let scores = first_row(infer(&self.movement_model, &input)?)?;
        Ok(self
            .movement_map
            .remap_ranked(&top_n(&scores, self.output_count)))
    }

    pub fn label(&self, index: i32) -> &str {
        self.labels.label(index)
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Ranking with invalid entries removed and label names attached.
    pub fn visible_predictions(&self, ranked: &[MappedPrediction]) -> Vec<LabeledPrediction> {
        ranked
            .iter()
            .filter(|p| p.is_valid())
            .map(|p| LabeledPrediction {
                label: self.label(p.label_index).to_string(),
                confidence: p.score,
            })
            .collect()
    }
}

fn first_row(rows: Vec<ScoreVector>) -> Result<ScoreVector, RecognitionError> {
    rows.into_iter()
        .next()
        .filter(|row| !row.is_empty())
        .ok_or_else(|| RecognitionError::model("model produced no scores"))
}

// -------------------- Fingerspelling --------------------

/// What one classifier call covers on the fingerspelling path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeGranularity {
    /// One call per landmark frame; texts are concatenated and confidences averaged.
    #[default]
    PerFrame,
    /// One `[frames, width]` call for the whole request.
    WholeSequence,
}

impl DecodeGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerFrame => "per_frame",
            Self::WholeSequence => "whole_sequence",
        }
    }
}

impl FromStr for DecodeGranularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_frame" | "per-frame" | "frame" => Ok(Self::PerFrame),
            "whole_sequence" | "whole-sequence" | "sequence" => Ok(Self::WholeSequence),
            other => Err(anyhow!(
                "unknown decode granularity '{}' (expected per_frame or whole_sequence)",
                other
            )),
        }
    }
}

pub struct FingerspellingRecognizer {
    model: SharedClassifier,
    vocab: Vocabulary,
    frame_width: usize,
    granularity: DecodeGranularity,
}

impl FingerspellingRecognizer {
    pub fn new(
        model: SharedClassifier,
        vocab: Vocabulary,
        frame_width: usize,
        granularity: DecodeGranularity,
    ) -> Self {
        Self {
            model,
            vocab,
            frame_width,
            granularity,
        }
    }

    pub fn from_registry(
        registry: &ClassifierRegistry,
        vocab: Vocabulary,
        frame_width: usize,
        granularity: DecodeGranularity,
    ) -> Result<Self, RecognitionError> {
        Ok(Self::new(
            required(registry, ModelKind::Fingerspelling)?,
            vocab,
            frame_width,
            granularity,
        ))
    }

    pub fn granularity(&self) -> DecodeGranularity {
        self.granularity
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Decode a batch of flattened landmark frames.
    pub fn predict(&self, frames: &[Vec<f32>]) -> Result<Recognition, RecognitionError> {
        if frames.is_empty() {
            return Ok(Recognition::default());
        }
        for (i, frame) in frames.iter().enumerate() {
            if frame.len() != self.frame_width {
                return Err(RecognitionError::input_shape(format!(
                    "frame {} has {} values, expected {}",
                    i,
                    frame.len(),
                    self.frame_width
                )));
            }
        }

        match self.granularity {
            DecodeGranularity::PerFrame => {
                let mut text = String::new();
                let mut confidences = Vec::with_capacity(frames.len());
                for frame in frames {
                    let input = FeatureTensor::single(frame.clone());
                    let decoded = decode_sequence(&infer(&self.model, &input)?, &self.vocab)?;
                    text.push_str(&decoded.text);
                    confidences.push(decoded.confidence);
                }
                Ok(Recognition {
                    text,
                    confidence: mean(&confidences),
                })
            }
            DecodeGranularity::WholeSequence => {
                let flat: Vec<f32> = frames.iter().flatten().copied().collect();
                let input = FeatureTensor::new(vec![frames.len(), self.frame_width], flat)?;
                decode_sequence(&infer(&self.model, &input)?, &self.vocab)
            }
        }
    }
}
