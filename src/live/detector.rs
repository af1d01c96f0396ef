use std::collections::VecDeque;

use anyhow::Result;

use crate::classify::MappedPrediction;
use crate::landmark::{LandmarkFrame, MovementWindow, MOVEMENT_FRAMES};
use crate::recognizer::{split_camel_case, LabeledPrediction, SignRecognizer};

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

/// Per-frame sign detection used by the live producer.
///
/// `Ok(None)` means nothing recognisable in the frame. Errors are logged by the
/// producer and never stop the loop.
pub trait SignDetector: Send {
    fn detect(&mut self, frame: &LandmarkFrame) -> Result<Option<Detection>>;
}

impl<F> SignDetector for F
where
    F: FnMut(&LandmarkFrame) -> Result<Option<Detection>> + Send,
{
    fn detect(&mut self, frame: &LandmarkFrame) -> Result<Option<Detection>> {
        self(frame)
    }
}

/// Static-model detection: best valid label of the Top-N ranking.
///
/// With `with_movement`, the last `MOVEMENT_FRAMES` frames are also run
/// through the movement model once the window is full, and the more
/// confident of the two answers wins.
pub struct RecognizerDetector {
    recognizer: SignRecognizer,
    movement: Option<MovementTracker>,
}

struct MovementTracker {
    image_width: u32,
    image_height: u32,
    frames: VecDeque<LandmarkFrame>,
}

impl MovementTracker {
    fn push(&mut self, frame: &LandmarkFrame) -> Option<MovementWindow> {
        if self.frames.len() == MOVEMENT_FRAMES {
            self.frames.pop_front();
        }
        self.frames.push_back(frame.clone());
        if self.frames.len() < MOVEMENT_FRAMES {
            return None;
        }
        MovementWindow::new(self.frames.iter().cloned().collect()).ok()
    }
}

impl RecognizerDetector {
    pub fn new(recognizer: SignRecognizer) -> Self {
        Self {
            recognizer,
            movement: None,
        }
    }

    /// Enable movement detection for frames captured at the given image size.
    pub fn with_movement(mut self, image_width: u32, image_height: u32) -> Self {
        self.movement = Some(MovementTracker {
            image_width,
            image_height,
            frames: VecDeque::with_capacity(MOVEMENT_FRAMES),
        });
        self
    }

    fn best(&self, ranked: &[MappedPrediction]) -> Option<LabeledPrediction> {
        self.recognizer.visible_predictions(ranked).into_iter().next()
    }
}

impl SignDetector for RecognizerDetector {
    fn detect(&mut self, frame: &LandmarkFrame) -> Result<Option<Detection>> {
        let ranked = self.recognizer.predict_static(frame)?;
        let mut best = self.best(&ranked);

        let window = self.movement.as_mut().and_then(|tracker| {
            tracker
                .push(frame)
                .map(|window| (window, tracker.image_width, tracker.image_height))
        });
        if let Some((window, width, height)) = window {
            let ranked = self.recognizer.predict_movement(&window, width, height)?;
            if let Some(moving) = self.best(&ranked) {
                if best.as_ref().map_or(true, |b| moving.confidence > b.confidence) {
                    best = Some(moving);
                }
            }
        }

        Ok(best.map(|best| Detection {
            label: best.label,
            confidence: best.confidence.clamp(0.0, 1.0),
        }))
    }
}

/// Text pushed to subscribers, e.g. `"Thank You (0.92)"`.
pub fn format_translation(detection: &Detection) -> String {
    format!(
        "{} ({:.2})",
        split_camel_case(&detection.label),
        detection.confidence
    )
}
