//! Hand landmark containers.
//!
//! A `LandmarkFrame` always holds exactly `LANDMARK_COUNT` points and a
//! `MovementWindow` exactly `MOVEMENT_FRAMES` frames; both are checked at
//! construction so preprocessing never sees a malformed shape.

use crate::error::RecognitionError;

/// Keypoints per hand (MediaPipe hand topology). Index 0 is the wrist.
pub const LANDMARK_COUNT: usize = 21;
/// Frames in one movement gesture window. Frame 0 is the temporal anchor.
pub const MOVEMENT_FRAMES: usize = 21;
/// Flattened `[x0, y0, x1, y1, ...]` length of one frame.
pub const FRAME_FEATURES: usize = LANDMARK_COUNT * 2;
/// Flattened length of one movement window.
pub const MOVEMENT_FEATURES: usize = FRAME_FEATURES * MOVEMENT_FRAMES;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Landmark {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>) -> Result<Self, RecognitionError> {
        if points.len() != LANDMARK_COUNT {
            return Err(RecognitionError::input_shape(format!(
                "expected {} landmarks per frame, got {}",
                LANDMARK_COUNT,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    pub fn from_pairs(pairs: &[[f32; 2]]) -> Result<Self, RecognitionError> {
        Self::new(pairs.iter().copied().map(Landmark::from).collect())
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// The wrist keypoint.
    pub fn anchor(&self) -> Landmark {
        self.points[0]
    }

    /// Point-major flattening: `[x0, y0, x1, y1, ...]`.
    pub fn flatten(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovementWindow {
    frames: Vec<LandmarkFrame>,
}

impl MovementWindow {
    pub fn new(frames: Vec<LandmarkFrame>) -> Result<Self, RecognitionError> {
        if frames.len() != MOVEMENT_FRAMES {
            return Err(RecognitionError::input_shape(format!(
                "expected {} frames per movement window, got {}",
                MOVEMENT_FRAMES,
                frames.len()
            )));
        }
        Ok(Self { frames })
    }

    pub fn from_pairs(frames: &[Vec<[f32; 2]>]) -> Result<Self, RecognitionError> {
        let frames = frames
            .iter()
            .enumerate()
            .map(|(i, pairs)| {
                LandmarkFrame::from_pairs(pairs).map_err(|e| {
                    RecognitionError::input_shape(format!("frame {}: {}", i, e.message()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(frames)
    }

    pub fn frames(&self) -> &[LandmarkFrame] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_landmark_count() {
        let err = LandmarkFrame::new(vec![Landmark::default(); 20]).unwrap_err();
        assert_eq!(err.kind(), "input_shape_error");
    }

    #[test]
    fn flatten_is_point_major() {
        let pairs: Vec<[f32; 2]> = (0..LANDMARK_COUNT)
            .map(|i| [i as f32, 100.0 + i as f32])
            .collect();
        let frame = LandmarkFrame::from_pairs(&pairs).unwrap();
        let flat = frame.flatten();
        assert_eq!(flat.len(), FRAME_FEATURES);
        assert_eq!(&flat[..4], &[0.0, 100.0, 1.0, 101.0]);
    }

    #[test]
    fn window_reports_bad_frame_index() {
        let mut frames = vec![vec![[0.0, 0.0]; LANDMARK_COUNT]; MOVEMENT_FRAMES];
        frames[3].pop();
        let err = MovementWindow::from_pairs(&frames).unwrap_err();
        assert!(err.message().starts_with("frame 3:"));
    }

    #[test]
    fn window_rejects_wrong_frame_count() {
        let frame = LandmarkFrame::new(vec![Landmark::default(); LANDMARK_COUNT]).unwrap();
        assert!(MovementWindow::new(vec![frame; MOVEMENT_FRAMES - 1]).is_err());
    }
}
