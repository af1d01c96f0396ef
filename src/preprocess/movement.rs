use crate::error::RecognitionError;
use crate::landmark::{MovementWindow, FRAME_FEATURES, MOVEMENT_FEATURES};

use super::normalize::normalize_landmarks;

/// Encode a movement window as motion relative to frame 0.
///
/// Every coordinate has frame 0's coordinate at the same position subtracted,
/// then x values are divided by `image_width` and y values by `image_height`.
/// Frame 0's slice (all zeros after the subtraction) is replaced by the static
/// normalization of the raw frame 0 when its wrist has both coordinates
/// non-zero. A wrist with either coordinate at zero keeps the zero slice.
pub fn encode_movement(
    window: &MovementWindow,
    image_width: u32,
    image_height: u32,
) -> Result<Vec<f32>, RecognitionError> {
    if image_width == 0 || image_height == 0 {
        return Err(RecognitionError::input_shape(format!(
            "image dimensions must be positive, got {}x{}",
            image_width, image_height
        )));
    }
    let width = image_width as f32;
    let height = image_height as f32;

    let start = &window.frames()[0];
    let reference = start.flatten();

    let mut encoded = Vec::with_capacity(MOVEMENT_FEATURES);
    for frame in window.frames() {
        for (i, (value, origin)) in frame.flatten().iter().zip(&reference).enumerate() {
            let scale = if i % 2 == 0 { width } else { height };
            encoded.push((value - origin) / scale);
        }
    }

    let wrist = start.anchor();
    if wrist.x != 0.0 && wrist.y != 0.0 {
        encoded[..FRAME_FEATURES].copy_from_slice(&normalize_landmarks(start));
    }

    Ok(encoded)
}
