use crate::landmark::LandmarkFrame;

/// Wrist-relative, max-abs scaled feature vector for a static sign.
///
/// Point 0 becomes `(0, 0)`; every value ends up in `[-1, 1]`. An all-zero
/// frame is returned unscaled. Inputs are assumed finite.
pub fn normalize_landmarks(frame: &LandmarkFrame) -> Vec<f32> {
    let anchor = frame.anchor();
    let mut values: Vec<f32> = frame
        .points()
        .iter()
        .flat_map(|p| [p.x - anchor.x, p.y - anchor.y])
        .collect();

    let max_value = values.iter().fold(0.0_f32, |max, v| max.max(v.abs()));
    if max_value != 0.0 {
        for v in &mut values {
            *v /= max_value;
        }
    }
    values
}
