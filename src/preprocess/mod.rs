//! Landmark preprocessing.
//!
//! Turns raw keypoints into the flat feature vectors the classifiers were
//! exported with:
//! - `normalize_landmarks`: one frame, translation + scale invariant (42 values)
//! - `encode_movement`: one window, motion relative to frame 0 (882 values)

mod movement;
mod normalize;

pub use movement::encode_movement;
pub use normalize::normalize_landmarks;
