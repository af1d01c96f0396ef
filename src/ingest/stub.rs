use anyhow::Result;

use super::{LandmarkSource, SourceStats};
use crate::landmark::{Landmark, LandmarkFrame, LANDMARK_COUNT};

/// Frames spent in each pose before switching.
const POSE_FRAMES: u64 = 45;

/// Synthetic hand for tests and demos.
///
/// Produces an open palm and a closed fist in turn, so a detector sees the
/// input change every `POSE_FRAMES` frames.
pub struct StubSource {
    url: String,
    frame_count: u64,
}

impl StubSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            frame_count: 0,
        }
    }

    fn pose(&self) -> Vec<Landmark> {
        let open = (self.frame_count / POSE_FRAMES) % 2 == 0;
        let spread = if open { 18.0 } else { 6.0 };
        let wrist = Landmark::new(240.0, 600.0);
        let mut points = Vec::with_capacity(LANDMARK_COUNT);
        points.push(wrist);
        // five fingers of four joints each, fanned out above the wrist
        for finger in 0..5 {
            let angle = (finger as f32 - 2.0) * 0.3;
            for joint in 1..=4 {
                let reach = spread * joint as f32 + 20.0;
                points.push(Landmark::new(
                    wrist.x + reach * angle.sin(),
                    wrist.y - reach * angle.cos(),
                ));
            }
        }
        points
    }
}

impl LandmarkSource for StubSource {
    fn connect(&mut self) -> Result<()> {
        log::info!("StubSource: connected to {} (synthetic)", self.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        let frame = LandmarkFrame::new(self.pose())?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.url.clone(),
        }
    }
}
