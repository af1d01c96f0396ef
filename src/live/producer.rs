use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;

use super::detector::{format_translation, SignDetector};
use super::slot::{SlotWriter, Translation};
use super::LiveStats;
use crate::ingest::LandmarkSource;
use crate::landmark::LandmarkFrame;

/// Minimum spacing between detection attempts.
///
/// The clock restarts on every attempt that passes the gate, whether or not
/// the detector finds anything.
#[derive(Clone, Debug)]
pub struct CooldownGate {
    interval: Duration,
    last: Option<Instant>,
}

impl CooldownGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn try_enter(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// What happened to one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    CoolingDown,
    NoDetection,
    Published(Translation),
    Failed,
}

/// Frame-cadence half of the live loop: detect, then replace the slot.
pub struct Producer<D> {
    detector: D,
    gate: CooldownGate,
    writer: SlotWriter,
    stats: Arc<LiveStats>,
}

impl<D: SignDetector> Producer<D> {
    pub fn new(detector: D, writer: SlotWriter, cooldown: Duration, stats: Arc<LiveStats>) -> Self {
        Self {
            detector,
            gate: CooldownGate::new(cooldown),
            writer,
            stats,
        }
    }

    pub fn process(&mut self, frame: &LandmarkFrame) -> Outcome {
        self.process_at(frame, Instant::now(), unix_now())
    }

    /// `now` drives the cooldown; `timestamp` is stored with the translation.
    pub fn process_at(&mut self, frame: &LandmarkFrame, now: Instant, timestamp: f64) -> Outcome {
        self.stats.record_frame();
        if !self.gate.try_enter(now) {
            self.stats.record_cooldown_skip();
            return Outcome::CoolingDown;
        }
        match self.detector.detect(frame) {
            Ok(Some(detection)) if detection.confidence > 0.0 => {
                let translation = Translation {
                    text: format_translation(&detection),
                    confidence: detection.confidence,
                    timestamp,
                };
                log::debug!("detected {}", translation.text);
                self.writer.publish(translation.clone());
                self.stats.record_detection();
                Outcome::Published(translation)
            }
            Ok(_) => Outcome::NoDetection,
            Err(err) => {
                log::warn!("sign detection failed: {:#}", err);
                self.stats.record_failure();
                Outcome::Failed
            }
        }
    }

    /// Pull frames until shutdown or until the source is exhausted, paced to
    /// one frame per `frame_interval`.
    pub fn run(
        &mut self,
        source: &mut dyn LandmarkSource,
        shutdown: &AtomicBool,
        frame_interval: Duration,
    ) -> Result<()> {
        source.connect()?;
        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();
            match source.next_frame() {
                Ok(Some(frame)) => {
                    self.process(&frame);
                }
                Ok(None) => {
                    log::info!(
                        "landmark source exhausted after {} frames",
                        source.stats().frames_captured
                    );
                    break;
                }
                Err(err) => {
                    log::warn!("landmark source error: {:#}", err);
                    self.stats.record_failure();
                }
            }
            if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        Ok(())
    }
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::landmark::Landmark;
    use crate::live::detector::Detection;
    use crate::live::slot::latest_slot;

    fn frame() -> LandmarkFrame {
        LandmarkFrame::new(vec![Landmark::new(1.0, 1.0); 21]).unwrap()
    }

    #[test]
    fn gate_restarts_on_each_attempt() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(Duration::from_millis(500));
        assert!(gate.try_enter(t0));
        assert!(!gate.try_enter(t0 + Duration::from_millis(499)));
        assert!(gate.try_enter(t0 + Duration::from_millis(500)));
        assert!(!gate.try_enter(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn zero_confidence_is_not_published() {
        let (writer, reader) = latest_slot();
        let stats = Arc::new(LiveStats::default());
        let detector = |_: &LandmarkFrame| -> Result<Option<Detection>> {
            Ok(Some(Detection {
                label: "A".to_string(),
                confidence: 0.0,
            }))
        };
        let mut producer = Producer::new(detector, writer, Duration::from_millis(10), stats);
        assert_eq!(producer.process(&frame()), Outcome::NoDetection);
        assert!(reader.latest().is_none());
    }

    #[test]
    fn detector_errors_are_counted_and_survived() {
        let (writer, reader) = latest_slot();
        let stats = Arc::new(LiveStats::default());
        let mut fail = true;
        let detector = move |_: &LandmarkFrame| -> Result<Option<Detection>> {
            if std::mem::replace(&mut fail, false) {
                Err(anyhow!("model crashed"))
            } else {
                Ok(Some(Detection {
                    label: "B".to_string(),
                    confidence: 0.5,
                }))
            }
        };
        let mut producer =
            Producer::new(detector, writer, Duration::from_millis(100), stats.clone());
        let t0 = Instant::now();
        assert_eq!(producer.process_at(&frame(), t0, 1.0), Outcome::Failed);
        let outcome = producer.process_at(&frame(), t0 + Duration::from_millis(100), 1.1);
        assert!(matches!(outcome, Outcome::Published(_)));
        assert_eq!(reader.latest().unwrap().text, "B (0.50)");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames, 2);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.detections, 1);
    }
}
