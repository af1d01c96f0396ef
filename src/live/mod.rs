//! Live distribution loop.
//!
//! ```text
//! LandmarkSource -> Producer --(slot)--> Broadcaster -> SubscriberSet -> LiveServer
//!                   cooldown              poll + dedup    per-subscriber channels
//! ```
//!
//! The producer and broadcaster share nothing but the single-slot cell; a slow
//! subscriber only delays its own writer thread.

mod broadcast;
mod detector;
mod producer;
mod server;
mod slot;

use std::sync::atomic::{AtomicU64, Ordering};

pub use broadcast::{
    Broadcaster, FanOutReport, SubscriberSet, Subscription, TranslationMessage,
};
pub use detector::{format_translation, Detection, RecognizerDetector, SignDetector};
pub use producer::{CooldownGate, Outcome, Producer};
pub use server::{LiveHandle, LiveServer};
pub use slot::{latest_slot, SlotReader, SlotWriter, Translation};

/// Counters shared by the producer and broadcaster threads.
#[derive(Debug, Default)]
pub struct LiveStats {
    frames: AtomicU64,
    detections: AtomicU64,
    cooldown_skips: AtomicU64,
    failures: AtomicU64,
    broadcasts: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames: u64,
    pub detections: u64,
    pub cooldown_skips: u64,
    pub failures: u64,
    pub broadcasts: u64,
}

impl LiveStats {
    pub(crate) fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_detection(&self) {
        self.detections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cooldown_skip(&self) {
        self.cooldown_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
            cooldown_skips: self.cooldown_skips.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
        }
    }
}
