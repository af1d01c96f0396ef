use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::slot::SlotReader;
use super::LiveStats;

type Outbox = Sender<Arc<str>>;

/// Wire form of one broadcast, sent as a single JSON line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranslationMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub timestamp: f64,
}

impl TranslationMessage {
    pub fn new(text: impl Into<String>, timestamp: f64) -> Self {
        Self {
            kind: "translation".to_string(),
            text: text.into(),
            timestamp,
        }
    }
}

/// Receiving end handed to one subscriber's writer.
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub receiver: Receiver<Arc<str>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Connected subscribers, each fed through its own unbounded channel.
///
/// Sending never blocks; a subscriber whose receiver is gone is dropped from
/// the set on the next broadcast.
#[derive(Clone, Debug, Default)]
pub struct SubscriberSet {
    outboxes: Arc<Mutex<HashMap<u64, Outbox>>>,
    next_id: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn outboxes(&self) -> MutexGuard<'_, HashMap<u64, Outbox>> {
        self.outboxes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a subscriber. It only sees messages broadcast from now on.
    /// After `close()` the returned receiver is already disconnected.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        if !self.closed.load(Ordering::SeqCst) {
            self.outboxes().insert(id, tx);
        }
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        self.outboxes().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.outboxes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn broadcast(&self, message: &str) -> FanOutReport {
        let message: Arc<str> = Arc::from(message);
        let mut report = FanOutReport::default();
        self.outboxes().retain(|id, outbox| match outbox.send(message.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(_) => {
                log::debug!("subscriber {} disconnected", id);
                report.dropped += 1;
                false
            }
        });
        report
    }

    /// Drop every outbox; writers see their channel close.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.outboxes().clear();
    }
}

/// Timer-cadence half of the live loop.
pub struct Broadcaster {
    reader: SlotReader,
    subscribers: SubscriberSet,
    last_sent: Option<String>,
    stats: Arc<LiveStats>,
}

impl Broadcaster {
    pub fn new(reader: SlotReader, subscribers: SubscriberSet, stats: Arc<LiveStats>) -> Self {
        Self {
            reader,
            subscribers,
            last_sent: None,
            stats,
        }
    }

    /// Send the slot content if its text differs from the last broadcast.
    /// Returns the serialized message when one went out.
    pub fn poll_once(&mut self) -> Option<String> {
        let latest = self.reader.latest()?;
        if self.last_sent.as_deref() == Some(latest.text.as_str()) {
            return None;
        }
        let message = TranslationMessage::new(latest.text.clone(), latest.timestamp);
        let line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(err) => {
                log::error!("failed to encode translation: {}", err);
                return None;
            }
        };
        self.last_sent = Some(latest.text.clone());
        let report = self.subscribers.broadcast(&line);
        self.stats.record_broadcast();
        log::info!(
            "broadcast '{}' to {} subscribers ({} dropped)",
            latest.text,
            report.delivered,
            report.dropped
        );
        Some(line)
    }

    pub fn run(&mut self, shutdown: &AtomicBool, interval: Duration) {
        while !shutdown.load(Ordering::SeqCst) {
            self.poll_once();
            std::thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::slot::{latest_slot, Translation};

    #[test]
    fn dead_subscribers_are_pruned() {
        let set = SubscriberSet::new();
        let keep = set.subscribe();
        let gone = set.subscribe();
        drop(gone.receiver);

        let report = set.broadcast("hello");
        assert_eq!(report, FanOutReport { delivered: 1, dropped: 1 });
        assert_eq!(set.len(), 1);
        assert_eq!(&*keep.receiver.recv().unwrap(), "hello");
    }

    #[test]
    fn close_disconnects_everyone() {
        let set = SubscriberSet::new();
        let sub = set.subscribe();
        set.close();
        assert!(set.is_empty());
        assert!(sub.receiver.recv().is_err());
        assert!(set.subscribe().receiver.recv().is_err());
    }

    #[test]
    fn unchanged_text_is_not_rebroadcast() {
        let (writer, reader) = latest_slot();
        let set = SubscriberSet::new();
        let sub = set.subscribe();
        let mut broadcaster = Broadcaster::new(reader, set, Arc::new(LiveStats::default()));

        assert!(broadcaster.poll_once().is_none());
        writer.publish(Translation {
            text: "Yes (0.80)".to_string(),
            confidence: 0.8,
            timestamp: 12.5,
        });
        let line = broadcaster.poll_once().unwrap();
        let message: TranslationMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(message, TranslationMessage::new("Yes (0.80)", 12.5));
        assert!(broadcaster.poll_once().is_none());
        assert_eq!(&*sub.receiver.recv().unwrap(), line.as_str());
        assert!(sub.receiver.try_recv().is_err());
    }

    #[test]
    fn message_has_type_field() {
        let line = serde_json::to_string(&TranslationMessage::new("A (1.00)", 1.0)).unwrap();
        assert!(line.starts_with(r#"{"type":"translation","#));
    }
}
