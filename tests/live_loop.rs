use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use asl_relay::landmark::{Landmark, LandmarkFrame};
use asl_relay::live::{
    latest_slot, Broadcaster, Detection, LiveStats, Outcome, Producer, SubscriberSet,
    TranslationMessage,
};

const COOLDOWN: Duration = Duration::from_millis(500);

fn frame(x: f32) -> LandmarkFrame {
    LandmarkFrame::new(vec![Landmark::new(x, 1.0); 21]).unwrap()
}

/// Reads the label from the wrist x coordinate: 1.0 -> "Hello", 2.0 -> "ThankYou".
fn scripted(frame: &LandmarkFrame) -> Result<Option<Detection>> {
    let label = match frame.anchor().x as u32 {
        1 => "Hello",
        2 => "ThankYou",
        _ => return Ok(None),
    };
    Ok(Some(Detection {
        label: label.to_string(),
        confidence: 0.9,
    }))
}

#[test]
fn cooldown_and_dedup_yield_two_broadcasts() {
    let (writer, reader) = latest_slot();
    let stats = Arc::new(LiveStats::default());
    let subscribers = SubscriberSet::new();
    let sub = subscribers.subscribe();
    let mut producer = Producer::new(scripted, writer, COOLDOWN, stats.clone());
    let mut broadcaster = Broadcaster::new(reader, subscribers, stats.clone());

    let t0 = Instant::now();
    let at = |secs: f64| t0 + Duration::from_secs_f64(secs);

    // D1 at 0.0s
    assert!(matches!(
        producer.process_at(&frame(1.0), at(0.0), 100.0),
        Outcome::Published(_)
    ));
    assert!(broadcaster.poll_once().is_some());

    // D1 again at 0.2s: inside the cooldown, the detector is not consulted
    assert_eq!(
        producer.process_at(&frame(1.0), at(0.2), 100.2),
        Outcome::CoolingDown
    );
    assert!(broadcaster.poll_once().is_none());

    // D2 at 0.7s
    assert!(matches!(
        producer.process_at(&frame(2.0), at(0.7), 100.7),
        Outcome::Published(_)
    ));
    assert!(broadcaster.poll_once().is_some());
    assert!(broadcaster.poll_once().is_none());

    let received: Vec<TranslationMessage> = sub
        .receiver
        .try_iter()
        .map(|line| serde_json::from_str(&line).unwrap())
        .collect();
    assert_eq!(
        received,
        vec![
            TranslationMessage::new("Hello (0.90)", 100.0),
            TranslationMessage::new("Thank You (0.90)", 100.7),
        ]
    );

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.frames, 3);
    assert_eq!(snapshot.detections, 2);
    assert_eq!(snapshot.cooldown_skips, 1);
    assert_eq!(snapshot.broadcasts, 2);
}

#[test]
fn repeated_detection_after_cooldown_is_not_rebroadcast() {
    let (writer, reader) = latest_slot();
    let stats = Arc::new(LiveStats::default());
    let subscribers = SubscriberSet::new();
    let sub = subscribers.subscribe();
    let mut producer = Producer::new(scripted, writer, COOLDOWN, stats.clone());
    let mut broadcaster = Broadcaster::new(reader, subscribers, stats);

    let t0 = Instant::now();
    producer.process_at(&frame(1.0), t0, 1.0);
    broadcaster.poll_once();
    producer.process_at(&frame(1.0), t0 + Duration::from_secs(1), 2.0);
    assert!(broadcaster.poll_once().is_none());
    assert_eq!(sub.receiver.try_iter().count(), 1);
}

#[test]
fn late_subscriber_sees_only_future_changes() {
    let (writer, reader) = latest_slot();
    let stats = Arc::new(LiveStats::default());
    let subscribers = SubscriberSet::new();
    let mut producer = Producer::new(scripted, writer, COOLDOWN, stats.clone());
    let mut broadcaster = Broadcaster::new(reader, subscribers.clone(), stats);

    let t0 = Instant::now();
    producer.process_at(&frame(1.0), t0, 1.0);
    // nobody listening yet; the change is consumed anyway
    assert!(broadcaster.poll_once().is_some());

    let late = subscribers.subscribe();
    assert!(broadcaster.poll_once().is_none());
    assert!(late.receiver.try_recv().is_err());

    producer.process_at(&frame(2.0), t0 + Duration::from_secs(1), 2.0);
    broadcaster.poll_once();
    let line = late.receiver.try_recv().unwrap();
    let message: TranslationMessage = serde_json::from_str(&line).unwrap();
    assert_eq!(message.text, "Thank You (0.90)");
    assert!(late.receiver.try_recv().is_err());
}

#[test]
fn subscribers_churn_during_broadcasts() {
    let subscribers = SubscriberSet::new();
    let stop = Arc::new(AtomicBool::new(false));

    let churn = {
        let subscribers = subscribers.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut joined = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let sub = subscribers.subscribe();
                if joined % 2 == 0 {
                    subscribers.unsubscribe(sub.id);
                } else {
                    drop(sub.receiver);
                }
                joined += 1;
            }
            joined
        })
    };

    let steady = subscribers.subscribe();
    for i in 0..500 {
        let report = subscribers.broadcast(&format!("message {}", i));
        assert!(report.delivered >= 1);
    }
    stop.store(true, Ordering::SeqCst);
    churn.join().unwrap();
    assert_eq!(steady.receiver.try_iter().count(), 500);
}

#[test]
fn broadcaster_thread_stops_on_shutdown() {
    let (writer, reader) = latest_slot();
    let stats = Arc::new(LiveStats::default());
    let subscribers = SubscriberSet::new();
    let sub = subscribers.subscribe();
    let shutdown = Arc::new(AtomicBool::new(false));

    let handle = {
        let shutdown = shutdown.clone();
        let mut broadcaster = Broadcaster::new(reader, subscribers, stats.clone());
        thread::spawn(move || broadcaster.run(&shutdown, Duration::from_millis(10)))
    };

    let mut producer = Producer::new(scripted, writer, COOLDOWN, stats.clone());
    producer.process(&frame(2.0));
    let line = sub
        .receiver
        .recv_timeout(Duration::from_secs(2))
        .expect("broadcast");
    assert!(line.contains("Thank You (0.90)"));

    shutdown.store(true, Ordering::SeqCst);
    handle.join().unwrap();
    assert_eq!(stats.snapshot().broadcasts, 1);
}
