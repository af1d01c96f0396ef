//! asl_live - live sign translation broadcaster
//!
//! This daemon:
//! 1. Loads the sign models and label table (refuses to start without them)
//! 2. Pulls landmark frames from the configured source at the target fps
//! 3. Detects signs with a cooldown and keeps only the latest result
//! 4. Pushes every new translation to connected TCP subscribers as JSON lines

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use asl_relay::{
    ingest::open_source,
    live::{
        latest_slot, Broadcaster, LiveServer, LiveStats, Producer, RecognizerDetector,
        SubscriberSet,
    },
    service::load_sign_recognizer,
    ServiceConfig,
};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Broadcast live ASL translations to subscribers")]
struct Args {
    /// Config file (TOML or JSON).
    #[arg(long, env = "ASL_CONFIG")]
    config: Option<PathBuf>,

    /// Subscriber listen address; overrides the config file.
    #[arg(long)]
    addr: Option<String>,

    /// Landmark source (stub://... or a JSON lines file); overrides the config file.
    #[arg(long)]
    source: Option<String>,

    /// Model directory; overrides the config file.
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ServiceConfig::load_from(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.live.addr = addr;
    }
    if let Some(source) = args.source {
        config.live.source_url = source;
    }
    if let Some(dir) = args.model_dir {
        config.models.dir = dir;
    }
    let live = config.live.clone();

    let recognizer = load_sign_recognizer(&config.models)
        .map_err(|e| anyhow!("sign model unavailable: {}", e))?;
    log::info!("sign model loaded: {} labels", recognizer.labels().len());

    let mut source = open_source(&live.source_url)?;
    let stats = Arc::new(LiveStats::default());
    let shutdown = Arc::new(AtomicBool::new(false));
    let (writer, reader) = latest_slot();
    let subscribers = SubscriberSet::new();

    let live_handle = LiveServer::new(live.addr.clone(), subscribers.clone()).spawn()?;
    log::info!("live subscribers accepted on {}", live_handle.addr);

    let producer_thread = {
        let shutdown = shutdown.clone();
        let stats = stats.clone();
        let frame_interval = Duration::from_secs(1) / live.target_fps;
        let detector = RecognizerDetector::new(recognizer)
            .with_movement(live.image_width, live.image_height);
        let mut producer = Producer::new(detector, writer, live.cooldown, stats);
        std::thread::spawn(move || {
            let result = producer.run(&mut *source, &shutdown, frame_interval);
            if let Err(err) = &result {
                log::error!("producer stopped: {:#}", err);
            }
            result
        })
    };

    let broadcaster_thread = {
        let shutdown = shutdown.clone();
        let mut broadcaster = Broadcaster::new(reader, subscribers, stats.clone());
        let interval = live.poll_interval;
        std::thread::spawn(move || broadcaster.run(&shutdown, interval))
    };

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!(
        "asl_live running. source={} cooldown={:?} poll={:?}",
        live.source_url,
        live.cooldown,
        live.poll_interval
    );
    let mut last = stats.snapshot();
    loop {
        match rx.recv_timeout(HEALTH_LOG_INTERVAL) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
        let now = stats.snapshot();
        let fps = (now.frames - last.frames) as f64 / HEALTH_LOG_INTERVAL.as_secs_f64();
        log::info!(
            "live health frames={} detections={} cooldown_skips={} failures={} broadcasts={} subscribers={} fps={:.1}",
            now.frames,
            now.detections,
            now.cooldown_skips,
            now.failures,
            now.broadcasts,
            live_handle.subscriber_count(),
            fps
        );
        last = now;
        if producer_thread.is_finished() {
            log::warn!("producer finished; shutting down");
            break;
        }
    }

    log::info!("shutdown signal received, stopping live loop...");
    shutdown.store(true, Ordering::SeqCst);
    let produced = producer_thread
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;
    broadcaster_thread
        .join()
        .map_err(|_| anyhow!("broadcaster thread panicked"))?;
    live_handle.stop()?;
    produced.context("landmark source failed")
}
