use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use asl_relay::config::ServiceConfig;
use asl_relay::recognizer::DecodeGranularity;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ASL_CONFIG",
        "ASL_MODEL_DIR",
        "ASL_API_ADDR",
        "ASL_LIVE_ADDR",
        "ASL_SOURCE_URL",
        "ASL_COOLDOWN_MS",
        "ASL_POLL_INTERVAL_MS",
        "ASL_OUTPUT_COUNT",
        "ASL_DECODE_GRANULARITY",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ServiceConfig::load().expect("load config");
    assert_eq!(cfg.api_addr, "0.0.0.0:8000");
    assert_eq!(cfg.live.addr, "0.0.0.0:8765");
    assert_eq!(cfg.live.source_url, "stub://hand");
    assert_eq!(cfg.live.cooldown, Duration::from_millis(500));
    assert_eq!(cfg.live.poll_interval, Duration::from_millis(100));
    assert_eq!((cfg.live.image_width, cfg.live.image_height), (480, 780));
    assert_eq!(cfg.models.output_count, 5);
    assert_eq!(cfg.models.movement_map.remap(&[0, 1, 2]), vec![-1, 9, 25]);
    assert_eq!(cfg.models.labels_path(), PathBuf::from("models/label.csv"));
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "models": {
            "dir": "/srv/asl",
            "output_count": 3,
            "decode_granularity": "whole_sequence",
            "movement_map": {"0": -1, "1": 9, "2": 25, "3": 4}
        },
        "api": {"addr": "127.0.0.1:9100"},
        "live": {
            "source_url": "stub://left_hand",
            "cooldown_ms": 750,
            "target_fps": 15
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("ASL_CONFIG", file.path());
    std::env::set_var("ASL_COOLDOWN_MS", "250");
    std::env::set_var("ASL_LIVE_ADDR", "127.0.0.1:9200");

    let cfg = ServiceConfig::load().expect("load config");
    assert_eq!(cfg.api_addr, "127.0.0.1:9100");
    assert_eq!(cfg.live.addr, "127.0.0.1:9200");
    assert_eq!(cfg.live.source_url, "stub://left_hand");
    assert_eq!(cfg.live.cooldown, Duration::from_millis(250));
    assert_eq!(cfg.live.target_fps, 15);
    assert_eq!(cfg.models.output_count, 3);
    assert_eq!(cfg.models.decode_granularity, DecodeGranularity::WholeSequence);
    assert_eq!(cfg.models.movement_map.get(3), 4);
    assert_eq!(
        cfg.models.static_model_path(),
        PathBuf::from("/srv/asl/static.onnx")
    );

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[models]
dir = "weights"
labels = "/etc/asl/labels.csv"

[live]
poll_interval_ms = 40
image_width = 640
image_height = 480
"#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("ASL_DECODE_GRANULARITY", "per_frame");

    let cfg = ServiceConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.models.dir, PathBuf::from("weights"));
    assert_eq!(cfg.models.labels_path(), PathBuf::from("/etc/asl/labels.csv"));
    assert_eq!(
        cfg.models.character_map_path(),
        PathBuf::from("weights/character_to_prediction_index.json")
    );
    assert_eq!(cfg.live.poll_interval, Duration::from_millis(40));
    assert_eq!((cfg.live.image_width, cfg.live.image_height), (640, 480));
    assert_eq!(cfg.models.decode_granularity, DecodeGranularity::PerFrame);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ASL_COOLDOWN_MS", "soon");
    assert!(ServiceConfig::load().is_err());
    clear_env();

    std::env::set_var("ASL_OUTPUT_COUNT", "0");
    assert!(ServiceConfig::load().is_err());
    clear_env();

    std::env::set_var("ASL_DECODE_GRANULARITY", "sometimes");
    assert!(ServiceConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{"live": {"target_fps": 0}}"#)
        .expect("write config");
    assert!(ServiceConfig::load_from(Some(file.path())).is_err());

    clear_env();
}
