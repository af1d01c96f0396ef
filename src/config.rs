use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::MovementIndexMap;
use crate::recognizer::DecodeGranularity;

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_API_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_LIVE_ADDR: &str = "0.0.0.0:8765";
const DEFAULT_SOURCE_URL: &str = "stub://hand";
const DEFAULT_COOLDOWN_MS: u64 = 500;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_IMAGE_WIDTH: u32 = 480;
const DEFAULT_IMAGE_HEIGHT: u32 = 780;
const DEFAULT_OUTPUT_COUNT: usize = 5;

const DEFAULT_STATIC_MODEL: &str = "static.onnx";
const DEFAULT_MOVEMENT_MODEL: &str = "movement.onnx";
const DEFAULT_FINGERSPELLING_MODEL: &str = "fingerspelling.onnx";
const DEFAULT_LABELS: &str = "label.csv";
const DEFAULT_CHARACTER_MAP: &str = "character_to_prediction_index.json";
const DEFAULT_INFERENCE_ARGS: &str = "inference_args.json";

#[derive(Debug, Deserialize, Default)]
struct ServiceConfigFile {
    models: Option<ModelsConfigFile>,
    api: Option<ApiConfigFile>,
    live: Option<LiveConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    dir: Option<PathBuf>,
    static_model: Option<PathBuf>,
    movement_model: Option<PathBuf>,
    fingerspelling_model: Option<PathBuf>,
    labels: Option<PathBuf>,
    character_map: Option<PathBuf>,
    inference_args: Option<PathBuf>,
    output_count: Option<usize>,
    decode_granularity: Option<DecodeGranularity>,
    /// Movement class -> label index. Keys are strings in both TOML and JSON.
    movement_map: Option<HashMap<String, i32>>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LiveConfigFile {
    addr: Option<String>,
    source_url: Option<String>,
    cooldown_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    target_fps: Option<u32>,
    image_width: Option<u32>,
    image_height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub models: ModelSettings,
    pub api_addr: String,
    pub live: LiveSettings,
}

/// Where the model artefacts live and how their output is post-processed.
/// Relative file names are resolved against `dir` by the `*_path` accessors.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub static_model: PathBuf,
    pub movement_model: PathBuf,
    pub fingerspelling_model: PathBuf,
    pub labels: PathBuf,
    pub character_map: PathBuf,
    pub inference_args: PathBuf,
    pub output_count: usize,
    pub decode_granularity: DecodeGranularity,
    pub movement_map: MovementIndexMap,
}

#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub addr: String,
    pub source_url: String,
    pub cooldown: Duration,
    pub poll_interval: Duration,
    pub target_fps: u32,
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_MODEL_DIR),
            static_model: PathBuf::from(DEFAULT_STATIC_MODEL),
            movement_model: PathBuf::from(DEFAULT_MOVEMENT_MODEL),
            fingerspelling_model: PathBuf::from(DEFAULT_FINGERSPELLING_MODEL),
            labels: PathBuf::from(DEFAULT_LABELS),
            character_map: PathBuf::from(DEFAULT_CHARACTER_MAP),
            inference_args: PathBuf::from(DEFAULT_INFERENCE_ARGS),
            output_count: DEFAULT_OUTPUT_COUNT,
            decode_granularity: DecodeGranularity::default(),
            movement_map: MovementIndexMap::default(),
        }
    }
}

impl ModelSettings {
    /// Settings rooted at `dir` with default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.dir.join(file)
        }
    }

    pub fn static_model_path(&self) -> PathBuf {
        self.resolve(&self.static_model)
    }

    pub fn movement_model_path(&self) -> PathBuf {
        self.resolve(&self.movement_model)
    }

    pub fn fingerspelling_model_path(&self) -> PathBuf {
        self.resolve(&self.fingerspelling_model)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.resolve(&self.labels)
    }

    pub fn character_map_path(&self) -> PathBuf {
        self.resolve(&self.character_map)
    }

    pub fn inference_args_path(&self) -> PathBuf {
        self.resolve(&self.inference_args)
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            addr: DEFAULT_LIVE_ADDR.to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            target_fps: DEFAULT_TARGET_FPS,
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
        }
    }
}

impl ServiceConfig {
    /// Optional file from `ASL_CONFIG`, then `ASL_*` overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = env_value("ASL_CONFIG").map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like `load`, with the config file chosen by the caller.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ServiceConfigFile) -> Result<Self> {
        let defaults = ModelSettings::default();
        let models = file.models.unwrap_or_default();
        let movement_map = match models.movement_map {
            Some(raw) => parse_movement_map(raw)?,
            None => defaults.movement_map,
        };
        let models = ModelSettings {
            dir: models.dir.unwrap_or(defaults.dir),
            static_model: models.static_model.unwrap_or(defaults.static_model),
            movement_model: models.movement_model.unwrap_or(defaults.movement_model),
            fingerspelling_model: models
                .fingerspelling_model
                .unwrap_or(defaults.fingerspelling_model),
            labels: models.labels.unwrap_or(defaults.labels),
            character_map: models.character_map.unwrap_or(defaults.character_map),
            inference_args: models.inference_args.unwrap_or(defaults.inference_args),
            output_count: models.output_count.unwrap_or(defaults.output_count),
            decode_granularity: models
                .decode_granularity
                .unwrap_or(defaults.decode_granularity),
            movement_map,
        };

        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());

        let defaults = LiveSettings::default();
        let live = file.live.unwrap_or_default();
        let live = LiveSettings {
            addr: live.addr.unwrap_or(defaults.addr),
            source_url: live.source_url.unwrap_or(defaults.source_url),
            cooldown: live
                .cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.cooldown),
            poll_interval: live
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            target_fps: live.target_fps.unwrap_or(defaults.target_fps),
            image_width: live.image_width.unwrap_or(defaults.image_width),
            image_height: live.image_height.unwrap_or(defaults.image_height),
        };

        Ok(Self {
            models,
            api_addr,
            live,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(dir) = env_value("ASL_MODEL_DIR") {
            self.models.dir = PathBuf::from(dir);
        }
        if let Some(addr) = env_value("ASL_API_ADDR") {
            self.api_addr = addr;
        }
        if let Some(addr) = env_value("ASL_LIVE_ADDR") {
            self.live.addr = addr;
        }
        if let Some(url) = env_value("ASL_SOURCE_URL") {
            self.live.source_url = url;
        }
        if let Some(ms) = env_value("ASL_COOLDOWN_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| anyhow!("ASL_COOLDOWN_MS must be an integer number of milliseconds"))?;
            self.live.cooldown = Duration::from_millis(ms);
        }
        if let Some(ms) = env_value("ASL_POLL_INTERVAL_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                anyhow!("ASL_POLL_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.live.poll_interval = Duration::from_millis(ms);
        }
        if let Some(count) = env_value("ASL_OUTPUT_COUNT") {
            self.models.output_count = count
                .parse()
                .map_err(|_| anyhow!("ASL_OUTPUT_COUNT must be a positive integer"))?;
        }
        if let Some(granularity) = env_value("ASL_DECODE_GRANULARITY") {
            self.models.decode_granularity = granularity.parse()?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.models.output_count == 0 {
            return Err(anyhow!("output_count must be greater than zero"));
        }
        if self.live.cooldown.is_zero() {
            return Err(anyhow!("cooldown must be greater than zero"));
        }
        if self.live.poll_interval.is_zero() {
            return Err(anyhow!("poll interval must be greater than zero"));
        }
        if self.live.target_fps == 0 {
            return Err(anyhow!("target_fps must be greater than zero"));
        }
        if self.live.image_width == 0 || self.live.image_height == 0 {
            return Err(anyhow!("image dimensions must be greater than zero"));
        }
        if self.api_addr.trim().is_empty() || self.live.addr.trim().is_empty() {
            return Err(anyhow!("listen addresses must not be empty"));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_movement_map(raw: HashMap<String, i32>) -> Result<MovementIndexMap> {
    let mut entries = Vec::with_capacity(raw.len());
    for (key, label) in raw {
        let index: usize = key
            .trim()
            .parse()
            .map_err(|_| anyhow!("movement_map key '{}' is not a class index", key))?;
        entries.push((index, label));
    }
    Ok(MovementIndexMap::new(entries))
}

fn read_config_file(path: &Path) -> Result<ServiceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_files_resolve_against_model_dir() {
        let mut settings = ModelSettings::in_dir("/srv/models");
        assert_eq!(settings.labels_path(), PathBuf::from("/srv/models/label.csv"));
        settings.static_model = PathBuf::from("/opt/static.onnx");
        assert_eq!(settings.static_model_path(), PathBuf::from("/opt/static.onnx"));
    }

    #[test]
    fn movement_map_keys_must_be_indices() {
        let mut raw = HashMap::new();
        raw.insert("3".to_string(), 7);
        assert_eq!(parse_movement_map(raw).unwrap().get(3), 7);

        let mut bad = HashMap::new();
        bad.insert("idle".to_string(), -1);
        assert!(parse_movement_map(bad).is_err());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = ServiceConfig::from_file(ServiceConfigFile::default()).unwrap();
        assert_eq!(cfg.api_addr, DEFAULT_API_ADDR);
        assert_eq!(cfg.live.cooldown, Duration::from_millis(500));
        assert_eq!(cfg.models.movement_map, MovementIndexMap::default());
        assert_eq!(cfg.models.decode_granularity, DecodeGranularity::PerFrame);
        assert!(cfg.validate().is_ok());
    }
}
