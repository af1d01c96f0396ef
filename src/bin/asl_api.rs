//! asl_api - landmark inference API
//!
//! This daemon:
//! 1. Loads the fingerspelling and sign models with their tables
//! 2. Serves `/health`, `/predict` and `/predict/sign` over HTTP
//! 3. Keeps running with missing models, answering 503 for those routes

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use asl_relay::{
    api::{ApiConfig, ApiServer},
    InferenceService, ServiceConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve ASL landmark inference over HTTP")]
struct Args {
    /// Config file (TOML or JSON).
    #[arg(long, env = "ASL_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address; overrides the config file.
    #[arg(long)]
    addr: Option<String>,

    /// Model directory; overrides the config file.
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ServiceConfig::load_from(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.api_addr = addr;
    }
    if let Some(dir) = args.model_dir {
        config.models.dir = dir;
    }

    log::info!("loading models from {}", config.models.dir.display());
    let service = Arc::new(InferenceService::load(&config.models));
    let health = service.health();
    log::info!(
        "fingerspelling={} sign={}",
        health.model_loaded,
        health.sign_model_loaded
    );

    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
    };
    let api_handle = ApiServer::new(api_config, service).spawn()?;
    log::info!("inference api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("asl_api waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}
