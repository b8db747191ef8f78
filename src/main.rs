// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Parser;
use healvision_node::{
    api::{start_server, AppState},
    config::ServiceConfig,
    pipeline::{AnalysisPipeline, DetectionNormalizer, DetectorService},
    version,
};
use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{error, info};

/// HealVision analysis node
///
/// Settings default to the HEALVISION_* environment variables; flags
/// override them.
#[derive(Parser, Debug)]
#[command(name = "healvision-node")]
#[command(version = version::VERSION_NUMBER)]
struct Args {
    /// Address to listen on
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// ONNX weights for the lung opacity detector
    #[arg(long)]
    model: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long)]
    conf_threshold: Option<f32>,

    /// NMS IoU threshold
    #[arg(long)]
    iou_threshold: Option<f32>,

    /// Maximum upload size in bytes
    #[arg(long)]
    max_upload_bytes: Option<usize>,
}

impl Args {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(conf) = self.conf_threshold {
            config.confidence_threshold = conf;
        }
        if let Some(iou) = self.iou_threshold {
            config.iou_threshold = iou;
        }
        if let Some(max) = self.max_upload_bytes {
            config.max_upload_bytes = max;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    println!("🚀 Starting HealVision Node...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();

    info!("{}", version::get_version_string());
    info!("Features: {}", version::FEATURES.join(", "));

    let mut config = ServiceConfig::from_env();
    args.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    info!("Configuration: {:?}", config);

    // A missing or unloadable model is fatal: never serve without it
    let detector = match DetectorService::load(&config.yolo_config()) {
        Ok(detector) => detector,
        Err(e) => {
            error!("❌ Failed to load detector: {}", e);
            std::process::exit(1);
        }
    };
    println!("✅ Detector loaded: {}", detector.name());

    let pipeline = AnalysisPipeline::new(detector, DetectionNormalizer::new(config.label_table()))
        .with_max_upload_bytes(config.max_upload_bytes);

    let state = Arc::new(AppState::new(pipeline));
    println!("🌐 Serving on http://{}", config.listen_addr);

    start_server(config.listen_addr, state).await?;

    println!("👋 HealVision Node stopped");
    Ok(())
}
