//! vrtrack Daemon - Main entry point
//!
//! Connects to the tracking runtime, keeps the set of tracked devices up to
//! date and publishes their transforms.

mod backend;
mod config;
mod publisher;
mod sink;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vrtrack_core::DeviceProperty;
use vrtrack_manager::DevicesManager;

use crate::config::SinkKind;
use crate::publisher::TransformPublisher;
use crate::sink::{JsonLinesSink, LogSink, TransformSink};

#[derive(Parser, Debug)]
#[command(name = "vrtrackd")]
#[command(about = "Tracked VR device pose publisher")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "vrtrack.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Publishing period in seconds
    #[arg(short, long)]
    period: Option<f64>,

    /// List the managed devices with one pose sample and exit
    #[arg(long)]
    list: bool,

    /// Write an example configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("vrtrack v{}", env!("CARGO_PKG_VERSION"));

    if args.write_default_config {
        config::save_default_config(&args.config)?;
        println!("Wrote example configuration to {}", args.config.display());
        return Ok(());
    }

    let mut config = config::load_config(&args.config)?;
    if let Some(period) = args.period {
        config.publisher.period_secs = period;
        config.validate()?;
    }

    info!(
        origin = %config.tracking.origin,
        period_secs = config.publisher.period_secs,
        "Configuration loaded"
    );

    let runtime = backend::build_runtime(&config.runtime)?;
    let manager = Arc::new(DevicesManager::new(runtime, config.to_manager_config()));
    manager
        .initialize()
        .context("Failed to initialize the devices manager")?;

    let result = if args.list {
        list_devices(&manager);
        Ok(())
    } else {
        let sink: Box<dyn TransformSink> = match config.publisher.sink {
            SinkKind::Log => Box::new(LogSink),
            SinkKind::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
        };

        let mut publisher = TransformPublisher::new(
            manager.clone(),
            sink,
            config.publisher.base_frame.clone(),
            config.publisher.frame_prefix.clone(),
            config.publish_period(),
        );

        publisher
            .run(async {
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for Ctrl-C")
            })
            .await
    };

    manager.shutdown();
    result
}

/// Print every managed device with a single pose sample
fn list_devices(manager: &DevicesManager) {
    let devices = manager.managed_devices();
    println!("Found {} devices:", devices.len());

    if let Err(e) = manager.compute_poses() {
        println!("  Poses unavailable: {}", e);
    }

    for serial in devices {
        let model = manager
            .device_property(&serial, DeviceProperty::ModelNumber)
            .unwrap_or_else(|| "unknown model".to_string());
        println!(
            "  - {} ({}, {})",
            serial,
            manager.device_type(&serial),
            model
        );

        match manager.pose(&serial) {
            Some(pose) => println!(
                "    Position: {:.3}, {:.3}, {:.3}",
                pose.position[0], pose.position[1], pose.position[2]
            ),
            None => println!("    Position: not tracked"),
        }
    }
}
