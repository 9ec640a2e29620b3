//! # VINS Node CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Node startup, replay and lifecycle management
//! - Graceful shutdown handling

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use dispatcher::LogEstimator;
use observability::ObservabilityConfig;
use tracing::{info, warn};
use transport::{Bus, ReplaySource};

use vins_node::cli::{Cli, USAGE};
use vins_node::{CliError, Node};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: cli.default_log_level().to_string(),
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "VINS node starting");

    let result = run(&cli.config).await;
    if let Err(ref e) = result {
        tracing::error!(error = %e, "Node failed");
    }
    result
}

async fn run(config_path: &Path) -> Result<()> {
    info!(config = %config_path.display(), "Loading configuration");
    if !config_path.exists() {
        return Err(CliError::config_not_found(config_path.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(config_path)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(port) = config.observability.metrics_port {
        observability::init_metrics_only(port)?;
    }

    let replay = match &config.replay {
        Some(replay) => Some(ReplaySource::load(replay).map_err(CliError::Replay)?),
        None => None,
    };

    let bus = Arc::new(Bus::new());
    let gateway = Arc::new(LogEstimator::new("vins"));
    let node = Node::start(config, gateway.clone(), bus.clone())?;

    let mut replay_stats = None;
    match replay {
        Some(source) => {
            info!(messages = source.len(), "Replaying recording");
            tokio::select! {
                result = source.play(&bus) => {
                    replay_stats = Some(result.map_err(CliError::Replay)?);
                }
                _ = shutdown_signal() => {
                    warn!("Received shutdown signal, stopping replay...");
                }
            }
        }
        None => {
            info!("Waiting for messages, press Ctrl+C to stop");
            shutdown_signal().await;
            warn!("Received shutdown signal, stopping node...");
        }
    }

    let mut stats = node.shutdown_async().await?;
    stats.replay = replay_stats;

    let (images, imu, features) = gateway.counts();
    info!(
        images,
        imu,
        features,
        duration_secs = stats.duration.as_secs_f64(),
        "VINS node finished"
    );
    stats.print_summary();
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
