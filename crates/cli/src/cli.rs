//! CLI argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Printed when the command line is not exactly one config path
pub const USAGE: &str = "usage: vins-node <CONFIG>\n\
                         for example: vins-node config/euroc_stereo_imu.toml";

/// VINS ingestion node
#[derive(Parser, Debug)]
#[command(
    name = "vins-node",
    author,
    version,
    about = "Visual-inertial sensor ingestion and synchronization node",
    long_about = "Subscribes to camera, IMU, feature and control topics, pairs \n\
                  stereo frames within a fixed tolerance and feeds the \n\
                  state estimator.",
    after_help = "Example:\n  vins-node config/euroc_stereo_imu.toml"
)]
pub struct Cli {
    /// Path to the node configuration (TOML or JSON)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, env = "VINS_NODE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", env = "VINS_NODE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Level used when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
