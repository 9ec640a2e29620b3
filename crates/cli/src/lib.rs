//! # VINS Node
//!
//! Library side of the `vins-node` binary.
//!
//! Provides:
//! - Command-line definitions and the usage text
//! - Node orchestration: subscriptions, stereo buffers, sync worker
//! - Run statistics

pub mod cli;
pub mod error;
pub mod node;

pub use error::{CliError, Result};
pub use node::{Node, NodeStats};
