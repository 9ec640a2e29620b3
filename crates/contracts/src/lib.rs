//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the ingestion node:
//! inbound message shapes, the feature frame handed to the estimator, the
//! sensor mode flags, the estimator gateway trait and the node configuration.
//! Business crates depend on this crate only; reverse dependencies are
//! prohibited.
//!
//! ## Time Model
//! - Message stamps carry whole seconds plus a nanosecond remainder
//! - Everything downstream of ingestion uses seconds as `f64`

mod config;
mod error;
mod feature;
mod gateway;
mod message;
mod sensor_mode;
mod topic;

pub use config::*;
pub use error::*;
pub use feature::*;
pub use gateway::EstimatorGateway;
pub use message::*;
pub use sensor_mode::{SensorMode, SensorModeState};
pub use topic::TopicName;

/// Working image representation handed to the estimator.
pub use image::GrayImage;
