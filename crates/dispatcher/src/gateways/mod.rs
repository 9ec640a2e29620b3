//! Shipped estimator gateways

mod log;
mod recording;

pub use log::LogEstimator;
pub use recording::{GatewayCall, RecordingEstimator};
