//! # Dispatcher
//!
//! Outbound side of the node.
//!
//! Responsibilities:
//! - Apply the restart, IMU switch and camera switch control signals
//! - Ship the estimator gateways usable without an engine attached:
//!   `LogEstimator` for dry runs, `RecordingEstimator` for tests

mod control;
pub mod gateways;

pub use contracts::EstimatorGateway;
pub use control::{ControlDispatch, ControlSignal};
pub use gateways::{GatewayCall, LogEstimator, RecordingEstimator};
