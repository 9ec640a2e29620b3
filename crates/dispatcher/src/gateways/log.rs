//! LogEstimator - logs every estimator call via tracing

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{EstimatorGateway, FeatureFrame, GrayImage};
use nalgebra::Vector3;
use tracing::{debug, info, instrument, trace};

/// Gateway that logs call summaries instead of estimating
///
/// Lets the node run end to end without an estimation engine attached.
pub struct LogEstimator {
    name: String,
    images: AtomicU64,
    imu_samples: AtomicU64,
    feature_frames: AtomicU64,
}

impl LogEstimator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            images: AtomicU64::new(0),
            imu_samples: AtomicU64::new(0),
            feature_frames: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Images, IMU samples and feature frames received so far
    pub fn counts(&self) -> (u64, u64, u64) {
        (
            self.images.load(Ordering::Relaxed),
            self.imu_samples.load(Ordering::Relaxed),
            self.feature_frames.load(Ordering::Relaxed),
        )
    }
}

impl EstimatorGateway for LogEstimator {
    #[instrument(
        level = "debug",
        name = "log_estimator_input_image",
        skip(self, left, right),
        fields(estimator = %self.name)
    )]
    fn input_image(&self, timestamp: f64, left: GrayImage, right: Option<GrayImage>) {
        let count = self.images.fetch_add(1, Ordering::Relaxed) + 1;
        observability::record_gateway_call("input_image");
        debug!(
            timestamp,
            width = left.width(),
            height = left.height(),
            stereo = right.is_some(),
            count,
            "image received"
        );
    }

    fn input_imu(&self, timestamp: f64, acc: Vector3<f64>, gyr: Vector3<f64>) {
        self.imu_samples.fetch_add(1, Ordering::Relaxed);
        observability::record_gateway_call("input_imu");
        trace!(
            estimator = %self.name,
            timestamp,
            acc = ?acc.as_slice(),
            gyr = ?gyr.as_slice(),
            "imu received"
        );
    }

    #[instrument(
        level = "debug",
        name = "log_estimator_input_feature",
        skip(self, frame),
        fields(estimator = %self.name)
    )]
    fn input_feature(&self, timestamp: f64, frame: FeatureFrame) {
        self.feature_frames.fetch_add(1, Ordering::Relaxed);
        observability::record_gateway_call("input_feature");
        debug!(
            timestamp,
            features = frame.len(),
            observations = frame.observation_count(),
            "feature frame received"
        );
    }

    fn clear_state(&self) {
        observability::record_gateway_call("clear_state");
        info!(estimator = %self.name, "state cleared");
    }

    fn set_parameter(&self) {
        observability::record_gateway_call("set_parameter");
        info!(estimator = %self.name, "parameters set");
    }

    fn change_sensor_type(&self, use_imu: bool, use_stereo: bool) {
        observability::record_gateway_call("change_sensor_type");
        info!(estimator = %self.name, use_imu, use_stereo, "sensor type changed");
    }
}
