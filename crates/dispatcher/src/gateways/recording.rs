//! RecordingEstimator - keeps every estimator call for inspection

use contracts::{EstimatorGateway, FeatureFrame, GrayImage};
use nalgebra::Vector3;
use parking_lot::Mutex;

/// One recorded estimator call
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Image {
        timestamp: f64,
        left: GrayImage,
        right: Option<GrayImage>,
    },
    Imu {
        timestamp: f64,
        acc: Vector3<f64>,
        gyr: Vector3<f64>,
    },
    Feature {
        timestamp: f64,
        frame: FeatureFrame,
    },
    ClearState,
    SetParameter,
    ChangeSensorType {
        use_imu: bool,
        use_stereo: bool,
    },
}

/// Gateway that records calls in arrival order
#[derive(Debug, Default)]
pub struct RecordingEstimator {
    calls: Mutex<Vec<GatewayCall>>,
}

impl RecordingEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every call so far
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Timestamps and stereo flag of recorded images
    pub fn image_stamps(&self) -> Vec<(f64, bool)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Image {
                    timestamp, right, ..
                } => Some((*timestamp, right.is_some())),
                _ => None,
            })
            .collect()
    }

    pub fn feature_frames(&self) -> Vec<(f64, FeatureFrame)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Feature { timestamp, frame } => Some((*timestamp, frame.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn imu_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, GatewayCall::Imu { .. }))
            .count()
    }

    /// Forget every recorded call
    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }
}

impl EstimatorGateway for RecordingEstimator {
    fn input_image(&self, timestamp: f64, left: GrayImage, right: Option<GrayImage>) {
        self.record(GatewayCall::Image {
            timestamp,
            left,
            right,
        });
    }

    fn input_imu(&self, timestamp: f64, acc: Vector3<f64>, gyr: Vector3<f64>) {
        self.record(GatewayCall::Imu {
            timestamp,
            acc,
            gyr,
        });
    }

    fn input_feature(&self, timestamp: f64, frame: FeatureFrame) {
        self.record(GatewayCall::Feature { timestamp, frame });
    }

    fn clear_state(&self) {
        self.record(GatewayCall::ClearState);
    }

    fn set_parameter(&self) {
        self.record(GatewayCall::SetParameter);
    }

    fn change_sensor_type(&self, use_imu: bool, use_stereo: bool) {
        self.record(GatewayCall::ChangeSensorType {
            use_imu,
            use_stereo,
        });
    }
}
