//! EstimatorGateway trait - the engine's entry points
//!
//! The state-estimation engine itself lives outside this workspace; the
//! ingestion node only ever talks to it through this trait.

use image::GrayImage;
use nalgebra::Vector3;

use crate::FeatureFrame;

/// Entry points of the state-estimation engine
///
/// All methods take `&self`: implementations synchronize internally, because
/// the synchronizer thread, the IMU handler, the feature handler and the
/// control handlers call in concurrently.
///
/// # Example
///
/// ```ignore
/// let gateway: Arc<dyn EstimatorGateway> = Arc::new(LogEstimator::new("vins"));
/// gateway.set_parameter();
/// gateway.input_imu(t, acc, gyr);
/// ```
pub trait EstimatorGateway: Send + Sync {
    /// One visual observation; `right` is `Some` in stereo mode
    fn input_image(&self, timestamp: f64, left: GrayImage, right: Option<GrayImage>);

    /// One inertial sample
    ///
    /// Called at IMU rate; must return within a short bounded time.
    fn input_imu(&self, timestamp: f64, acc: Vector3<f64>, gyr: Vector3<f64>);

    /// One pre-extracted feature set
    fn input_feature(&self, timestamp: f64, frame: FeatureFrame);

    /// Reset all internal estimator state
    fn clear_state(&self);

    /// (Re)load configuration-derived parameters
    fn set_parameter(&self);

    /// Update the expected sensor configuration for subsequent measurements
    fn change_sensor_type(&self, use_imu: bool, use_stereo: bool);
}
