//! NodeConfig - Config Loader output
//!
//! Topics, sensor layout, synchronization constants, retention depths and
//! optional replay settings of the ingestion node.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{SensorMode, TopicName};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete node configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NodeConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Inertial measurement topic
    pub imu_topic: TopicName,

    /// Left (or only) camera topic
    pub image0_topic: TopicName,

    /// Right camera topic, required when `num_of_cam == 2`
    #[serde(default)]
    pub image1_topic: Option<TopicName>,

    /// Pre-extracted feature topic
    #[serde(default = "default_feature_topic")]
    pub feature_topic: TopicName,

    /// Control signal topics
    #[serde(default)]
    pub control: ControlTopics,

    /// Whether IMU measurements are used at startup
    #[serde(default = "default_true")]
    pub use_imu: bool,

    /// Number of cameras: 1 = mono, 2 = stereo
    #[validate(range(min = 1, max = 2))]
    pub num_of_cam: u8,

    /// Stereo pairing and polling
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,

    /// Subscription retention depths
    #[serde(default)]
    #[validate(nested)]
    pub qos: QosConfig,

    /// Recorded message replay (optional)
    #[serde(default)]
    pub replay: Option<ReplayConfig>,

    /// Logging and metrics endpoints
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl NodeConfig {
    /// Stereo when two cameras are configured
    pub fn stereo(&self) -> bool {
        self.num_of_cam == 2
    }

    /// Sensor mode at startup
    pub fn initial_mode(&self) -> SensorMode {
        SensorMode::new(self.use_imu, self.stereo())
    }
}

/// Topics of the three boolean control signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlTopics {
    #[serde(default = "default_restart_topic")]
    pub restart: TopicName,

    #[serde(default = "default_imu_switch_topic")]
    pub imu_switch: TopicName,

    #[serde(default = "default_cam_switch_topic")]
    pub cam_switch: TopicName,
}

impl Default for ControlTopics {
    fn default() -> Self {
        Self {
            restart: default_restart_topic(),
            imu_switch: default_imu_switch_topic(),
            cam_switch: default_cam_switch_topic(),
        }
    }
}

/// Stereo pairing configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    /// Maximum left/right stamp difference for one capture instant (seconds)
    #[serde(default = "default_stereo_tolerance")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub stereo_tolerance_s: f64,

    /// Delay between synchronizer ticks (milliseconds)
    #[serde(default = "default_poll_interval")]
    #[validate(range(min = 1, max = 1000))]
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stereo_tolerance_s: default_stereo_tolerance(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// KeepLast retention depth per subscription kind
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QosConfig {
    #[serde(default = "default_imu_depth")]
    #[validate(range(min = 1))]
    pub imu_depth: usize,

    #[serde(default = "default_feature_depth")]
    #[validate(range(min = 1))]
    pub feature_depth: usize,

    #[serde(default = "default_image_depth")]
    #[validate(range(min = 1))]
    pub image_depth: usize,

    #[serde(default = "default_control_depth")]
    #[validate(range(min = 1))]
    pub control_depth: usize,
}

impl Default for QosConfig {
    fn default() -> Self {
        Self {
            imu_depth: default_imu_depth(),
            feature_depth: default_feature_depth(),
            image_depth: default_image_depth(),
            control_depth: default_control_depth(),
        }
    }
}

/// Recorded message replay
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReplayConfig {
    /// JSON Lines recording
    pub path: PathBuf,

    /// Speed multiplier (1.0 = original pace, 0 = as fast as possible)
    #[serde(default = "default_replay_speed")]
    #[validate(range(min = 0.0))]
    pub speed: f64,

    /// Restart from the beginning when the recording ends
    #[serde(default, rename = "loop")]
    pub loop_playback: bool,
}

/// Observability endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_true() -> bool {
    true
}

fn default_feature_topic() -> TopicName {
    "/feature_tracker/feature".into()
}

fn default_restart_topic() -> TopicName {
    "/vins_restart".into()
}

fn default_imu_switch_topic() -> TopicName {
    "/vins_imu_switch".into()
}

fn default_cam_switch_topic() -> TopicName {
    "/vins_cam_switch".into()
}

fn default_stereo_tolerance() -> f64 {
    0.003
}

fn default_poll_interval() -> u64 {
    2
}

fn default_imu_depth() -> usize {
    2000
}

fn default_feature_depth() -> usize {
    2000
}

fn default_image_depth() -> usize {
    100
}

fn default_control_depth() -> usize {
    100
}

fn default_replay_speed() -> f64 {
    1.0
}
