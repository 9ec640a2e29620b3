//! Inbound messages
//!
//! Shapes of the messages delivered by the transport to the node's
//! subscription handlers. Layouts follow the usual robotics middleware
//! conventions (header stamp, row stride, parallel channel arrays).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Message timestamp: whole seconds plus nanosecond remainder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

impl Stamp {
    pub fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Split a seconds value into whole seconds and nanoseconds.
    ///
    /// Rounds to the nearest nanosecond.
    pub fn from_sec(seconds: f64) -> Self {
        let total_ns = (seconds * 1e9).round() as i64;
        Self {
            sec: total_ns.div_euclid(1_000_000_000) as i32,
            nanosec: total_ns.rem_euclid(1_000_000_000) as u32,
        }
    }

    /// Seconds as `f64`
    #[inline]
    pub fn to_sec(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 * 1e-9
    }
}

/// Raw image as delivered by the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMessage {
    /// Capture time
    pub stamp: Stamp,

    /// Image height (rows)
    pub height: u32,

    /// Image width (columns)
    pub width: u32,

    /// Pixel encoding tag, e.g. `mono8`, `8UC1`, `bgr8`
    pub encoding: String,

    /// Multi-byte pixel byte order
    #[serde(default)]
    pub is_bigendian: bool,

    /// Row stride in bytes
    pub step: u32,

    /// Pixel data, `step * height` bytes
    pub data: Bytes,
}

impl ImageMessage {
    /// Seconds timestamp of this image
    #[inline]
    pub fn timestamp(&self) -> f64 {
        self.stamp.to_sec()
    }
}

/// 3D vector as carried on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Vector3> for nalgebra::Vector3<f64> {
    fn from(v: Vector3) -> Self {
        nalgebra::Vector3::new(v.x, v.y, v.z)
    }
}

/// Inertial sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuMessage {
    pub stamp: Stamp,

    /// Accelerometer (m/s²)
    pub linear_acceleration: Vector3,

    /// Gyroscope (rad/s)
    pub angular_velocity: Vector3,
}

/// Single-precision point of a point cloud message
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point32 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point32 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One named value per point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelFloat32 {
    #[serde(default)]
    pub name: String,
    pub values: Vec<f32>,
}

impl ChannelFloat32 {
    pub fn new(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Pre-extracted feature observations, flattened
///
/// `points[i]` is the normalized ray of observation `i`; `channels[c].values[i]`
/// carries the c-th attribute of the same observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointCloudMessage {
    pub stamp: Stamp,
    pub points: Vec<Point32>,
    pub channels: Vec<ChannelFloat32>,
}

/// Boolean control signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolMessage {
    pub data: bool,
}

impl From<bool> for BoolMessage {
    fn from(data: bool) -> Self {
        Self { data }
    }
}
