//! Feature frame builder
//!
//! Turns a flattened point cloud of feature observations into a
//! `FeatureFrame`. Channel layout, one value per point:
//!
//! | channel | meaning              |
//! |---------|----------------------|
//! | 0       | feature id           |
//! | 1       | camera id            |
//! | 2, 3    | pixel `u`, `v`       |
//! | 4, 5    | pixel velocity       |
//! | 6, 7, 8 | ground-truth x, y, z |

use contracts::{
    FeatureFrame, FeatureId, FeatureObservation, FeatureVector, GroundTruthTable,
    PointCloudMessage,
};
use nalgebra::Vector3;
use thiserror::Error;

const REQUIRED_CHANNELS: usize = 6;
const GROUND_TRUTH_CHANNELS: usize = 9;

/// Feature message rejection
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeatureError {
    /// Observation off the normalized image plane; the producer is broken
    #[error("feature {feature_id} (point {index}) has depth {z}, expected 1")]
    NonUnitDepth {
        index: usize,
        feature_id: FeatureId,
        z: f32,
    },

    #[error("feature message has {found} channels, at least 6 required")]
    TooFewChannels { found: usize },

    #[error("channel {channel} holds {len} values for {points} points")]
    ShortChannel {
        channel: usize,
        len: usize,
        points: usize,
    },
}

impl FeatureError {
    /// Whether the error must terminate the node
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NonUnitDepth { .. })
    }

    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NonUnitDepth { .. } => "non_unit_depth",
            Self::TooFewChannels { .. } => "too_few_channels",
            Self::ShortChannel { .. } => "short_channel",
        }
    }
}

/// Build the observation map of one feature message
///
/// Ground-truth positions, when the message carries all three extra
/// channels, are written to `ground_truth` once the whole message has been
/// accepted.
pub fn build_feature_frame(
    msg: &PointCloudMessage,
    ground_truth: Option<&GroundTruthTable>,
) -> Result<FeatureFrame, FeatureError> {
    let points = msg.points.len();
    if msg.channels.len() < REQUIRED_CHANNELS {
        return Err(FeatureError::TooFewChannels {
            found: msg.channels.len(),
        });
    }

    let has_ground_truth = msg.channels.len() >= GROUND_TRUTH_CHANNELS;
    let used = if has_ground_truth {
        GROUND_TRUTH_CHANNELS
    } else {
        REQUIRED_CHANNELS
    };
    for (channel, values) in msg.channels[..used].iter().enumerate() {
        if values.values.len() < points {
            return Err(FeatureError::ShortChannel {
                channel,
                len: values.values.len(),
                points,
            });
        }
    }

    let value = |channel: usize, i: usize| msg.channels[channel].values[i];

    let mut frame = FeatureFrame::new();
    let mut positions = Vec::new();

    for (i, point) in msg.points.iter().enumerate() {
        let feature_id = value(0, i) as FeatureId;
        if point.z != 1.0 {
            return Err(FeatureError::NonUnitDepth {
                index: i,
                feature_id,
                z: point.z,
            });
        }

        let camera_id = value(1, i) as i32;
        let vector = FeatureVector::from_column_slice(&[
            point.x as f64,
            point.y as f64,
            point.z as f64,
            value(2, i) as f64,
            value(3, i) as f64,
            value(4, i) as f64,
            value(5, i) as f64,
        ]);
        frame.push(feature_id, FeatureObservation::new(camera_id, vector));

        if has_ground_truth {
            positions.push((
                feature_id,
                Vector3::new(value(6, i) as f64, value(7, i) as f64, value(8, i) as f64),
            ));
        }
    }

    if let Some(table) = ground_truth {
        for (feature_id, position) in positions {
            table.record(feature_id, position);
        }
    }

    Ok(frame)
}
