//! Subscription handlers
//!
//! One handler per inbound stream. Image handlers only enqueue; the IMU and
//! feature handlers call straight into the estimator.

use std::sync::Arc;

use contracts::{
    EstimatorGateway, GroundTruthTable, ImageMessage, ImuMessage, PointCloudMessage, TopicName,
};
use tracing::{trace, warn};

use crate::buffer::{SharedStereoBuffers, Side};
use crate::error::{IngestionError, Result};
use crate::frame_builder::build_feature_frame;
use crate::metrics::IngestionMetrics;

/// Callback invoked by the transport for each message of one topic
pub trait MessageHandler<M>: Send + Sync {
    /// Topic this handler is registered on
    fn topic(&self) -> &TopicName;

    fn handle(&self, msg: M);
}

/// Enqueues images of one camera into the shared buffer pair
pub struct ImageHandler {
    topic: TopicName,
    side: Side,
    buffers: SharedStereoBuffers,
    metrics: Arc<IngestionMetrics>,
}

impl ImageHandler {
    pub fn new(
        topic: TopicName,
        side: Side,
        buffers: SharedStereoBuffers,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            topic,
            side,
            buffers,
            metrics,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl MessageHandler<ImageMessage> for ImageHandler {
    fn topic(&self) -> &TopicName {
        &self.topic
    }

    fn handle(&self, msg: ImageMessage) {
        let timestamp = msg.timestamp();
        let depth = {
            let mut buffers = self.buffers.lock();
            let buffer = buffers.side_mut(self.side);
            buffer.push(msg);
            buffer.len()
        };

        self.metrics.record_image(self.side);
        observability::record_image_received(self.side.as_str());
        observability::record_buffer_depth(self.side.as_str(), depth);
        trace!(side = %self.side, timestamp, depth, "image enqueued");
    }
}

/// Forwards inertial samples to the estimator
pub struct ImuHandler {
    topic: TopicName,
    gateway: Arc<dyn EstimatorGateway>,
    metrics: Arc<IngestionMetrics>,
}

impl ImuHandler {
    pub fn new(
        topic: TopicName,
        gateway: Arc<dyn EstimatorGateway>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            topic,
            gateway,
            metrics,
        }
    }
}

impl MessageHandler<ImuMessage> for ImuHandler {
    fn topic(&self) -> &TopicName {
        &self.topic
    }

    fn handle(&self, msg: ImuMessage) {
        let timestamp = msg.stamp.to_sec();
        self.gateway.input_imu(
            timestamp,
            msg.linear_acceleration.into(),
            msg.angular_velocity.into(),
        );
        self.metrics.record_imu();
        observability::record_imu_sample();
    }
}

/// Builds feature frames and forwards them to the estimator
pub struct FeatureHandler {
    topic: TopicName,
    gateway: Arc<dyn EstimatorGateway>,
    ground_truth: GroundTruthTable,
    metrics: Arc<IngestionMetrics>,
}

impl FeatureHandler {
    pub fn new(
        topic: TopicName,
        gateway: Arc<dyn EstimatorGateway>,
        ground_truth: GroundTruthTable,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            topic,
            gateway,
            ground_truth,
            metrics,
        }
    }

    /// Build and forward one message; returns the number of features
    pub fn process(&self, msg: &PointCloudMessage) -> Result<usize> {
        let frame = build_feature_frame(msg, Some(&self.ground_truth)).map_err(|source| {
            IngestionError::Feature {
                topic: self.topic.to_string(),
                source,
            }
        })?;

        let features = frame.len();
        observability::record_feature_frame(features, frame.observation_count());
        self.gateway.input_feature(msg.stamp.to_sec(), frame);
        self.metrics.record_feature_frame();
        Ok(features)
    }
}

impl MessageHandler<PointCloudMessage> for FeatureHandler {
    fn topic(&self) -> &TopicName {
        &self.topic
    }

    fn handle(&self, msg: PointCloudMessage) {
        match self.process(&msg) {
            Ok(features) => trace!(features, "feature frame forwarded"),
            Err(err) if err.is_fatal() => {
                panic!("{err}");
            }
            Err(err) => {
                if let IngestionError::Feature { source, .. } = &err {
                    observability::record_feature_rejected(source.reason());
                }
                self.metrics.record_feature_rejected();
                warn!(error = %err, "feature message skipped");
            }
        }
    }
}
