//! # Ingestion
//!
//! Inbound side of the node.
//!
//! Responsibilities:
//! - Buffer left/right images in arrival order (`StreamBuffer`,
//!   `StereoBuffers`)
//! - Decode images into the single-channel working layout
//! - Build feature frames from flattened point clouds
//! - Handle each subscription: enqueue images, forward IMU samples and
//!   feature frames to the estimator
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ImageHandler, MessageHandler, Side, StereoBuffers};
//!
//! let buffers = StereoBuffers::shared();
//! let left = ImageHandler::new(config.image0_topic.clone(), Side::Left, buffers.clone(), metrics);
//! bus.subscribe(left.topic().clone(), qos, move |msg| left.handle(msg))?;
//! ```

mod buffer;
mod decode;
mod error;
mod frame_builder;
mod handlers;
mod metrics;

pub use buffer::{SharedStereoBuffers, Side, StereoBuffers, StreamBuffer, Timestamped};
pub use decode::{decode_frame, decode_gray, is_supported_encoding, DecodeError};
pub use error::{IngestionError, Result};
pub use frame_builder::{build_feature_frame, FeatureError};
pub use handlers::{FeatureHandler, ImageHandler, ImuHandler, MessageHandler};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
