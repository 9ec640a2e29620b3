//! Stereo/mono synchronizer

use std::sync::Arc;

use contracts::{EstimatorGateway, ImageMessage, SensorModeState, SyncConfig};
use ingestion::{decode_frame, IngestionError, SharedStereoBuffers, Side};
use observability::{MetricsSummary, SyncMetricsAggregator};
use tracing::{debug, info, instrument, warn};

use crate::rate::RateMeter;

/// Result of one synchronizer tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Nothing to do
    Idle,
    /// Front image of one side discarded by the pairing policy
    Dropped(Side),
    /// Single frame forwarded
    Mono { timestamp: f64 },
    /// Stereo pair forwarded, stamped with the left image
    Stereo { timestamp: f64 },
    /// Frame popped but not forwarded because it could not be decoded
    Discarded,
}

impl TickOutcome {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

enum Selection {
    Pair(ImageMessage, ImageMessage),
    Drop { side: Side, t0: f64, t1: f64 },
}

/// Drains the image buffers and forwards frames to the estimator
///
/// Stereo pairs are emitted only when the two front stamps lie within the
/// tolerance; otherwise the strictly older front is dropped and the other
/// kept for the next tick.
pub struct Synchronizer {
    buffers: SharedStereoBuffers,
    mode: Arc<SensorModeState>,
    gateway: Arc<dyn EstimatorGateway>,
    tolerance: f64,
    rate: RateMeter,
    stats: SyncMetricsAggregator,
}

impl Synchronizer {
    pub fn new(
        config: &SyncConfig,
        buffers: SharedStereoBuffers,
        mode: Arc<SensorModeState>,
        gateway: Arc<dyn EstimatorGateway>,
    ) -> Self {
        Self {
            buffers,
            mode,
            gateway,
            tolerance: config.stereo_tolerance_s,
            rate: RateMeter::new(),
            stats: SyncMetricsAggregator::new(),
        }
    }

    /// Stereo pairing tolerance in seconds
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Run one step of the synchronizer
    ///
    /// The sensor mode is sampled once at the start of the tick.
    #[instrument(level = "trace", name = "sync_tick", skip(self))]
    pub fn tick(&mut self) -> TickOutcome {
        if self.mode.use_stereo() {
            self.tick_stereo()
        } else {
            self.tick_mono()
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        self.stats.summary()
    }

    fn tick_stereo(&mut self) -> TickOutcome {
        let selection = {
            let mut buffers = self.buffers.lock();
            let (Some(t0), Some(t1)) = (
                buffers.left.front_timestamp(),
                buffers.right.front_timestamp(),
            ) else {
                return TickOutcome::Idle;
            };

            if t0 < t1 - self.tolerance {
                buffers.left.pop_front();
                Selection::Drop {
                    side: Side::Left,
                    t0,
                    t1,
                }
            } else if t0 > t1 + self.tolerance {
                buffers.right.pop_front();
                Selection::Drop {
                    side: Side::Right,
                    t0,
                    t1,
                }
            } else {
                match (buffers.left.pop_front(), buffers.right.pop_front()) {
                    (Some(left), Some(right)) => Selection::Pair(left, right),
                    _ => return TickOutcome::Idle,
                }
            }
        };

        match selection {
            Selection::Drop { side, t0, t1 } => {
                info!(side = %side, t0, t1, "dropped {side} frame");
                observability::record_frame_dropped(side.as_str());
                match side {
                    Side::Left => self.stats.record_drop_left(),
                    Side::Right => self.stats.record_drop_right(),
                }
                TickOutcome::Dropped(side)
            }
            Selection::Pair(left, right) => self.forward_pair(left, right),
        }
    }

    fn tick_mono(&mut self) -> TickOutcome {
        let Some(msg) = self.buffers.lock().left.pop_front() else {
            return TickOutcome::Idle;
        };

        let timestamp = msg.timestamp();
        let image = match decode_frame(Side::Left, &msg) {
            Ok(image) => image,
            Err(err) => return self.discard(err, &msg),
        };

        self.gateway.input_image(timestamp, image, None);
        observability::record_frame_forwarded("mono");
        self.stats.record_mono();
        self.observe_rate(timestamp);
        TickOutcome::Mono { timestamp }
    }

    fn forward_pair(&mut self, left: ImageMessage, right: ImageMessage) -> TickOutcome {
        let t0 = left.timestamp();
        let t1 = right.timestamp();

        let left_image = match decode_frame(Side::Left, &left) {
            Ok(image) => image,
            Err(err) => return self.discard(err, &left),
        };
        let right_image = match decode_frame(Side::Right, &right) {
            Ok(image) => image,
            Err(err) => return self.discard(err, &right),
        };

        self.gateway.input_image(t0, left_image, Some(right_image));
        observability::record_frame_forwarded("stereo");
        observability::record_stereo_gap_ms((t0 - t1).abs() * 1000.0);
        self.stats.record_stereo(t0 - t1);
        self.observe_rate(t0);
        TickOutcome::Stereo { timestamp: t0 }
    }

    fn discard(&mut self, err: IngestionError, msg: &ImageMessage) -> TickOutcome {
        match &err {
            IngestionError::Decode {
                source: ingestion::DecodeError::Empty { .. },
                ..
            } => debug!(timestamp = msg.timestamp(), "empty frame not forwarded"),
            _ => warn!(
                error = %err,
                encoding = %msg.encoding,
                timestamp = msg.timestamp(),
                "frame not forwarded"
            ),
        }
        observability::record_decode_failure(&msg.encoding);
        self.stats.record_decode_failure();
        TickOutcome::Discarded
    }

    fn observe_rate(&mut self, timestamp: f64) {
        if let Some(fps) = self.rate.record(timestamp) {
            debug!(fps = format!("{fps:.1}"), "image rate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use bytes::Bytes;
    use contracts::{FeatureFrame, GrayImage, QosConfig, SensorMode, Stamp};
    use ingestion::StereoBuffers;
    use nalgebra::Vector3;
    use rand::Rng;

    type Frame = (f64, GrayImage, Option<GrayImage>);

    #[derive(Default)]
    struct FrameSink {
        frames: Mutex<Vec<Frame>>,
    }

    impl FrameSink {
        fn frames(&self) -> Vec<Frame> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl EstimatorGateway for FrameSink {
        fn input_image(&self, t: f64, left: GrayImage, right: Option<GrayImage>) {
            self.frames.lock().unwrap().push((t, left, right));
        }
        fn input_imu(&self, _: f64, _: Vector3<f64>, _: Vector3<f64>) {}
        fn input_feature(&self, _: f64, _: FeatureFrame) {}
        fn clear_state(&self) {}
        fn set_parameter(&self) {}
        fn change_sensor_type(&self, _: bool, _: bool) {}
    }

    struct Fixture {
        buffers: SharedStereoBuffers,
        mode: Arc<SensorModeState>,
        sink: Arc<FrameSink>,
        sync: Synchronizer,
    }

    fn fixture(stereo: bool, tolerance: f64) -> Fixture {
        let buffers = StereoBuffers::shared();
        let mode = Arc::new(SensorModeState::new(SensorMode::new(true, stereo)));
        let sink = Arc::new(FrameSink::default());
        let config = SyncConfig {
            stereo_tolerance_s: tolerance,
            ..Default::default()
        };
        let sync = Synchronizer::new(&config, buffers.clone(), mode.clone(), sink.clone());
        Fixture {
            buffers,
            mode,
            sink,
            sync,
        }
    }

    /// 2x1 mono8 image whose pixels carry `id`
    fn image(t: f64, id: u16) -> ImageMessage {
        ImageMessage {
            stamp: Stamp::from_sec(t),
            height: 1,
            width: 2,
            encoding: "mono8".to_string(),
            is_bigendian: false,
            step: 2,
            data: Bytes::from(id.to_le_bytes().to_vec()),
        }
    }

    fn image_id(image: &GrayImage) -> u16 {
        let raw = image.as_raw();
        u16::from_le_bytes([raw[0], raw[1]])
    }

    impl Fixture {
        fn push(&self, side: Side, msg: ImageMessage) {
            self.buffers.lock().side_mut(side).push(msg);
        }
    }

    #[test]
    fn test_pair_within_tolerance() {
        let mut f = fixture(true, 0.003);
        f.push(Side::Left, image(100.000, 1));
        f.push(Side::Right, image(100.002, 2));

        assert_eq!(f.sync.tick(), TickOutcome::Stereo { timestamp: 100.0 });
        assert_eq!(f.sync.tick(), TickOutcome::Idle);

        let frames = f.sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, 100.0);
        assert_eq!(image_id(&frames[0].1), 1);
        assert_eq!(image_id(frames[0].2.as_ref().unwrap()), 2);

        let summary = f.sync.summary();
        assert_eq!(summary.stereo_frames, 1);
        assert_eq!(summary.dropped_left + summary.dropped_right, 0);
    }

    #[test]
    fn test_older_left_dropped_right_retained() {
        let mut f = fixture(true, 0.003);
        f.push(Side::Left, image(100.000, 1));
        f.push(Side::Right, image(100.010, 2));

        assert_eq!(f.sync.tick(), TickOutcome::Dropped(Side::Left));
        assert_eq!(f.sync.tick(), TickOutcome::Idle);
        assert!(f.sink.frames().is_empty());

        let buffers = f.buffers.lock();
        assert!(buffers.left.is_empty());
        assert_eq!(buffers.right.len(), 1);
    }

    #[test]
    fn test_older_right_dropped() {
        let mut f = fixture(true, 0.003);
        f.push(Side::Left, image(100.010, 1));
        f.push(Side::Right, image(100.000, 2));
        f.push(Side::Right, image(100.011, 3));

        assert_eq!(f.sync.tick(), TickOutcome::Dropped(Side::Right));
        assert!(matches!(
            f.sync.tick(),
            TickOutcome::Stereo { timestamp } if (timestamp - 100.01).abs() < 1e-9
        ));

        let frames = f.sink.frames();
        assert_eq!(image_id(frames[0].2.as_ref().unwrap()), 3);
        assert_eq!(f.sync.summary().dropped_right, 1);
    }

    #[test]
    fn test_gap_equal_to_tolerance_pairs() {
        let mut f = fixture(true, 0.5);
        f.push(Side::Left, image(1.0, 1));
        f.push(Side::Right, image(1.5, 2));
        assert_eq!(f.sync.tick(), TickOutcome::Stereo { timestamp: 1.0 });
    }

    #[test]
    fn test_one_side_empty_is_idle() {
        let mut f = fixture(true, 0.003);
        f.push(Side::Left, image(100.0, 1));

        assert_eq!(f.sync.tick(), TickOutcome::Idle);
        assert_eq!(f.buffers.lock().left.len(), 1);
    }

    #[test]
    fn test_mono_forwards_left_only() {
        let mut f = fixture(false, 0.003);
        f.push(Side::Left, image(5.0, 7));
        f.push(Side::Right, image(5.0, 8));

        assert_eq!(f.sync.tick(), TickOutcome::Mono { timestamp: 5.0 });
        assert_eq!(f.sync.tick(), TickOutcome::Idle);

        let frames = f.sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(image_id(&frames[0].1), 7);
        assert!(frames[0].2.is_none());
        assert_eq!(f.buffers.lock().right.len(), 1);
    }

    #[test]
    fn test_mono_backlog_beyond_retention_depth() {
        let mut f = fixture(false, 0.003);
        let backlog = QosConfig::default().image_depth + 50;
        for i in 0..backlog {
            f.push(Side::Left, image(10.0 + i as f64 * 0.05, i as u16));
        }

        while f.sync.tick() != TickOutcome::Idle {}

        let frames = f.sink.frames();
        assert_eq!(frames.len(), backlog);
        assert!(frames
            .iter()
            .enumerate()
            .all(|(i, frame)| image_id(&frame.1) == i as u16 && frame.2.is_none()));
    }

    #[test]
    fn test_mode_sampled_per_tick() {
        let mut f = fixture(true, 0.003);
        f.push(Side::Left, image(1.0, 1));
        f.push(Side::Left, image(2.0, 2));

        assert_eq!(f.sync.tick(), TickOutcome::Idle);
        f.mode.update(|mode| mode.with_stereo(false));
        assert_eq!(f.sync.tick(), TickOutcome::Mono { timestamp: 1.0 });

        f.mode.update(|mode| mode.with_stereo(true));
        f.push(Side::Right, image(2.001, 3));
        assert_eq!(f.sync.tick(), TickOutcome::Stereo { timestamp: 2.0 });
    }

    #[test]
    fn test_undecodable_pair_discarded() {
        let mut f = fixture(true, 0.003);
        let mut left = image(1.0, 1);
        left.encoding = "yuv422".to_string();
        f.push(Side::Left, left);
        f.push(Side::Right, image(1.0, 2));

        assert_eq!(f.sync.tick(), TickOutcome::Discarded);
        assert!(f.sink.frames().is_empty());
        assert!(f.buffers.lock().right.is_empty());
        assert_eq!(f.sync.summary().decode_failures, 1);
    }

    #[test]
    fn test_empty_frame_not_forwarded() {
        let mut f = fixture(false, 0.003);
        let mut msg = image(1.0, 1);
        msg.width = 0;
        msg.step = 0;
        f.push(Side::Left, msg);

        assert_eq!(f.sync.tick(), TickOutcome::Discarded);
        assert!(f.sink.frames().is_empty());
    }

    #[test]
    fn test_randomized_pairing_policy() {
        let tolerance = 0.003;
        let mut rng = rand::rng();

        for _ in 0..20 {
            let mut f = fixture(true, tolerance);
            let mut stamps = std::collections::HashMap::new();
            let (mut tl, mut tr) = (100.0, 100.0);

            for id in 0..50u16 {
                tl += rng.random_range(0.01..0.06);
                tr += rng.random_range(0.01..0.06);
                if rng.random_bool(0.5) {
                    tr = tl + rng.random_range(-0.004..0.004);
                }
                stamps.insert(id, Stamp::from_sec(tl).to_sec());
                stamps.insert(1000 + id, Stamp::from_sec(tr).to_sec());
                f.push(Side::Left, image(tl, id));
                f.push(Side::Right, image(tr, 1000 + id));
            }

            let mut dropped = 0;
            loop {
                match f.sync.tick() {
                    TickOutcome::Idle => break,
                    TickOutcome::Dropped(_) => dropped += 1,
                    TickOutcome::Stereo { .. } => {}
                    other => panic!("unexpected outcome {other:?}"),
                }
            }

            let frames = f.sink.frames();
            let mut last_left = None;
            for (t, left, right) in &frames {
                let l = image_id(left);
                let r = image_id(right.as_ref().unwrap());
                assert_eq!(*t, stamps[&l]);
                assert!((stamps[&l] - stamps[&r]).abs() <= tolerance + 1e-9);
                assert!(last_left.map_or(true, |prev| prev < l));
                last_left = Some(l);
            }

            let remaining = {
                let buffers = f.buffers.lock();
                buffers.left.len() + buffers.right.len()
            };
            assert_eq!(frames.len() * 2 + dropped + remaining, 100);
        }
    }
}
