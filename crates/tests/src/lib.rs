//! # Integration Tests
//!
//! End-to-end tests of the ingestion node.
//!
//! Covers:
//! - Stereo pairing and drop policy through the bus and sync worker
//! - Feature frames and IMU forwarding
//! - Control signals
//! - Replay-driven runs and config loading

#[cfg(test)]
mod support {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ImageMessage, NodeConfig, Stamp};
    use dispatcher::RecordingEstimator;
    use transport::Bus;
    use vins_node::Node;

    pub const STEREO_IMU: &str = r#"
imu_topic = "/imu0"
image0_topic = "/cam0/image_raw"
image1_topic = "/cam1/image_raw"
num_of_cam = 2
use_imu = true
"#;

    pub const MONO: &str = r#"
imu_topic = "/imu0"
image0_topic = "/cam0/image_raw"
num_of_cam = 1
use_imu = false
"#;

    pub fn config(toml: &str) -> NodeConfig {
        ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap()
    }

    pub fn start(toml: &str) -> (Node, Arc<Bus>, Arc<RecordingEstimator>) {
        let bus = Arc::new(Bus::new());
        let recorder = Arc::new(RecordingEstimator::new());
        let node = Node::start(config(toml), recorder.clone(), bus.clone()).unwrap();
        (node, bus, recorder)
    }

    /// 4x2 mono8 frame filled with `value`
    pub fn image(t: f64, value: u8) -> ImageMessage {
        ImageMessage {
            stamp: Stamp::from_sec(t),
            height: 2,
            width: 4,
            encoding: "mono8".to_string(),
            is_bigendian: false,
            step: 4,
            data: Bytes::from(vec![value; 8]),
        }
    }

    /// Poll `cond` until it holds or two seconds pass
    pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cond()
    }
}

#[cfg(test)]
mod sync_tests {
    use contracts::{BoolMessage, SensorMode};
    use dispatcher::GatewayCall;

    use crate::support::{image, start, wait_for, MONO, STEREO_IMU};

    #[test]
    fn test_stereo_pair_within_tolerance() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish("/cam0/image_raw", image(100.000, 10)).unwrap();
        bus.publish("/cam1/image_raw", image(100.002, 20)).unwrap();
        assert!(wait_for(|| !recorder.image_stamps().is_empty()));

        let stats = node.shutdown().unwrap();
        let calls = recorder.calls();
        let frames: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Image {
                    timestamp,
                    left,
                    right,
                } => Some((*timestamp, left, right)),
                _ => None,
            })
            .collect();

        assert_eq!(frames.len(), 1);
        let (timestamp, left, right) = frames[0];
        assert!((timestamp - 100.000).abs() < 1e-6);
        assert_eq!(left.as_raw(), &vec![10u8; 8]);
        assert_eq!(right.as_ref().unwrap().as_raw(), &vec![20u8; 8]);
        assert_eq!(stats.sync.stereo_frames, 1);
        assert_eq!((stats.left_remaining, stats.right_remaining), (0, 0));
    }

    #[test]
    fn test_older_left_dropped() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish("/cam0/image_raw", image(100.000, 0)).unwrap();
        bus.publish("/cam1/image_raw", image(100.010, 0)).unwrap();

        let stats = node.shutdown().unwrap();
        assert!(recorder.image_stamps().is_empty());
        assert_eq!(stats.sync.dropped_left, 1);
        assert_eq!((stats.left_remaining, stats.right_remaining), (0, 1));
    }

    #[test]
    fn test_late_right_pairs_with_next_left() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish("/cam0/image_raw", image(100.000, 0)).unwrap();
        bus.publish("/cam0/image_raw", image(100.050, 0)).unwrap();
        bus.publish("/cam1/image_raw", image(100.051, 0)).unwrap();

        let stats = node.shutdown().unwrap();
        let stamps = recorder.image_stamps();
        assert_eq!(stamps.len(), 1);
        assert!((stamps[0].0 - 100.050).abs() < 1e-6);
        assert!(stamps[0].1);
        assert_eq!(stats.sync.dropped_left, 1);
    }

    #[test]
    fn test_mono_forwards_left_only() {
        let (node, bus, recorder) = start(MONO);

        for i in 0..3 {
            bus.publish("/cam0/image_raw", image(10.0 + i as f64 * 0.05, 0))
                .unwrap();
        }
        // Not subscribed in mono
        assert_eq!(bus.subscriber_count("/cam1/image_raw"), 0);
        assert_eq!(bus.subscriber_count("/imu0"), 0);

        let stats = node.shutdown().unwrap();
        let stamps = recorder.image_stamps();
        assert_eq!(stamps.len(), 3);
        assert!(stamps.iter().all(|(_, stereo)| !stereo));
        assert!(stamps.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(stats.sync.mono_frames, 3);
    }

    #[test]
    fn test_cam_switch_to_mono() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish("/vins_cam_switch", BoolMessage::from(false))
            .unwrap();
        assert!(wait_for(|| node.mode() == SensorMode::new(true, false)));

        bus.publish("/cam0/image_raw", image(5.0, 0)).unwrap();
        assert!(wait_for(|| !recorder.image_stamps().is_empty()));

        node.shutdown().unwrap();
        assert!(recorder.calls().contains(&GatewayCall::ChangeSensorType {
            use_imu: true,
            use_stereo: false
        }));
        assert_eq!(recorder.image_stamps(), vec![(5.0, false)]);
    }

    #[test]
    fn test_mode_toggles_during_image_traffic() {
        let (node, bus, recorder) = start(STEREO_IMU);

        let toggler = {
            let bus = bus.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    bus.publish("/vins_imu_switch", BoolMessage::from(i % 3 != 0))
                        .unwrap();
                    bus.publish("/vins_cam_switch", BoolMessage::from(i % 2 == 0))
                        .unwrap();
                }
            })
        };
        for i in 0..200u32 {
            let t = 50.0 + i as f64 * 0.05;
            bus.publish("/cam0/image_raw", image(t, i as u8)).unwrap();
            bus.publish("/cam1/image_raw", image(t + 0.001, i as u8))
                .unwrap();
        }
        toggler.join().unwrap();
        node.shutdown().unwrap();

        let calls = recorder.calls();
        for call in &calls {
            if let GatewayCall::Image {
                left,
                right: Some(right),
                ..
            } = call
            {
                assert_eq!(left.as_raw()[0], right.as_raw()[0]);
            }
        }

        // Last published: imu_switch(199 % 3 != 0), cam_switch(199 % 2 == 0)
        let last_mode = calls.iter().rev().find_map(|call| match call {
            GatewayCall::ChangeSensorType {
                use_imu,
                use_stereo,
            } => Some(SensorMode::new(*use_imu, *use_stereo)),
            _ => None,
        });
        assert_eq!(last_mode, Some(SensorMode::new(true, false)));
    }
}

#[cfg(test)]
mod estimator_tests {
    use contracts::{
        BoolMessage, ChannelFloat32, ImuMessage, Point32, PointCloudMessage, Stamp, Vector3,
    };
    use dispatcher::GatewayCall;

    use crate::support::{start, wait_for, STEREO_IMU};

    fn feature_message(values: &[f32]) -> PointCloudMessage {
        PointCloudMessage {
            stamp: Stamp::new(100, 0),
            points: vec![Point32::new(0.0, 0.0, 1.0)],
            channels: values
                .iter()
                .map(|v| ChannelFloat32::new("", vec![*v]))
                .collect(),
        }
    }

    #[test]
    fn test_feature_frame_reaches_estimator() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish(
            "/feature_tracker/feature",
            feature_message(&[5.0, 0.0, 12.0, 8.0, 0.0, 0.0]),
        )
        .unwrap();

        let stats = node.shutdown().unwrap();
        let frames = recorder.feature_frames();
        assert_eq!(frames.len(), 1);

        let (timestamp, frame) = &frames[0];
        assert_eq!(*timestamp, 100.0);
        assert_eq!(frame.len(), 1);
        let observations = frame.get(5).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].camera_id, 0);
        assert_eq!(observations[0].pixel(), (12.0, 8.0));
        assert_eq!(observations[0].velocity(), (0.0, 0.0));
        assert_eq!(stats.ingestion.feature_frames, 1);
        assert_eq!(stats.ground_truth_points, 0);
    }

    #[test]
    fn test_ground_truth_recorded() {
        let (node, bus, _recorder) = start(STEREO_IMU);

        bus.publish(
            "/feature_tracker/feature",
            feature_message(&[7.0, 1.0, 3.0, 4.0, 0.5, -0.5, 1.5, 2.0, 3.0]),
        )
        .unwrap();
        assert!(wait_for(|| node.ground_truth().len() == 1));

        let position = node.ground_truth().get(7).unwrap();
        assert_eq!(position, nalgebra::Vector3::new(1.5, 2.0, 3.0));
        node.shutdown().unwrap();
    }

    #[test]
    fn test_malformed_feature_message_skipped() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish("/feature_tracker/feature", feature_message(&[5.0, 0.0]))
            .unwrap();

        let stats = node.shutdown().unwrap();
        assert!(recorder.feature_frames().is_empty());
        assert_eq!(stats.ingestion.feature_rejected, 1);
    }

    #[test]
    fn test_imu_forwarded_in_order() {
        let (node, bus, recorder) = start(STEREO_IMU);

        for i in 0..10 {
            bus.publish(
                "/imu0",
                ImuMessage {
                    stamp: Stamp::from_sec(1.0 + i as f64 * 0.005),
                    linear_acceleration: Vector3::new(0.0, 0.0, 9.81),
                    angular_velocity: Vector3::new(0.0, 0.0, 0.0),
                },
            )
            .unwrap();
        }

        node.shutdown().unwrap();
        let stamps: Vec<f64> = recorder
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Imu { timestamp, .. } => Some(timestamp),
                _ => None,
            })
            .collect();
        assert_eq!(stamps.len(), 10);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_restart_twice() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish("/vins_restart", BoolMessage::from(true)).unwrap();
        bus.publish("/vins_restart", BoolMessage::from(false)).unwrap();
        bus.publish("/vins_restart", BoolMessage::from(true)).unwrap();
        node.shutdown().unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                GatewayCall::SetParameter,
                GatewayCall::ClearState,
                GatewayCall::SetParameter,
                GatewayCall::ClearState,
                GatewayCall::SetParameter,
            ]
        );
    }

    #[test]
    fn test_imu_switch_keeps_cameras() {
        let (node, bus, recorder) = start(STEREO_IMU);

        bus.publish("/vins_imu_switch", BoolMessage::from(false))
            .unwrap();
        node.shutdown().unwrap();

        assert_eq!(
            recorder.calls().last(),
            Some(&GatewayCall::ChangeSensorType {
                use_imu: false,
                use_stereo: true
            })
        );
    }
}

#[cfg(test)]
mod replay_tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::BoolMessage;
    use dispatcher::RecordingEstimator;
    use transport::{Bus, ReplayMessage, ReplaySource};
    use vins_node::Node;

    use crate::support::{image, start, STEREO_IMU};

    #[tokio::test]
    async fn test_replay_driven_run() {
        let (node, bus, recorder) = start(STEREO_IMU);

        let mut messages = Vec::new();
        for i in 0..5 {
            let t = 200.0 + i as f64 * 0.05;
            messages.push(("/cam0/image_raw".into(), ReplayMessage::Image(image(t, 0))));
            messages.push((
                "/cam1/image_raw".into(),
                ReplayMessage::Image(image(t + 0.001, 0)),
            ));
        }
        messages.push(("/vins_restart".into(), ReplayMessage::Bool(BoolMessage::from(true))));

        let replay = ReplaySource::from_messages(messages, 0.0).play(&bus).await.unwrap();
        assert_eq!(replay.images, 10);
        assert_eq!(replay.controls, 1);

        let stats = node.shutdown().unwrap();
        let stamps = recorder.image_stamps();
        assert!(!stamps.is_empty());
        assert!(stamps.iter().all(|(_, stereo)| *stereo));
        assert!(stamps.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(
            stats.sync.stereo_frames as usize + stats.sync.dropped_left as usize
                + stats.left_remaining,
            5
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_async_shutdown_leaves_runtime_free() {
        let (node, bus, recorder) = start(STEREO_IMU);
        bus.publish("/cam0/image_raw", image(100.000, 1)).unwrap();
        bus.publish("/cam1/image_raw", image(100.002, 2)).unwrap();

        let ticks = Arc::new(AtomicU64::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    ticks.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        let stats = node.shutdown_async().await.unwrap();
        assert!(ticks.load(Ordering::Relaxed) > 0);
        ticker.abort();

        assert_eq!(stats.sync.stereo_frames, 1);
        assert_eq!(recorder.image_stamps().len(), 1);
    }

    #[tokio::test]
    async fn test_config_file_with_recording() {
        let dir = tempfile::tempdir().unwrap();

        let mut recording = std::fs::File::create(dir.path().join("run.jsonl")).unwrap();
        writeln!(
            recording,
            r#"{{"kind":"image","topic":"/cam0/image_raw","message":{{"stamp":{{"sec":3,"nanosec":0}},"height":1,"width":2,"encoding":"mono8","data":[1,2]}}}}"#
        )
        .unwrap();
        writeln!(
            recording,
            r#"{{"kind":"bool","topic":"/vins_restart","message":{{"data":false}}}}"#
        )
        .unwrap();

        let config_path = dir.path().join("node.toml");
        std::fs::write(
            &config_path,
            "imu_topic = \"/imu0\"\nimage0_topic = \"/cam0/image_raw\"\nnum_of_cam = 1\n\n[replay]\npath = \"run.jsonl\"\nspeed = 0.0\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&config_path).unwrap();
        let replay_config = config.replay.clone().unwrap();
        assert_eq!(replay_config.path, dir.path().join("run.jsonl"));

        let bus = Arc::new(Bus::new());
        let recorder = Arc::new(RecordingEstimator::new());
        let node = Node::start(config, recorder.clone(), bus.clone()).unwrap();

        let source = ReplaySource::load(&replay_config).unwrap();
        assert_eq!(source.len(), 2);
        source.play(&bus).await.unwrap();

        let stats = node.shutdown().unwrap();
        assert_eq!(stats.sync.mono_frames, 1);
        assert_eq!(recorder.image_stamps(), vec![(3.0, false)]);
    }
}
