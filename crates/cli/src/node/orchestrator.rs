//! Node orchestrator - wires subscriptions, buffers and the synchronizer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    BoolMessage, EstimatorGateway, GroundTruthTable, ImageMessage, ImuMessage, NodeConfig,
    PointCloudMessage, SensorMode, SensorModeState, TopicName,
};
use dispatcher::{ControlDispatch, ControlSignal};
use ingestion::{
    FeatureHandler, ImageHandler, ImuHandler, IngestionMetrics, MessageHandler,
    SharedStereoBuffers, Side, StereoBuffers,
};
use sync_engine::{SyncWorker, Synchronizer};
use tracing::{debug, info, instrument};
use transport::{Bus, Qos};

use super::NodeStats;
use crate::error::{CliError, Result};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// A running ingestion node
///
/// Owns the buffer pair, the sync worker and the subscriptions registered on
/// the bus. `shutdown` stops everything and returns the run statistics.
pub struct Node {
    config: NodeConfig,
    bus: Arc<Bus>,
    mode: Arc<SensorModeState>,
    buffers: SharedStereoBuffers,
    metrics: Arc<IngestionMetrics>,
    ground_truth: GroundTruthTable,
    worker: SyncWorker,
    started: Instant,
}

impl Node {
    /// Start the node on `bus`, feeding `gateway`
    ///
    /// The estimator parameters are set once before any subscription is
    /// registered. The IMU topic is only subscribed when the IMU is enabled,
    /// the right image topic only in stereo mode.
    #[instrument(name = "node_start", skip_all, fields(mode = %config.initial_mode()))]
    pub fn start(
        config: NodeConfig,
        gateway: Arc<dyn EstimatorGateway>,
        bus: Arc<Bus>,
    ) -> Result<Self> {
        gateway.set_parameter();

        let mode = Arc::new(SensorModeState::new(config.initial_mode()));
        let buffers = StereoBuffers::shared();
        let metrics = Arc::new(IngestionMetrics::new());
        let ground_truth = GroundTruthTable::new();

        let node_bus = bus.clone();
        let subscribe_images = |topic: &TopicName, side: Side| -> Result<()> {
            let handler = ImageHandler::new(topic.clone(), side, buffers.clone(), metrics.clone());
            Self::register::<ImageMessage, _>(
                &node_bus,
                Qos::keep_last(config.qos.image_depth),
                handler,
            )
        };

        if config.use_imu {
            let handler = ImuHandler::new(config.imu_topic.clone(), gateway.clone(), metrics.clone());
            Self::register::<ImuMessage, _>(&bus, Qos::keep_last(config.qos.imu_depth), handler)?;
        }

        let handler = FeatureHandler::new(
            config.feature_topic.clone(),
            gateway.clone(),
            ground_truth.clone(),
            metrics.clone(),
        );
        Self::register::<PointCloudMessage, _>(
            &bus,
            Qos::keep_last(config.qos.feature_depth),
            handler,
        )?;

        subscribe_images(&config.image0_topic, Side::Left)?;
        if config.stereo() {
            if let Some(topic) = &config.image1_topic {
                subscribe_images(topic, Side::Right)?;
            }
        }

        let control = Arc::new(ControlDispatch::new(gateway.clone(), mode.clone()));
        let control_qos = Qos::keep_last(config.qos.control_depth);
        for (topic, signal) in [
            (&config.control.restart, ControlSignal::Restart),
            (&config.control.imu_switch, ControlSignal::ImuSwitch),
            (&config.control.cam_switch, ControlSignal::CamSwitch),
        ] {
            let control = control.clone();
            bus.subscribe(topic.clone(), control_qos, move |msg: BoolMessage| {
                control.dispatch(signal, msg)
            })
            .map_err(|e| CliError::subscribe(topic.as_str(), e))?;
        }

        let sync = Synchronizer::new(&config.sync, buffers.clone(), mode.clone(), gateway);
        let worker = SyncWorker::spawn(sync, Duration::from_millis(config.sync.poll_interval_ms))?;

        info!(
            imu = config.use_imu,
            cameras = config.num_of_cam,
            tolerance_s = config.sync.stereo_tolerance_s,
            "node started"
        );

        Ok(Self {
            config,
            bus,
            mode,
            buffers,
            metrics,
            ground_truth,
            worker,
            started: Instant::now(),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Current sensor mode
    pub fn mode(&self) -> SensorMode {
        self.mode.load()
    }

    /// Ground-truth landmark positions seen so far
    pub fn ground_truth(&self) -> &GroundTruthTable {
        &self.ground_truth
    }

    /// Buffered (left, right) images
    pub fn buffer_depths(&self) -> (usize, usize) {
        let buffers = self.buffers.lock();
        (buffers.left.len(), buffers.right.len())
    }

    /// Stop delivery, let the synchronizer drain, then stop it
    ///
    /// Messages already queued on the bus are delivered before the
    /// synchronizer is stopped.
    #[instrument(name = "node_shutdown", skip(self))]
    pub fn shutdown(self) -> Result<NodeStats> {
        self.bus.shutdown();
        self.settle();

        let (left, right) = self.buffer_depths();
        let sync = self.worker.stop()?;
        info!(left, right, "node stopped");

        Ok(NodeStats {
            duration: self.started.elapsed(),
            ingestion: self.metrics.snapshot(),
            sync,
            replay: None,
            ground_truth_points: self.ground_truth.len(),
            left_remaining: left,
            right_remaining: right,
        })
    }

    /// `shutdown` on the blocking pool, for callers on the async runtime
    pub async fn shutdown_async(self) -> Result<NodeStats> {
        tokio::task::spawn_blocking(move || self.shutdown()).await?
    }

    /// Wait until the buffer depths stop changing
    fn settle(&self) {
        let step = Duration::from_millis((self.config.sync.poll_interval_ms * 10).max(10));
        let deadline = Instant::now() + SETTLE_TIMEOUT;

        let mut previous = self.buffer_depths();
        while Instant::now() < deadline {
            std::thread::sleep(step);
            let current = self.buffer_depths();
            if current == previous {
                break;
            }
            previous = current;
        }
        debug!(depths = ?previous, "buffers settled");
    }

    fn register<M, H>(bus: &Bus, qos: Qos, handler: H) -> Result<()>
    where
        M: Send + 'static,
        H: MessageHandler<M> + 'static,
    {
        let topic = handler.topic().clone();
        bus.subscribe(topic.clone(), qos, move |msg: M| handler.handle(msg))
            .map_err(|e| CliError::subscribe(topic.as_str(), e))?;
        debug!(topic = %topic, depth = qos.depth, "subscribed");
        Ok(())
    }
}
