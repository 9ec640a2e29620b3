//! Control signal dispatch

use std::fmt;
use std::sync::Arc;

use contracts::{BoolMessage, EstimatorGateway, SensorMode, SensorModeState};
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

/// The three boolean control topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    Restart,
    ImuSwitch,
    CamSwitch,
}

impl ControlSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restart => "restart",
            Self::ImuSwitch => "imu_switch",
            Self::CamSwitch => "cam_switch",
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies control signals to the sensor mode and the estimator
///
/// Every mode change and the gateway call reporting it happen under one
/// lock, so the last `change_sensor_type` the estimator sees always matches
/// the final mode.
pub struct ControlDispatch {
    gateway: Arc<dyn EstimatorGateway>,
    mode: Arc<SensorModeState>,
    section: Mutex<()>,
}

impl ControlDispatch {
    pub fn new(gateway: Arc<dyn EstimatorGateway>, mode: Arc<SensorModeState>) -> Self {
        Self {
            gateway,
            mode,
            section: Mutex::new(()),
        }
    }

    /// Current sensor mode
    pub fn mode(&self) -> SensorMode {
        self.mode.load()
    }

    /// Route `msg` to the handler of `signal`
    pub fn dispatch(&self, signal: ControlSignal, msg: BoolMessage) {
        observability::record_control_signal(signal.as_str(), msg.data);
        match signal {
            ControlSignal::Restart => self.restart(msg.data),
            ControlSignal::ImuSwitch => {
                self.imu_switch(msg.data);
            }
            ControlSignal::CamSwitch => {
                self.cam_switch(msg.data);
            }
        }
    }

    /// Reset the estimator on `true`; `false` is ignored
    #[instrument(name = "control_restart", skip(self))]
    pub fn restart(&self, requested: bool) {
        if !requested {
            debug!("restart signal false, ignored");
            return;
        }

        let _section = self.section.lock();
        warn!("restarting the estimator");
        self.gateway.clear_state();
        self.gateway.set_parameter();
    }

    /// Enable or disable the IMU, keeping the camera setup
    #[instrument(name = "control_imu_switch", skip(self))]
    pub fn imu_switch(&self, use_imu: bool) -> SensorMode {
        if use_imu {
            warn!("use IMU");
        } else {
            warn!("disable IMU");
        }
        self.apply(|mode| mode.with_imu(use_imu))
    }

    /// Switch between stereo and mono (left camera), keeping the IMU setup
    #[instrument(name = "control_cam_switch", skip(self))]
    pub fn cam_switch(&self, use_stereo: bool) -> SensorMode {
        if use_stereo {
            warn!("use stereo");
        } else {
            warn!("use mono camera (left)");
        }
        self.apply(|mode| mode.with_stereo(use_stereo))
    }

    fn apply(&self, f: impl Fn(SensorMode) -> SensorMode) -> SensorMode {
        let _section = self.section.lock();
        let mode = self.mode.update(f);
        self.gateway
            .change_sensor_type(mode.use_imu, mode.use_stereo);
        debug!(mode = %mode, "sensor mode changed");
        mode
    }
}
