//! Sensor mode flags
//!
//! `use_imu` and `use_stereo` are packed into one atomic byte so a reader
//! always sees a pair that was written together.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

const IMU_BIT: u8 = 0b01;
const STEREO_BIT: u8 = 0b10;

/// Snapshot of the sensor configuration the estimator expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorMode {
    pub use_imu: bool,
    pub use_stereo: bool,
}

impl SensorMode {
    pub fn new(use_imu: bool, use_stereo: bool) -> Self {
        Self {
            use_imu,
            use_stereo,
        }
    }

    pub fn with_imu(self, use_imu: bool) -> Self {
        Self { use_imu, ..self }
    }

    pub fn with_stereo(self, use_stereo: bool) -> Self {
        Self { use_stereo, ..self }
    }

    fn to_bits(self) -> u8 {
        (if self.use_imu { IMU_BIT } else { 0 }) | (if self.use_stereo { STEREO_BIT } else { 0 })
    }

    fn from_bits(bits: u8) -> Self {
        Self {
            use_imu: bits & IMU_BIT != 0,
            use_stereo: bits & STEREO_BIT != 0,
        }
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let camera = if self.use_stereo { "stereo" } else { "mono" };
        if self.use_imu {
            write!(f, "{camera}+imu")
        } else {
            write!(f, "{camera}")
        }
    }
}

/// Process-wide sensor mode, shared by control dispatch and the synchronizer
#[derive(Debug, Default)]
pub struct SensorModeState {
    bits: AtomicU8,
}

impl SensorModeState {
    pub fn new(mode: SensorMode) -> Self {
        Self {
            bits: AtomicU8::new(mode.to_bits()),
        }
    }

    /// Read both flags in one atomic load
    #[inline]
    pub fn load(&self) -> SensorMode {
        SensorMode::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn store(&self, mode: SensorMode) {
        self.bits.store(mode.to_bits(), Ordering::Release);
    }

    /// Atomically apply `f` and return the new mode
    pub fn update(&self, f: impl Fn(SensorMode) -> SensorMode) -> SensorMode {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let next = f(SensorMode::from_bits(current)).to_bits();
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return SensorMode::from_bits(next),
                Err(actual) => current = actual,
            }
        }
    }

    #[inline]
    pub fn use_imu(&self) -> bool {
        self.load().use_imu
    }

    #[inline]
    pub fn use_stereo(&self) -> bool {
        self.load().use_stereo
    }
}
