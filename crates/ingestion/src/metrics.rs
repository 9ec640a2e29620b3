//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every ingestion handler
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    pub images_left: AtomicU64,
    pub images_right: AtomicU64,
    pub imu_samples: AtomicU64,
    pub feature_frames: AtomicU64,
    pub feature_rejected: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_image(&self, side: crate::Side) {
        let counter = match side {
            crate::Side::Left => &self.images_left,
            crate::Side::Right => &self.images_right,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_imu(&self) {
        self.imu_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feature_frame(&self) {
        self.feature_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_feature_rejected(&self) {
        self.feature_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            images_left: self.images_left.load(Ordering::Relaxed),
            images_right: self.images_right.load(Ordering::Relaxed),
            imu_samples: self.imu_samples.load(Ordering::Relaxed),
            feature_frames: self.feature_frames.load(Ordering::Relaxed),
            feature_rejected: self.feature_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `IngestionMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub images_left: u64,
    pub images_right: u64,
    pub imu_samples: u64,
    pub feature_frames: u64,
    pub feature_rejected: u64,
}
