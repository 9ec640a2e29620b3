//! Node metrics
//!
//! Thin wrappers over the `metrics` facade, plus an in-memory aggregator
//! for the shutdown summary.

use metrics::{counter, gauge, histogram};

/// Record an image arriving on one side of the stereo rig
pub fn record_image_received(side: &'static str) {
    counter!("vins_images_received_total", "side" => side).increment(1);
}

/// Record the depth of an image buffer after a push or pop
pub fn record_buffer_depth(side: &'static str, depth: usize) {
    gauge!("vins_buffer_depth", "side" => side).set(depth as f64);
}

/// Record a frame handed to the estimator (`mode` is `stereo` or `mono`)
pub fn record_frame_forwarded(mode: &'static str) {
    counter!("vins_frames_forwarded_total", "mode" => mode).increment(1);
}

/// Record an image dropped by the stereo pairing policy
pub fn record_frame_dropped(side: &'static str) {
    counter!("vins_frames_dropped_total", "side" => side).increment(1);
}

/// Record the left/right stamp gap of an emitted stereo pair
pub fn record_stereo_gap_ms(gap_ms: f64) {
    histogram!("vins_stereo_pair_gap_ms").record(gap_ms);
}

/// Record an image that could not be decoded
pub fn record_decode_failure(encoding: &str) {
    counter!("vins_decode_failures_total", "encoding" => encoding.to_string()).increment(1);
}

/// Record one inertial sample forwarded to the estimator
pub fn record_imu_sample() {
    counter!("vins_imu_samples_total").increment(1);
}

/// Record a feature frame forwarded to the estimator
pub fn record_feature_frame(features: usize, observations: usize) {
    counter!("vins_feature_frames_total").increment(1);
    histogram!("vins_feature_frame_features").record(features as f64);
    histogram!("vins_feature_frame_observations").record(observations as f64);
}

/// Record a feature message rejected for its layout
pub fn record_feature_rejected(reason: &'static str) {
    counter!("vins_feature_messages_rejected_total", "reason" => reason).increment(1);
}

/// Record a control signal
pub fn record_control_signal(signal: &'static str, value: bool) {
    counter!(
        "vins_control_signals_total",
        "signal" => signal,
        "value" => if value { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a call into the estimator gateway
pub fn record_gateway_call(entry: &'static str) {
    counter!("vins_gateway_calls_total", "entry" => entry).increment(1);
}

/// Synchronizer metrics aggregator
///
/// Aggregates in memory for the summary printed at shutdown.
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    pub stereo_frames: u64,
    pub mono_frames: u64,
    pub dropped_left: u64,
    pub dropped_right: u64,
    pub decode_failures: u64,

    /// Left/right stamp gap of emitted pairs (ms)
    pub pair_gap_stats: RunningStats,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stereo(&mut self, gap_s: f64) {
        self.stereo_frames += 1;
        self.pair_gap_stats.push(gap_s.abs() * 1000.0);
    }

    pub fn record_mono(&mut self) {
        self.mono_frames += 1;
    }

    pub fn record_drop_left(&mut self) {
        self.dropped_left += 1;
    }

    pub fn record_drop_right(&mut self) {
        self.dropped_right += 1;
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        let forwarded = self.stereo_frames + self.mono_frames;
        let dropped = self.dropped_left + self.dropped_right;
        let seen = forwarded + dropped;

        MetricsSummary {
            stereo_frames: self.stereo_frames,
            mono_frames: self.mono_frames,
            dropped_left: self.dropped_left,
            dropped_right: self.dropped_right,
            decode_failures: self.decode_failures,
            drop_rate: if seen > 0 {
                dropped as f64 / seen as f64 * 100.0
            } else {
                0.0
            },
            pair_gap_ms: StatsSummary::from(&self.pair_gap_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub stereo_frames: u64,
    pub mono_frames: u64,
    pub dropped_left: u64,
    pub dropped_right: u64,
    pub decode_failures: u64,
    pub drop_rate: f64,
    pub pair_gap_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Synchronizer Summary ===")?;
        writeln!(f, "Stereo frames: {}", self.stereo_frames)?;
        writeln!(f, "Mono frames: {}", self.mono_frames)?;
        writeln!(
            f,
            "Dropped images: left={} right={} ({:.2}%)",
            self.dropped_left, self.dropped_right, self.drop_rate
        )?;
        writeln!(f, "Decode failures: {}", self.decode_failures)?;
        writeln!(f, "Stereo pair gap (ms): {}", self.pair_gap_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
