//! Node run statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::MetricsSummary;
use transport::ReplayStats;

/// Statistics from a node run
#[derive(Debug, Clone, Default)]
pub struct NodeStats {
    /// Wall-clock run time
    pub duration: Duration,

    /// Subscription handler counters
    pub ingestion: MetricsSnapshot,

    /// Synchronizer summary
    pub sync: MetricsSummary,

    /// Replay summary, when the node was fed from a recording
    pub replay: Option<ReplayStats>,

    /// Landmarks with a recorded ground-truth position
    pub ground_truth_points: usize,

    /// Images left unpaired in the buffers at shutdown
    pub left_remaining: usize,
    pub right_remaining: usize,
}

impl NodeStats {
    /// Frames handed to the estimator per wall-clock second
    pub fn fps(&self) -> f64 {
        let frames = self.sync.stereo_frames + self.sync.mono_frames;
        if self.duration.as_secs_f64() > 0.0 {
            frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Node Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Forwarded frames/s: {:.2}", self.fps());
        println!(
            "   └─ Unpaired at shutdown: left={} right={}",
            self.left_remaining, self.right_remaining
        );

        println!("\nIngestion");
        println!(
            "   ├─ Images: left={} right={}",
            self.ingestion.images_left, self.ingestion.images_right
        );
        println!("   ├─ IMU samples: {}", self.ingestion.imu_samples);
        println!(
            "   ├─ Feature frames: {} (rejected {})",
            self.ingestion.feature_frames, self.ingestion.feature_rejected
        );
        println!("   └─ Ground-truth landmarks: {}", self.ground_truth_points);

        if let Some(replay) = &self.replay {
            println!("\nReplay");
            println!("   ├─ Passes: {}", replay.passes);
            println!("   └─ Messages published: {}", replay.total());
        }

        println!("\n{}", self.sync);
    }
}
