//! Message-rate diagnostic

/// Frames-per-second over message time
///
/// Reports once at least one second of message time has elapsed since the
/// window started, then starts a new window.
#[derive(Debug, Clone, Default)]
pub struct RateMeter {
    window_start: Option<f64>,
    count: u64,
}

impl RateMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a frame stamped `timestamp`; returns the rate when a window closes
    pub fn record(&mut self, timestamp: f64) -> Option<f64> {
        let start = *self.window_start.get_or_insert(timestamp);
        self.count += 1;

        let elapsed = timestamp - start;
        if elapsed < 1.0 {
            if elapsed < 0.0 {
                self.reset_at(timestamp);
            }
            return None;
        }

        let fps = (self.count - 1) as f64 / elapsed;
        self.reset_at(timestamp);
        Some(fps)
    }

    fn reset_at(&mut self, timestamp: f64) {
        self.window_start = Some(timestamp);
        self.count = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_after_one_second() {
        let mut meter = RateMeter::new();
        let mut reports = Vec::new();
        for i in 0..=50 {
            if let Some(fps) = meter.record(100.0 + i as f64 * 0.05) {
                reports.push(fps);
            }
        }

        assert_eq!(reports.len(), 2);
        assert!((reports[0] - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_backwards_stamp_restarts_window() {
        let mut meter = RateMeter::new();
        meter.record(10.0);
        meter.record(9.0);
        assert!(meter.record(9.5).is_none());
        assert!(meter.record(10.0).is_some());
    }
}
