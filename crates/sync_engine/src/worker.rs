//! Dedicated synchronizer thread

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use observability::MetricsSummary;
use tracing::{debug, error, info};

use crate::error::{Result, SyncError};
use crate::synchronizer::Synchronizer;

const THREAD_NAME: &str = "vins-sync";

/// Runs `Synchronizer::tick` on a named thread at a fixed cadence
///
/// The stop flag is observed once per tick; `stop` joins the thread and
/// returns the synchronizer summary.
pub struct SyncWorker {
    stop: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<MetricsSummary>>,
}

impl SyncWorker {
    pub fn spawn(mut sync: Synchronizer, poll_interval: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let thread_stop = stop.clone();
        let thread_ticks = ticks.clone();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                debug!(
                    poll_interval_ms = poll_interval.as_millis() as u64,
                    tolerance_s = sync.tolerance(),
                    "synchronizer started"
                );
                while !thread_stop.load(Ordering::Acquire) {
                    sync.tick();
                    thread_ticks.fetch_add(1, Ordering::Relaxed);
                    thread::sleep(poll_interval);
                }
                sync.summary()
            })
            .map_err(SyncError::Spawn)?;

        info!(thread = THREAD_NAME, "sync worker spawned");
        Ok(Self {
            stop,
            ticks,
            handle: Some(handle),
        })
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the thread to stop and wait for it
    pub fn stop(mut self) -> Result<MetricsSummary> {
        self.join()
    }

    fn join(&mut self) -> Result<MetricsSummary> {
        self.stop.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Err(SyncError::AlreadyStopped);
        };

        match handle.join() {
            Ok(summary) => {
                info!(ticks = self.ticks(), "sync worker stopped");
                Ok(summary)
            }
            Err(_) => {
                error!("sync worker panicked");
                Err(SyncError::WorkerPanicked)
            }
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.join();
        }
    }
}
