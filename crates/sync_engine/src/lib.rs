//! # Sync Engine
//!
//! Stereo/mono image synchronization.
//!
//! Responsibilities:
//! - Pair left/right fronts whose stamps lie within the stereo tolerance
//! - Drop the strictly older front otherwise
//! - Forward single frames in mono mode
//! - Decode frames outside the buffer lock and hand them to the estimator
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::{SyncWorker, Synchronizer};
//!
//! let sync = Synchronizer::new(&config.sync, buffers, mode, gateway);
//! let worker = SyncWorker::spawn(sync, Duration::from_millis(config.sync.poll_interval_ms))?;
//! // ...
//! let summary = worker.stop()?;
//! ```

mod error;
mod rate;
mod synchronizer;
mod worker;

pub use error::{Result, SyncError};
pub use ingestion::Side;
pub use rate::RateMeter;
pub use synchronizer::{Synchronizer, TickOutcome};
pub use worker::SyncWorker;
