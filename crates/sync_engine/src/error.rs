//! Sync engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to spawn synchronizer thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("synchronizer thread panicked")]
    WorkerPanicked,

    #[error("synchronizer already stopped")]
    AlreadyStopped,
}

pub type Result<T> = std::result::Result<T, SyncError>;
