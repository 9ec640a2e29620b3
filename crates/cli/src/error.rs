//! Error types for node startup and shutdown.

use thiserror::Error;

/// Node-level errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded
    #[error("Failed to load configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// A topic subscription could not be registered
    #[error("Failed to subscribe to {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: transport::TransportError,
    },

    /// Replay failed to load or play
    #[error("Replay failed: {0}")]
    Replay(#[source] transport::TransportError),

    /// Synchronizer thread failure
    #[error("Synchronizer failed: {0}")]
    Sync(#[from] sync_engine::SyncError),

    /// Blocking shutdown task panicked or was cancelled
    #[error("Shutdown task failed: {0}")]
    ShutdownTask(#[from] tokio::task::JoinError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn subscribe(topic: impl Into<String>, source: transport::TransportError) -> Self {
        Self::Subscribe {
            topic: topic.into(),
            source,
        }
    }
}

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, CliError>;
