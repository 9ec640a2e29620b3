//! Transport error types

use thiserror::Error;

/// Transport error
#[derive(Debug, Error)]
pub enum TransportError {
    /// Topic already carries a different message type
    #[error("topic {topic} carries {expected}, not {found}")]
    TypeMismatch {
        topic: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Bus has been shut down
    #[error("bus is shut down")]
    Closed,

    /// Delivery thread could not be spawned
    #[error("failed to spawn delivery thread for {topic}: {source}")]
    Spawn {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed line in a recording
    #[error("recording line {line}: {message}")]
    ReplayParse { line: usize, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport Result alias
pub type Result<T> = std::result::Result<T, TransportError>;
