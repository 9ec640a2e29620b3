//! Ingestion error types

use thiserror::Error;

use crate::buffer::Side;
use crate::decode::DecodeError;
use crate::frame_builder::FeatureError;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Image could not be turned into the working layout
    #[error("failed to decode {side} image: {source}")]
    Decode {
        side: Side,
        #[source]
        source: DecodeError,
    },

    /// Feature message rejected
    #[error("rejected feature message on {topic}: {source}")]
    Feature {
        topic: String,
        #[source]
        source: FeatureError,
    },
}

impl IngestionError {
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Decode { .. } => false,
            Self::Feature { source, .. } => source.is_fatal(),
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
