//! Recorder error types

use contracts::{Channel, ContractError};
use thiserror::Error;

/// Recorder-specific errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Output location could not be prepared
    #[error("failed to create output directory '{path}': {message}")]
    OutputDir { path: String, message: String },

    /// Capacity must be positive
    #[error("recorder capacity must be positive")]
    ZeroCapacity,

    /// Frame lacks a channel the recorder buffers
    #[error("frame {frame_number} has no {channel} sample")]
    MissingChannel { frame_number: u64, channel: Channel },

    /// Artifact encoding failed
    #[error("failed to encode '{artifact}': {message}")]
    Encode { artifact: String, message: String },

    /// Malformed annotation file
    #[error("invalid annotation: {message}")]
    Annotation { message: String },

    /// Storage error (from contract)
    #[error("storage error: {0}")]
    Contract(#[from] ContractError),
}

impl RecorderError {
    /// Create an output directory error
    pub fn output_dir(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OutputDir {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an encode error
    pub fn encode(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    /// Create an annotation parse error
    pub fn annotation(message: impl Into<String>) -> Self {
        Self::Annotation {
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RecorderError>;
