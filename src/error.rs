//! Error taxonomy for the relay pipeline.

use crate::ports::provider::ProviderError;
use std::io;

/// Everything that can end a stretch request early.
///
/// Cleanup failures are absent: they are logged where they
/// happen and never replace the outcome already decided for the request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The request was rejected before any external call.
    #[error("{error}: {message}")]
    InvalidInput {
        error: &'static str,
        message: String,
    },

    /// The video attachment exceeded the configured ceiling.
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    /// The multipart body itself could not be read.
    #[error("malformed upload: {message}")]
    Transport { status: u16, message: String },

    /// The upload could not be written to the staging directory.
    #[error("failed to stage upload: {0}")]
    Staging(#[source] io::Error),

    /// The transformation provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RelayError {
    pub fn missing_video() -> Self {
        Self::InvalidInput {
            error: "Missing video file",
            message: "Please upload a video file".to_string(),
        }
    }

    pub fn invalid_file_type() -> Self {
        Self::InvalidInput {
            error: "Invalid file type",
            message: "Only video files are allowed".to_string(),
        }
    }

    pub fn unexpected_field(name: &str) -> Self {
        Self::InvalidInput {
            error: "Unexpected field",
            message: format!("Only a single '{}' file may be uploaded", name),
        }
    }

    pub fn invalid_factor() -> Self {
        Self::InvalidInput {
            error: "Invalid factor",
            message: "Factor must be between 0.1 and 5.0".to_string(),
        }
    }

    pub fn invalid_axis(message: String) -> Self {
        Self::InvalidInput {
            error: "Invalid axis",
            message,
        }
    }

    pub fn unsupported_format(supported: &str) -> Self {
        Self::InvalidInput {
            error: "Unsupported export format",
            message: format!("exportFormat must be one of {}", supported),
        }
    }
}
