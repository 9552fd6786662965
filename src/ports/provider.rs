use crate::domain::request::{ExportFormat, StretchFactor};
use crate::ports::storage::StorageError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// One delegated transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformJob {
    /// Staged upload on local storage.
    pub source: PathBuf,
    /// Media type the client declared for the upload.
    pub source_content_type: String,
    pub factor: StretchFactor,
    pub format: ExportFormat,
    /// Relay-assigned name for the output, e.g. `stretched-<uuid>.mp4`.
    pub output_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered and refused the job.
    #[error("{message}")]
    Rejected { status: Option<u16>, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider did not respond within {0:?}")]
    Timeout(Duration),

    #[error("failed to read staged media: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to publish output: {0}")]
    Storage(#[from] StorageError),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout(_) => true,
            ProviderError::Rejected {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// An external service that applies the stretch and hosts the result.
///
/// Implementations make exactly one attempt per call; retry and deadline
/// policy belong to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Transform the staged file and return a fetchable URL for the output.
    async fn transform(&self, job: &TransformJob) -> Result<String, ProviderError>;
}

#[async_trait]
impl<T: TransformProvider + ?Sized> TransformProvider for Box<T> {
    async fn transform(&self, job: &TransformJob) -> Result<String, ProviderError> {
        (**self).transform(job).await
    }
}
