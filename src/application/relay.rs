use super::retry::{call_with_retry, RetryPolicy};
use crate::domain::request::{validate, RawUpload};
use crate::domain::result::{generated_name, timestamp, TransformResult};
use crate::error::RelayError;
use crate::ports::provider::{TransformJob, TransformProvider};
use tracing::{debug, error, info};

/// Sequences one stretch request:
/// `Received -> Validated -> Staged -> Delegated -> Completed | Failed`.
///
/// The staged upload is released on entry to either terminal state. Nothing
/// is shared between requests, and resubmitting the same upload runs the
/// whole pipeline again under a new output name.
pub struct RelayService<P> {
    provider: P,
    retry: RetryPolicy,
}

impl<P> RelayService<P>
where
    P: TransformProvider,
{
    pub fn new(provider: P, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    pub async fn process(&self, upload: RawUpload) -> Result<TransformResult, RelayError> {
        debug!(state = "received", has_video = upload.video.is_some());

        let request = validate(upload).inspect_err(|err| {
            debug!(state = "failed", error = %err, "request rejected");
        })?;
        let (source, params) = request.into_parts();
        debug!(state = "validated", factor = params.factor.value());

        let output_name = generated_name(params.export_format);
        let job = TransformJob {
            source: source.path().to_path_buf(),
            source_content_type: params.content_type.clone(),
            factor: params.factor,
            format: params.export_format,
            output_name: output_name.clone(),
        };
        debug!(state = "staged", path = %job.source.display(), bytes = params.size);

        info!(
            original_name = %params.original_name,
            factor = params.factor.value(),
            format = %params.export_format,
            "processing video"
        );

        let provider = &self.provider;
        let job_ref = &job;
        let outcome = call_with_retry(&self.retry, |attempt| {
            debug!(state = "delegated", attempt);
            provider.transform(job_ref)
        })
        .await;

        source.release().await;

        match outcome {
            Ok(url) => {
                info!(name = %output_name, url = %url, "video processing completed");
                Ok(TransformResult {
                    url,
                    name: output_name,
                    factor: params.factor.value(),
                    original_name: params.original_name,
                    processed_at: timestamp(),
                })
            }
            Err(err) => {
                error!(error = %err, original_name = %params.original_name, "video processing failed");
                Err(RelayError::Provider(err))
            }
        }
    }
}
