//! Stretch provider that shells out to a local `ffmpeg`.

use crate::domain::request::StretchFactor;
use crate::domain::transient::TransientFile;
use crate::ports::provider::{ProviderError, TransformJob, TransformProvider};
use crate::ports::storage::ObjectStore;
use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::OnceLock;
use tokio::process::Command as TokioCommand;
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeExecutor: Send + Sync {
    async fn run_ffmpeg_filter(
        &self,
        input: &Path,
        filter: &str,
        muxer: &str,
        audio_codec: &str,
        output: &Path,
    ) -> io::Result<Output>;
}

pub struct FfmpegExecutor {
    binary: String,
}

impl FfmpegExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args(
        input: &Path,
        filter: &str,
        muxer: &str,
        audio_codec: &str,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-hide_banner".into(), "-i".into()];
        args.push(input.into());
        args.extend(["-vf", filter, "-c:a", audio_codec, "-f", muxer].map(OsString::from));
        args.push(output.into());
        args
    }
}

#[async_trait]
impl TranscodeExecutor for FfmpegExecutor {
    async fn run_ffmpeg_filter(
        &self,
        input: &Path,
        filter: &str,
        muxer: &str,
        audio_codec: &str,
        output: &Path,
    ) -> io::Result<Output> {
        TokioCommand::new(&self.binary)
            .args(Self::args(input, filter, muxer, audio_codec, output))
            .kill_on_drop(true)
            .output()
            .await
    }
}

/// Renders the stretch locally and publishes the result to an object store.
pub struct LocalTranscodeProvider<E, S> {
    executor: E,
    store: S,
    scratch_dir: PathBuf,
}

impl<E, S> LocalTranscodeProvider<E, S>
where
    E: TranscodeExecutor,
    S: ObjectStore,
{
    pub fn new(executor: E, store: S, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            store,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Keep the width, scale the height, and round it to an even number
    /// of rows as most encoders require.
    pub fn scale_filter(factor: StretchFactor) -> String {
        format!(
            "scale=iw:trunc(ih*{:.2}/2)*2",
            factor.height_percent() as f64 / 100.0
        )
    }

    async fn render(&self, job: &TransformJob, output: &TransientFile) -> Result<(), ProviderError> {
        let filter = Self::scale_filter(job.factor);
        debug!(filter = %filter, output = %output.path().display(), "running ffmpeg");

        let result = self
            .executor
            .run_ffmpeg_filter(
                &job.source,
                &filter,
                job.format.muxer(),
                job.format.audio_codec(),
                output.path(),
            )
            .await?;

        if !result.status.success() {
            return Err(ProviderError::Rejected {
                status: None,
                message: ffmpeg_failure(&result),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<E, S> TransformProvider for LocalTranscodeProvider<E, S>
where
    E: TranscodeExecutor,
    S: ObjectStore,
{
    async fn transform(&self, job: &TransformJob) -> Result<String, ProviderError> {
        let output = TransientFile::reserve(&self.scratch_dir, "render", job.format.extension());

        let outcome = match self.render(job, &output).await {
            Ok(()) => self
                .store
                .put(&job.output_name, output.path(), job.format.content_type())
                .await
                .map_err(ProviderError::from),
            Err(err) => Err(err),
        };

        output.release().await;
        outcome
    }
}

/// Last error-looking line of ffmpeg's stderr, or the exit status.
fn ffmpeg_failure(output: &Output) -> String {
    static ERROR_LINE: OnceLock<Regex> = OnceLock::new();
    let re = ERROR_LINE.get_or_init(|| {
        Regex::new(r"(?im)^.*(error|invalid|no such file|not found|unable).*$")
            .expect("error line pattern is valid")
    });

    let stderr = String::from_utf8_lossy(&output.stderr);
    re.find_iter(&stderr)
        .last()
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| format!("ffmpeg exited with {}", output.status))
}
