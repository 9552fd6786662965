//! Multipart intake: text fields are buffered, the video is streamed to disk.

use crate::domain::request::{is_video_media_type, RawUpload, StagedUpload};
use crate::domain::transient::TransientFile;
use crate::error::RelayError;
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::BoxError;
use futures::{Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Slack allowed on top of the video ceiling for boundaries and text fields.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub staging_dir: PathBuf,
    pub max_file_bytes: u64,
}

impl UploadLimits {
    /// Limit for the whole request body.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_file_bytes.saturating_add(FORM_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX)
    }
}

/// Read the stretch form. The `video` field is staged as a [`TransientFile`]
/// as it arrives; non-video media types are refused before any byte is written.
pub async fn read_upload(
    multipart: &mut Multipart,
    limits: &UploadLimits,
) -> Result<RawUpload, RelayError> {
    let mut upload = RawUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error(e.into(), limits.max_file_bytes))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "video" => {
                if upload.video.is_some() {
                    return Err(RelayError::unexpected_field("video"));
                }
                upload.video = Some(stage_video(field, limits).await?);
            }
            "factor" => upload.factor = Some(text(field, limits).await?),
            "axisStart" => upload.axis_start = Some(text(field, limits).await?),
            "axisEnd" => upload.axis_end = Some(text(field, limits).await?),
            "exportFormat" => upload.export_format = Some(text(field, limits).await?),
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(upload)
}

async fn text(field: Field<'_>, limits: &UploadLimits) -> Result<String, RelayError> {
    field
        .text()
        .await
        .map_err(|e| body_error(e.into(), limits.max_file_bytes))
}

async fn stage_video(field: Field<'_>, limits: &UploadLimits) -> Result<StagedUpload, RelayError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !is_video_media_type(&content_type) {
        return Err(RelayError::invalid_file_type());
    }
    let original_name = field
        .file_name()
        .filter(|n| !n.is_empty())
        .unwrap_or("video")
        .to_string();

    let file = TransientFile::reserve(&limits.staging_dir, "upload", "part");
    let size = stream_to_file(file.path(), field, limits.max_file_bytes).await?;
    debug!(path = %file.path().display(), bytes = size, "upload staged");

    Ok(StagedUpload {
        file,
        original_name,
        content_type,
        size,
    })
}

/// Save a `Stream` to a file, refusing to write more than `limit` bytes.
async fn stream_to_file<S, E>(path: &Path, stream: S, limit: u64) -> Result<u64, RelayError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    futures::pin_mut!(stream);
    let mut file = BufWriter::new(File::create(path).await.map_err(RelayError::Staging)?);
    let mut written: u64 = 0;

    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|e| body_error(e.into(), limit))?
    {
        written += chunk.len() as u64;
        if written > limit {
            return Err(RelayError::PayloadTooLarge { limit });
        }
        file.write_all(&chunk).await.map_err(RelayError::Staging)?;
    }

    file.flush().await.map_err(RelayError::Staging)?;
    Ok(written)
}

/// Map a body read failure, keeping the transport's own status where it has one.
fn body_error(err: BoxError, limit: u64) -> RelayError {
    match err.downcast_ref::<MultipartError>() {
        Some(multipart) if multipart.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            RelayError::PayloadTooLarge { limit }
        }
        Some(multipart) => RelayError::Transport {
            status: multipart.status().as_u16(),
            message: multipart.body_text(),
        },
        None => RelayError::Transport {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message: err.to_string(),
        },
    }
}
