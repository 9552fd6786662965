//! Stretch request parameters and their validation.

use super::transient::TransientFile;
use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_FACTOR: f64 = 0.1;
pub const MAX_FACTOR: f64 = 5.0;

const DEFAULT_AXIS_START: AxisPoint = AxisPoint { x: 0.0, y: 0.0 };
const DEFAULT_AXIS_END: AxisPoint = AxisPoint { x: 0.0, y: 1.0 };

/// Proportional resize applied along the stretch axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchFactor(f64);

impl StretchFactor {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (MIN_FACTOR..=MAX_FACTOR).contains(&value)).then_some(Self(value))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<f64>().ok().and_then(Self::new)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Height as a whole percentage of the source, e.g. 1.234 -> 123.
    pub fn height_percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl Default for StretchFactor {
    fn default() -> Self {
        Self(1.0)
    }
}

/// A point in normalized frame coordinates.
///
/// Axis points are validated and carried through the pipeline but no
/// provider consumes them yet: the only supported warp is a vertical scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisPoint {
    pub x: f64,
    pub y: f64,
}

impl AxisPoint {
    fn is_normalized(&self) -> bool {
        [self.x, self.y]
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

/// Output container requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Mp4,
    Mov,
    Webm,
}

impl ExportFormat {
    pub const SUPPORTED: &'static str = "mp4, mov, webm";

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Mov => "mov",
            ExportFormat::Webm => "webm",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "video/mp4",
            ExportFormat::Mov => "video/quicktime",
            ExportFormat::Webm => "video/webm",
        }
    }

    /// Audio codec for ffmpeg's `-c:a`. WebM only carries Vorbis or Opus,
    /// so its audio is re-encoded; the other containers take the source as is.
    pub fn audio_codec(self) -> &'static str {
        match self {
            ExportFormat::Mp4 | ExportFormat::Mov => "copy",
            ExportFormat::Webm => "libopus",
        }
    }

    /// Muxer name understood by ffmpeg's `-f`.
    pub fn muxer(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Mov => "mov",
            ExportFormat::Webm => "webm",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(ExportFormat::Mp4),
            "mov" => Ok(ExportFormat::Mov),
            "webm" => Ok(ExportFormat::Webm),
            _ => Err(RelayError::unsupported_format(Self::SUPPORTED)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The video attachment as the transport staged it.
#[derive(Debug)]
pub struct StagedUpload {
    pub file: TransientFile,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
}

/// Form fields exactly as received, before any interpretation.
#[derive(Debug, Default)]
pub struct RawUpload {
    pub video: Option<StagedUpload>,
    pub factor: Option<String>,
    pub axis_start: Option<String>,
    pub axis_end: Option<String>,
    pub export_format: Option<String>,
}

/// Everything about a validated request except the staged bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub factor: StretchFactor,
    pub axis_start: AxisPoint,
    pub axis_end: AxisPoint,
    pub export_format: ExportFormat,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
}

/// A request that passed validation. Fields cannot be changed afterwards.
#[derive(Debug)]
pub struct TransformRequest {
    source: TransientFile,
    params: TransformParams,
}

impl TransformRequest {
    pub fn source(&self) -> &TransientFile {
        &self.source
    }

    pub fn params(&self) -> &TransformParams {
        &self.params
    }

    pub fn into_parts(self) -> (TransientFile, TransformParams) {
        (self.source, self.params)
    }
}

/// Media types the relay accepts as video.
pub fn is_video_media_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("video/")
}

/// Check a raw upload and turn it into a [`TransformRequest`].
///
/// Checks run in a fixed order and stop at the first violation. On failure
/// the staged file, if any, is dropped with the upload and removed.
pub fn validate(raw: RawUpload) -> Result<TransformRequest, RelayError> {
    let RawUpload {
        video,
        factor,
        axis_start,
        axis_end,
        export_format,
    } = raw;

    let video = video.ok_or_else(RelayError::missing_video)?;
    if !is_video_media_type(&video.content_type) {
        return Err(RelayError::invalid_file_type());
    }

    let factor = match present(factor) {
        Some(raw) => StretchFactor::parse(&raw).ok_or_else(RelayError::invalid_factor)?,
        None => StretchFactor::default(),
    };

    let axis_start = parse_axis("axisStart", axis_start, DEFAULT_AXIS_START)?;
    let axis_end = parse_axis("axisEnd", axis_end, DEFAULT_AXIS_END)?;

    let export_format = match present(export_format) {
        Some(raw) => raw.parse()?,
        None => ExportFormat::default(),
    };

    Ok(TransformRequest {
        params: TransformParams {
            factor,
            axis_start,
            axis_end,
            export_format,
            original_name: video.original_name,
            content_type: video.content_type,
            size: video.size,
        },
        source: video.file,
    })
}

/// Empty form values count as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_axis(
    field: &str,
    raw: Option<String>,
    default: AxisPoint,
) -> Result<AxisPoint, RelayError> {
    let Some(raw) = present(raw) else {
        return Ok(default);
    };

    let point: AxisPoint = serde_json::from_str(&raw).map_err(|_| {
        RelayError::invalid_axis(format!(
            "{} must be a JSON object like {{\"x\":0,\"y\":0}}",
            field
        ))
    })?;

    if !point.is_normalized() {
        return Err(RelayError::invalid_axis(format!(
            "{} coordinates must be between 0 and 1",
            field
        )));
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn staged(dir: &std::path::Path, content_type: &str) -> StagedUpload {
        let file = TransientFile::reserve(dir, "upload", "part");
        std::fs::write(file.path(), b"not really a video").unwrap();
        StagedUpload {
            file,
            original_name: "clip.mp4".to_string(),
            content_type: content_type.to_string(),
            size: 18,
        }
    }

    fn upload_with_factor(dir: &std::path::Path, factor: &str) -> RawUpload {
        RawUpload {
            video: Some(staged(dir, "video/mp4")),
            factor: Some(factor.to_string()),
            ..Default::default()
        }
    }

    fn error_tag(err: RelayError) -> &'static str {
        match err {
            RelayError::InvalidInput { error, .. } => error,
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let dir = tempdir().unwrap();
        let raw = RawUpload {
            video: Some(staged(dir.path(), "video/mp4")),
            ..Default::default()
        };

        let request = validate(raw).unwrap();
        let params = request.params();

        assert_eq!(params.factor.value(), 1.0);
        assert_eq!(params.axis_start, AxisPoint { x: 0.0, y: 0.0 });
        assert_eq!(params.axis_end, AxisPoint { x: 0.0, y: 1.0 });
        assert_eq!(params.export_format, ExportFormat::Mp4);
        assert_eq!(params.original_name, "clip.mp4");
        assert!(request.source().path().exists());
    }

    #[test]
    fn test_factor_bounds_are_inclusive() {
        let dir = tempdir().unwrap();
        for factor in ["0.1", "1", "1.5", "5.0", " 2.25 "] {
            let request = validate(upload_with_factor(dir.path(), factor));
            assert!(request.is_ok(), "factor {:?} should be accepted", factor);
        }
    }

    #[test]
    fn test_factor_out_of_range_rejected() {
        let dir = tempdir().unwrap();
        for factor in ["0.05", "5.1", "10", "-1", "0", "NaN", "inf", "abc"] {
            let err = validate(upload_with_factor(dir.path(), factor)).unwrap_err();
            match err {
                RelayError::InvalidInput { error, message } => {
                    assert_eq!(error, "Invalid factor");
                    assert_eq!(message, "Factor must be between 0.1 and 5.0");
                }
                other => panic!("unexpected error for {:?}: {:?}", factor, other),
            }
        }
    }

    #[test]
    fn test_rejected_request_removes_staged_file() {
        let dir = tempdir().unwrap();
        let err = validate(upload_with_factor(dir.path(), "9")).unwrap_err();

        assert_eq!(error_tag(err), "Invalid factor");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_video_checked_first() {
        let raw = RawUpload {
            factor: Some("42".to_string()),
            ..Default::default()
        };
        assert_eq!(error_tag(validate(raw).unwrap_err()), "Missing video file");
    }

    #[test]
    fn test_non_video_media_type_rejected() {
        let dir = tempdir().unwrap();
        let raw = RawUpload {
            video: Some(staged(dir.path(), "image/png")),
            ..Default::default()
        };
        assert_eq!(error_tag(validate(raw).unwrap_err()), "Invalid file type");
    }

    #[test]
    fn test_axis_points_parsed() {
        let dir = tempdir().unwrap();
        let raw = RawUpload {
            video: Some(staged(dir.path(), "video/mp4")),
            axis_start: Some(r#"{"x":0.25,"y":0.5}"#.to_string()),
            axis_end: Some(r#"{"x":1,"y":0}"#.to_string()),
            ..Default::default()
        };

        let request = validate(raw).unwrap();
        assert_eq!(request.params().axis_start, AxisPoint { x: 0.25, y: 0.5 });
        assert_eq!(request.params().axis_end, AxisPoint { x: 1.0, y: 0.0 });
    }

    #[test]
    fn test_malformed_axis_rejected() {
        let dir = tempdir().unwrap();
        for axis in [r#"{"x":0"#, r#"{"x":"a","y":0}"#, "null", r#"{"x":1.5,"y":0}"#] {
            let raw = RawUpload {
                video: Some(staged(dir.path(), "video/mp4")),
                axis_end: Some(axis.to_string()),
                ..Default::default()
            };
            assert_eq!(error_tag(validate(raw).unwrap_err()), "Invalid axis");
        }
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("MP4".parse::<ExportFormat>().unwrap(), ExportFormat::Mp4);
        assert_eq!("webm".parse::<ExportFormat>().unwrap(), ExportFormat::Webm);
        assert!("avi".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_empty_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let raw = RawUpload {
            video: Some(staged(dir.path(), "video/quicktime")),
            factor: Some(String::new()),
            export_format: Some("  ".to_string()),
            ..Default::default()
        };
        let request = validate(raw).unwrap();
        assert_eq!(request.params().factor, StretchFactor::default());
        assert_eq!(request.params().export_format, ExportFormat::Mp4);
    }

    #[test]
    fn test_height_percent_rounds() {
        assert_eq!(StretchFactor::new(1.2).unwrap().height_percent(), 120);
        assert_eq!(StretchFactor::new(0.125).unwrap().height_percent(), 13);
        assert_eq!(StretchFactor::new(5.0).unwrap().height_percent(), 500);
    }
}
