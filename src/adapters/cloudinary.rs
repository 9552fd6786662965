//! Cloudinary upload API as a [`TransformProvider`].

use crate::config::CloudinaryConfig;
use crate::domain::request::{ExportFormat, StretchFactor};
use crate::ports::provider::{ProviderError, TransformJob, TransformProvider};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Uploads the staged video with an incoming scale transformation and
/// returns the `secure_url` of the stored asset.
pub struct CloudinaryProvider {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryProvider {
    pub fn new(config: CloudinaryConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Transport(format!("HTTP client error: {}", e)))?;
        Ok(Self { config, http })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/video/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Relative height scale, quality optimisation and container coercion.
    ///
    /// Heights carry a decimal point so Cloudinary reads them as a ratio of
    /// the source rather than a pixel count.
    pub fn transformation(factor: StretchFactor, format: ExportFormat) -> String {
        format!(
            "h_{:.2},c_scale,q_auto:good,f_{}",
            factor.height_percent() as f64 / 100.0,
            format.extension()
        )
    }

    /// SHA-256 request signature over the sorted parameters.
    pub fn sign(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        hex::encode(Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
    }

    fn signed_params(&self, job: &TransformJob, timestamp: i64) -> BTreeMap<&'static str, String> {
        let public_id = Path::new(&job.output_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&job.output_name)
            .to_string();

        let mut params = BTreeMap::new();
        params.insert("folder", self.config.folder.clone());
        params.insert("overwrite", "true".to_string());
        params.insert("public_id", public_id);
        params.insert("timestamp", timestamp.to_string());
        params.insert(
            "transformation",
            Self::transformation(job.factor, job.format),
        );
        params
    }

    async fn file_part(job: &TransformJob) -> Result<Part, ProviderError> {
        let file = tokio::fs::File::open(&job.source).await?;
        let length = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        Part::stream_with_length(body, length)
            .file_name(job.output_name.clone())
            .mime_str(&job.source_content_type)
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

#[async_trait]
impl TransformProvider for CloudinaryProvider {
    async fn transform(&self, job: &TransformJob) -> Result<String, ProviderError> {
        if !self.config.is_configured() {
            return Err(ProviderError::Unauthorized(
                "Cloudinary credentials are not configured".to_string(),
            ));
        }

        let params = self.signed_params(job, chrono::Utc::now().timestamp());
        let signature = Self::sign(&params, &self.config.api_secret);

        let form = params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part("file", Self::file_part(job).await?);

        debug!(url = %self.upload_url(), name = %job.output_name, "uploading to cloudinary");

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: UploadResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::Transport(format!("invalid upload response: {}", e)))?;
            return Ok(body.secure_url);
        }

        let message = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::Unauthorized(message)
            }
            _ => ProviderError::Rejected {
                status: Some(status.as_u16()),
                message,
            },
        })
    }
}
