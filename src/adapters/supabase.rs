//! Supabase Storage as an [`ObjectStore`].

use crate::ports::storage::{validate_key, ObjectStore, StorageError};
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::OnceCell;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Publishes objects into a public Supabase bucket, creating it on first use.
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
    bucket_ready: OnceCell<()>,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: &str, bucket: &str) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
            bucket_ready: OnceCell::new(),
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }

    /// Create the bucket as public. "Already exists" and any other failure
    /// are ignored here; a real problem surfaces on the upload itself.
    async fn ensure_bucket(&self) {
        self.bucket_ready
            .get_or_init(|| async {
                let result = self
                    .http
                    .post(format!("{}/storage/v1/bucket", self.base_url))
                    .bearer_auth(&self.service_key)
                    .header("apikey", &self.service_key)
                    .json(&serde_json::json!({
                        "id": self.bucket,
                        "name": self.bucket,
                        "public": true,
                    }))
                    .send()
                    .await;
                match result {
                    Ok(resp) => debug!(bucket = %self.bucket, status = %resp.status(), "bucket create"),
                    Err(e) => debug!(bucket = %self.bucket, error = %e, "bucket create failed"),
                }
            })
            .await;
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn put(
        &self,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        self.ensure_bucket().await;

        let file = tokio::fs::File::open(local_path).await?;

        let response = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, self.bucket, key
            ))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(self.public_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_put_creates_bucket_once_and_uploads() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/bucket"))
            .respond_with(ResponseTemplate::new(400).set_body_string("already exists"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/processed-videos/stretched-1.mp4"))
            .and(header("x-upsert", "true"))
            .and(header("content-type", "video/mp4"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Key": "processed-videos/stretched-1.mp4"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = dir.path().join("render.mp4");
        std::fs::write(&file, b"rendered").unwrap();

        let store = SupabaseStore::new(&server.uri(), "service-key", "processed-videos").unwrap();
        let first = store.put("stretched-1.mp4", &file, "video/mp4").await.unwrap();
        let second = store.put("stretched-1.mp4", &file, "video/mp4").await.unwrap();

        assert_eq!(
            first,
            format!(
                "{}/storage/v1/object/public/processed-videos/stretched-1.mp4",
                server.uri()
            )
        );
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rejected_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/bucket"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/processed-videos/stretched-2.mp4"))
            .respond_with(ResponseTemplate::new(413).set_body_string("Payload too large"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = dir.path().join("render.mp4");
        std::fs::write(&file, b"rendered").unwrap();

        let store = SupabaseStore::new(&server.uri(), "service-key", "processed-videos").unwrap();
        let err = store
            .put("stretched-2.mp4", &file, "video/mp4")
            .await
            .unwrap_err();

        match err {
            StorageError::Rejected { status, message } => {
                assert_eq!(status, 413);
                assert_eq!(message, "Payload too large");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_traversal_key_rejected_before_network() {
        let store = SupabaseStore::new("http://127.0.0.1:9", "k", "b").unwrap();
        let err = store
            .put("../x.mp4", Path::new("/tmp/none"), "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
