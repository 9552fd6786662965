use crate::ports::storage::{validate_key, ObjectStore, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Object store backed by a local directory, optionally served over HTTP.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        key: &str,
        local_path: &Path,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;

        let dest = self.root.join(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local_path, &dest).await?;

        Ok(match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("file://{}", dest.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_copies_and_returns_public_url() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let src = src_dir.path().join("render.mp4");
        std::fs::write(&src, b"frames").unwrap();

        let store = FsObjectStore::new(
            out_dir.path(),
            Some("http://localhost:3000/media/".to_string()),
        );
        let url = store
            .put("stretched-1.mp4", &src, "video/mp4")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:3000/media/stretched-1.mp4");
        assert_eq!(
            std::fs::read(out_dir.path().join("stretched-1.mp4")).unwrap(),
            b"frames"
        );
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_put_without_base_url_returns_file_url() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let src = src_dir.path().join("render.mp4");
        std::fs::write(&src, b"frames").unwrap();

        let store = FsObjectStore::new(out_dir.path().join("nested"), None);
        let url = store.put("a/b.mp4", &src, "video/mp4").await.unwrap();

        assert!(url.starts_with("file://"));
        assert!(url.ends_with("nested/a/b.mp4"));
    }

    #[tokio::test]
    async fn test_put_rejects_traversal() {
        let out_dir = tempdir().unwrap();
        let store = FsObjectStore::new(out_dir.path(), None);
        let err = store
            .put("../escape.mp4", Path::new("/dev/null"), "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_put_missing_source_is_io_error() {
        let out_dir = tempdir().unwrap();
        let store = FsObjectStore::new(out_dir.path(), None);
        let err = store
            .put("x.mp4", &out_dir.path().join("missing.mp4"), "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
