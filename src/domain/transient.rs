//! Scoped ownership of files that only live for one request.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// A uniquely named file on local ephemeral storage.
///
/// The file is removed exactly once: either by [`TransientFile::release`]
/// on a normal exit, or by `Drop` when the owner unwinds or is cancelled
/// mid-request. A missing file on removal is not an error, since the
/// transport may have been interrupted before writing anything.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    armed: bool,
}

impl TransientFile {
    /// Reserve `<dir>/<prefix>-<uuid>.<extension>`. Nothing is created on disk.
    pub fn reserve(dir: &Path, prefix: &str, extension: &str) -> Self {
        let path = dir.join(format!("{}-{}.{}", prefix, Uuid::new_v4(), extension));
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file. Failures are logged and swallowed.
    pub async fn release(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "transient file released"),
            Err(err) => log_cleanup_error(&self.path, err),
        }
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "transient file removed on drop"),
            Err(err) => log_cleanup_error(&self.path, err),
        }
    }
}

fn log_cleanup_error(path: &Path, err: io::Error) {
    if err.kind() == io::ErrorKind::NotFound {
        debug!(path = %path.display(), "transient file was never written");
    } else {
        warn!(path = %path.display(), error = %err, "failed to clean up transient file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reserve_does_not_touch_disk() {
        let dir = tempdir().unwrap();
        let file = TransientFile::reserve(dir.path(), "upload", "part");

        assert!(!file.path().exists());
        assert!(file.path().starts_with(dir.path()));
        let name = file.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("upload-"));
        assert!(name.ends_with(".part"));
    }

    #[test]
    fn test_reserved_names_are_unique() {
        let dir = tempdir().unwrap();
        let a = TransientFile::reserve(dir.path(), "upload", "part");
        let b = TransientFile::reserve(dir.path(), "upload", "part");
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_release_removes_file() {
        let dir = tempdir().unwrap();
        let file = TransientFile::reserve(dir.path(), "upload", "part");
        let path = file.path().to_path_buf();
        std::fs::write(&path, b"payload").unwrap();

        file.release().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_of_unwritten_file_is_quiet() {
        let dir = tempdir().unwrap();
        let file = TransientFile::reserve(dir.path(), "upload", "part");
        file.release().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempdir().unwrap();
        let path = {
            let file = TransientFile::reserve(dir.path(), "upload", "part");
            std::fs::write(file.path(), b"payload").unwrap();
            file.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_during_unwind_removes_file() {
        let dir = tempdir().unwrap();
        let file = TransientFile::reserve(dir.path(), "upload", "part");
        let path = file.path().to_path_buf();
        std::fs::write(&path, b"payload").unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _owned = file;
            panic!("handler fault");
        }));

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
