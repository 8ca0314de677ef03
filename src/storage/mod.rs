//! File storage for uploaded attachments and generated documents.
//!
//! Paths handed to a [`FileStorage`] are relative, `/`-separated keys
//! such as `beo/2025/03/CNF00001.html`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Writes `bytes` at `path`, replacing any existing file, and returns the stored path
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Public URL for a stored path
    fn url(&self, path: &str) -> String;

    /// Removes the file. Returns `false` when there was nothing to remove.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
}

/// Local-disk storage rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        if path.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_string(),
        source,
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }
        fs::write(&full, bytes).await.map_err(|e| io_error(path, e))?;
        debug!(path = %path, size = bytes.len(), "Stored file");
        Ok(path.to_string())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        match fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(io_error(path, e)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/storage/{}", self.public_base_url, path.trim_start_matches('/'))
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full).await {
            Ok(()) => {
                debug!(path = %path, "Deleted file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to delete file");
                Err(io_error(path, e))
            }
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full = self.resolve(path)?;
        fs::try_exists(&full).await.map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn storage() -> (tempfile::TempDir, LocalFileStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path(), "http://files.local/");
        (dir, storage)
    }

    #[tokio::test]
    async fn store_read_and_delete() {
        let (_dir, storage) = storage();

        let stored = storage.store("beo/2025/03/a.html", b"<html/>").await.unwrap();
        assert_eq!(stored, "beo/2025/03/a.html");
        assert!(storage.exists(&stored).await.unwrap());
        assert_eq!(storage.read(&stored).await.unwrap(), b"<html/>");

        assert!(storage.delete(&stored).await.unwrap());
        assert!(!storage.exists(&stored).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_missing_file_is_a_no_op() {
        let (_dir, storage) = storage();
        assert!(!storage.delete("nothing/here.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn reading_a_missing_file_is_not_found() {
        let (_dir, storage) = storage();
        assert_matches!(
            storage.read("missing.png").await,
            Err(StorageError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn paths_cannot_escape_the_root() {
        let (_dir, storage) = storage();
        assert_matches!(
            storage.store("../escape.txt", b"x").await,
            Err(StorageError::InvalidPath(_))
        );
        assert_matches!(
            storage.exists("/etc/passwd").await,
            Err(StorageError::InvalidPath(_))
        );
    }

    #[test]
    fn url_joins_base_and_path() {
        let (_dir, storage) = storage();
        assert_eq!(
            storage.url("beo/x.html"),
            "http://files.local/storage/beo/x.html"
        );
    }
}
