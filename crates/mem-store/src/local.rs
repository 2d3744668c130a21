//! Local filesystem store: atomic whole-file writes via temp file + rename.

use mem_types::{FileStore, FileStoreError};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// FileStore over the local filesystem (tokio::fs).
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }

    /// Sibling temp path, so the final rename stays on one filesystem.
    fn temp_path(path: &Path) -> Result<PathBuf, FileStoreError> {
        let file_name = path.file_name().ok_or_else(|| {
            FileStoreError::Other(format!("not a file path: {}", path.display()))
        })?;
        let tmp_name = format!(
            ".{}.{}.tmp",
            file_name.to_string_lossy(),
            Uuid::new_v4().simple()
        );
        Ok(path.with_file_name(tmp_name))
    }

    /// Write and fsync, so the rename never publishes a partially flushed file.
    async fn write_synced(path: &Path, content: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await
    }
}

#[async_trait::async_trait]
impl FileStore for LocalFileStore {
    async fn ensure_directory_exists(&self, path: &Path) -> Result<(), FileStoreError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|source| FileStoreError::CreateDir {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn read_all(&self, path: &Path) -> Result<String, FileStoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(FileStoreError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn write_all(&self, path: &Path, content: &str) -> Result<(), FileStoreError> {
        let tmp = Self::temp_path(path)?;
        let write_err = |source: std::io::Error| FileStoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Err(e) = Self::write_synced(&tmp, content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            tracing::warn!(tmp = %tmp.display(), error = %e, "rename of temp store file failed");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        Ok(())
    }
}
