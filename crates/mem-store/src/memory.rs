//! In-memory file store: path -> text map, with read accounting.

use mem_types::{FileStore, FileStoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory FileStore. Cloning shares the underlying files.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileStore {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
    reads: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without going through `write_all`.
    pub async fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.write().await.insert(path.into(), content.into());
    }

    /// Current content of `path`, if any.
    pub async fn get(&self, path: &Path) -> Option<String> {
        self.files.read().await.get(path).cloned()
    }

    /// Number of `read_all` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make subsequent reads fail with an I/O error.
    #[cfg(feature = "test-util")]
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail without touching stored content.
    #[cfg(feature = "test-util")]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

fn injected(kind: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("injected {kind} failure"))
}

#[async_trait::async_trait]
impl FileStore for InMemoryFileStore {
    async fn ensure_directory_exists(&self, _path: &Path) -> Result<(), FileStoreError> {
        Ok(())
    }

    async fn read_all(&self, path: &Path) -> Result<String, FileStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(FileStoreError::Read {
                path: path.to_path_buf(),
                source: injected("read"),
            });
        }
        Ok(self.get(path).await.unwrap_or_default())
    }

    async fn write_all(&self, path: &Path, content: &str) -> Result<(), FileStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FileStoreError::Write {
                path: path.to_path_buf(),
                source: injected("write"),
            });
        }
        self.files
            .write()
            .await
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}
