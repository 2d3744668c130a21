//! File store abstraction and the error taxonomy of the graph manager.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Whole-file text storage backing one knowledge graph.
///
/// Contract: `read_all` returns an empty string when the target does not exist; any other
/// failure propagates. `write_all` replaces the full content and, on failure, must leave the
/// previous content readable.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Create `path` and all missing parents.
    async fn ensure_directory_exists(&self, path: &Path) -> Result<(), FileStoreError>;

    /// Read the whole file as UTF-8 text.
    async fn read_all(&self, path: &Path) -> Result<String, FileStoreError>;

    /// Overwrite the whole file with `content`.
    async fn write_all(&self, path: &Path, content: &str) -> Result<(), FileStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file store error: {0}")]
    Other(String),
}

/// Errors surfaced by knowledge graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Malformed input; raised before any I/O.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("Entity {0} not found")]
    EntityNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] FileStoreError),

    #[error("failed to encode graph: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GraphError {
    /// Stable code used by the tool surface.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::Validation(_) => "VALIDATION_ERROR",
            GraphError::EntityNotFound(_) => "ENTITY_NOT_FOUND",
            GraphError::Store(_) | GraphError::Encode(_) => "STORE_ERROR",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        GraphError::Validation(msg.into())
    }
}
