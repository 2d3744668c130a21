//! File store backends: local filesystem and in-memory.

mod local;
mod memory;

pub use local::LocalFileStore;
pub use mem_types::{FileStore, FileStoreError};
pub use memory::InMemoryFileStore;
