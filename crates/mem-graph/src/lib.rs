//! Knowledge graph manager over a newline-delimited JSON store.

mod manager;
mod record;

pub use manager::{KnowledgeGraphManager, DEFAULT_CACHE_TTL};
pub use mem_types::{
    Entity, FileStore, FileStoreError, GraphError, KnowledgeGraph, ObservationDeletion,
    ObservationResult, ObservationUpdate, Relation,
};
pub use record::{decode_graph, encode_graph, StoredRecord};
