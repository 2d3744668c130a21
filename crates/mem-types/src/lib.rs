//! Core types and traits for the knowledge graph memory.
//!
//! Field names serialize in camelCase (`entityType`, `relationType`, `entityName`) so the
//! persisted store and the tool surface share one JSON shape.

mod dto;
mod traits;

pub use dto::*;
pub use traits::*;
