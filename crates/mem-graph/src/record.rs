//! Newline-delimited record codec for the persisted graph.
//!
//! One JSON object per line, tagged by `"type"`: entity records first, then relations.

use mem_types::{Entity, KnowledgeGraph, Relation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One line of the store, as read back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoredRecord {
    Entity(Entity),
    Relation(Relation),
}

/// Borrowed form used when writing, so saving does not clone the graph.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RecordRef<'a> {
    Entity(&'a Entity),
    Relation(&'a Relation),
}

/// Serialize `graph` as one record per line; no trailing newline.
pub fn encode_graph(graph: &KnowledgeGraph) -> Result<String, serde_json::Error> {
    let records = graph
        .entities
        .iter()
        .map(RecordRef::Entity)
        .chain(graph.relations.iter().map(RecordRef::Relation));
    let mut lines = Vec::with_capacity(graph.entities.len() + graph.relations.len());
    for record in records {
        lines.push(serde_json::to_string(&record)?);
    }
    Ok(lines.join("\n"))
}

/// Parse store text into a graph. Blank lines are ignored; malformed lines and records that
/// repeat an existing name or triple are skipped with a warning.
pub fn decode_graph(text: &str) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    let mut names: HashSet<String> = HashSet::new();
    let mut triples: HashSet<Relation> = HashSet::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredRecord>(line) {
            Ok(StoredRecord::Entity(entity)) => {
                if names.insert(entity.name.clone()) {
                    graph.entities.push(entity);
                } else {
                    tracing::warn!(line = idx + 1, name = %entity.name, "skipping duplicate entity record");
                }
            }
            Ok(StoredRecord::Relation(relation)) => {
                if triples.insert(relation.clone()) {
                    graph.relations.push(relation);
                } else {
                    tracing::warn!(
                        line = idx + 1,
                        from = %relation.from,
                        to = %relation.to,
                        relation_type = %relation.relation_type,
                        "skipping duplicate relation record"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "skipping malformed store line");
            }
        }
    }
    graph
}
