//! Knowledge graph manager: file-backed graph with a time-bounded cache.
//!
//! Every operation loads the graph (from cache while fresh, otherwise by re-parsing the
//! store), validates the whole request before touching anything, applies it to a copy,
//! writes the full graph back, and only then swaps the copy into the cache.
//!
//! The cache is owned by one manager. Two managers (or processes) sharing a file are not
//! coordinated: the later save wins and the other's concurrent changes are lost.

use crate::record::{decode_graph, encode_graph};
use mem_types::{
    Entity, FileStore, GraphError, KnowledgeGraph, ObservationDeletion, ObservationResult,
    ObservationUpdate, Relation,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// How long a loaded or saved graph is served without re-reading the store.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedGraph {
    graph: Arc<KnowledgeGraph>,
    loaded_at: Instant,
}

/// Owns one graph file, its cache, and all CRUD/search logic over it.
pub struct KnowledgeGraphManager<S> {
    path: PathBuf,
    store: S,
    cache_ttl: Duration,
    /// Held across each load-mutate-save cycle, which serializes operations.
    cache: Mutex<Option<CachedGraph>>,
}

fn require_non_empty(value: &str, what: &str) -> Result<(), GraphError> {
    if value.is_empty() {
        return Err(GraphError::validation(format!("{what} must be a non-empty string")));
    }
    Ok(())
}

fn validate_entity(entity: &Entity) -> Result<(), GraphError> {
    require_non_empty(&entity.name, "entity name")?;
    require_non_empty(&entity.entity_type, "entityType")
}

fn validate_relation(relation: &Relation) -> Result<(), GraphError> {
    require_non_empty(&relation.from, "relation from")?;
    require_non_empty(&relation.to, "relation to")?;
    require_non_empty(&relation.relation_type, "relationType")
}

/// Drop repeated observations, keeping the first occurrence.
fn dedup_observations(observations: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    observations
        .into_iter()
        .filter(|o| seen.insert(o.clone()))
        .collect()
}

impl<S: FileStore> KnowledgeGraphManager<S> {
    pub fn new(path: impl Into<PathBuf>, store: S) -> Self {
        Self {
            path: path.into(),
            store,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Mutex::new(None),
        }
    }

    /// Override the freshness window. `Duration::ZERO` disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Forget the cached graph; the next access re-reads the store.
    pub async fn invalidate_cache(&self) {
        *self.cache.lock().await = None;
    }

    // =========================================================================
    // Load / save
    // =========================================================================

    /// Current graph: the cached one while fresh, otherwise re-parsed from the store.
    pub async fn load_graph(&self) -> Result<Arc<KnowledgeGraph>, GraphError> {
        let mut cache = self.cache.lock().await;
        self.load_locked(&mut cache).await
    }

    /// Overwrite the store with `graph` and make it the cached graph.
    pub async fn save_graph(&self, graph: KnowledgeGraph) -> Result<(), GraphError> {
        let mut cache = self.cache.lock().await;
        self.save_locked(&mut cache, graph).await
    }

    async fn load_locked(
        &self,
        cache: &mut Option<CachedGraph>,
    ) -> Result<Arc<KnowledgeGraph>, GraphError> {
        if let Some(cached) = cache.as_ref() {
            if cached.loaded_at.elapsed() < self.cache_ttl {
                return Ok(Arc::clone(&cached.graph));
            }
        }

        let text = self.store.read_all(&self.path).await?;
        let graph = Arc::new(decode_graph(&text));
        tracing::debug!(
            path = %self.path.display(),
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            "loaded knowledge graph"
        );
        *cache = Some(CachedGraph {
            graph: Arc::clone(&graph),
            loaded_at: Instant::now(),
        });
        Ok(graph)
    }

    async fn save_locked(
        &self,
        cache: &mut Option<CachedGraph>,
        graph: KnowledgeGraph,
    ) -> Result<(), GraphError> {
        let text = encode_graph(&graph)?;
        self.store.write_all(&self.path, &text).await?;
        tracing::debug!(
            path = %self.path.display(),
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            "saved knowledge graph"
        );
        *cache = Some(CachedGraph {
            graph: Arc::new(graph),
            loaded_at: Instant::now(),
        });
        Ok(())
    }

    /// Apply `apply` to a copy of the current graph and persist it. If `apply` fails, or the
    /// write fails, neither the store nor the cache changes.
    async fn mutate<T, F>(&self, apply: F) -> Result<T, GraphError>
    where
        F: FnOnce(&mut KnowledgeGraph) -> Result<T, GraphError>,
    {
        let mut cache = self.cache.lock().await;
        let current = self.load_locked(&mut cache).await?;
        let mut graph = KnowledgeGraph::clone(&current);
        let out = apply(&mut graph)?;
        self.save_locked(&mut cache, graph).await?;
        Ok(out)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append entities whose name is not taken yet; returns exactly those appended.
    pub async fn create_entities(&self, entities: Vec<Entity>) -> Result<Vec<Entity>, GraphError> {
        for entity in &entities {
            validate_entity(entity)?;
        }

        self.mutate(|graph| {
            let mut names: HashSet<String> =
                graph.entities.iter().map(|e| e.name.clone()).collect();
            let created: Vec<Entity> = entities
                .into_iter()
                .filter(|e| names.insert(e.name.clone()))
                .map(|mut e| {
                    e.observations = dedup_observations(e.observations);
                    e
                })
                .collect();
            graph.entities.extend(created.iter().cloned());
            Ok(created)
        })
        .await
    }

    /// Append relations not already stored. Both endpoints of every relation must exist;
    /// one miss rejects the whole batch.
    pub async fn create_relations(
        &self,
        relations: Vec<Relation>,
    ) -> Result<Vec<Relation>, GraphError> {
        for relation in &relations {
            validate_relation(relation)?;
        }

        self.mutate(|graph| {
            {
                let names = graph.entity_names();
                for relation in &relations {
                    if !names.contains(relation.from.as_str()) {
                        return Err(GraphError::EntityNotFound(relation.from.clone()));
                    }
                    if !names.contains(relation.to.as_str()) {
                        return Err(GraphError::EntityNotFound(relation.to.clone()));
                    }
                }
            }

            let mut triples: HashSet<Relation> = graph.relations.iter().cloned().collect();
            let created: Vec<Relation> = relations
                .into_iter()
                .filter(|r| triples.insert(r.clone()))
                .collect();
            graph.relations.extend(created.iter().cloned());
            Ok(created)
        })
        .await
    }

    /// Append non-blank, not-yet-present observations; reports what was added per update.
    pub async fn add_observations(
        &self,
        updates: Vec<ObservationUpdate>,
    ) -> Result<Vec<ObservationResult>, GraphError> {
        self.mutate(|graph| {
            let mut results = Vec::with_capacity(updates.len());
            for update in updates {
                let entity = graph
                    .entity_mut(&update.entity_name)
                    .ok_or_else(|| GraphError::EntityNotFound(update.entity_name.clone()))?;

                let mut added = Vec::new();
                for content in update.contents {
                    if content.trim().is_empty() || entity.observations.contains(&content) {
                        continue;
                    }
                    entity.observations.push(content.clone());
                    added.push(content);
                }
                results.push(ObservationResult {
                    entity_name: update.entity_name,
                    added_observations: added,
                });
            }
            Ok(results)
        })
        .await
    }

    /// Remove the named entities and every relation touching them. Every name must exist.
    pub async fn delete_entities(&self, names: &[String]) -> Result<(), GraphError> {
        self.mutate(|graph| {
            if let Some(missing) = names.iter().find(|n| !graph.contains_entity(n)) {
                return Err(GraphError::EntityNotFound(missing.clone()));
            }
            let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
            graph.entities.retain(|e| !doomed.contains(e.name.as_str()));
            graph.relations.retain(|r| !r.touches(&doomed));
            Ok(())
        })
        .await
    }

    /// Remove the listed observations from each named entity, keeping the rest in order.
    pub async fn delete_observations(
        &self,
        deletions: &[ObservationDeletion],
    ) -> Result<(), GraphError> {
        self.mutate(|graph| {
            for deletion in deletions {
                let entity = graph
                    .entity_mut(&deletion.entity_name)
                    .ok_or_else(|| GraphError::EntityNotFound(deletion.entity_name.clone()))?;
                entity
                    .observations
                    .retain(|o| !deletion.observations.contains(o));
            }
            Ok(())
        })
        .await
    }

    /// Remove stored relations matching any requested triple. Unknown triples are ignored.
    pub async fn delete_relations(&self, relations: &[Relation]) -> Result<(), GraphError> {
        for relation in relations {
            validate_relation(relation)?;
        }

        self.mutate(|graph| {
            let doomed: HashSet<&Relation> = relations.iter().collect();
            graph.relations.retain(|r| !doomed.contains(r));
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn read_graph(&self) -> Result<KnowledgeGraph, GraphError> {
        let graph = self.load_graph().await?;
        Ok(KnowledgeGraph::clone(&graph))
    }

    /// Case-insensitive substring match on name, type, or any observation; relations are
    /// those between matched entities.
    pub async fn search_nodes(&self, query: &str) -> Result<KnowledgeGraph, GraphError> {
        let graph = self.load_graph().await?;
        let needle = query.to_lowercase();
        let matched: Vec<Entity> = graph
            .entities
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.entity_type.to_lowercase().contains(&needle)
                    || e.observations
                        .iter()
                        .any(|o| o.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Ok(graph.closed_over(matched))
    }

    /// The named entities and the relations between them. Every name must exist.
    pub async fn open_nodes(&self, names: &[String]) -> Result<KnowledgeGraph, GraphError> {
        let graph = self.load_graph().await?;
        if let Some(missing) = names.iter().find(|n| !graph.contains_entity(n)) {
            return Err(GraphError::EntityNotFound(missing.clone()));
        }
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let matched: Vec<Entity> = graph
            .entities
            .iter()
            .filter(|e| wanted.contains(e.name.as_str()))
            .cloned()
            .collect();
        Ok(graph.closed_over(matched))
    }
}
