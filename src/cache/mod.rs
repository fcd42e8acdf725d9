//! Event-maintained graph cache
//!
//! One live [`ConcurrentGraph`] per (network, locale), built lazily from the
//! repository and patched in place as domain events arrive. Queries read
//! snapshots; writers patch single entries. Nothing here holds a lock across
//! a whole snapshot or a whole patch.

pub mod memory;

pub use memory::{InMemoryRepository, NetworkData};

use crate::duplicates::{find_duplicates, DuplicateSet, DuplicateSettings};
use crate::graph::{
    ConcurrentGraph, EdgeKey, EdgeRecord, GraphBuilder, GraphEvent, GraphSchema, NetworkId, PropertyGraph, VertexId,
    VertexRecord,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};

/// Errors reported by the persistence collaborator
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Network not found: {0}")]
    NetworkNotFound(NetworkId),

    #[error("Vertex not found: {0}")]
    VertexNotFound(VertexId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Source of persisted vertices, edges and schemas
#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn schema(&self, network: NetworkId, locale: &str) -> RepositoryResult<GraphSchema>;
    async fn vertices(&self, network: NetworkId) -> RepositoryResult<Vec<VertexRecord>>;
    async fn vertex(&self, network: NetworkId, id: VertexId) -> RepositoryResult<Option<VertexRecord>>;
    async fn edges(&self, network: NetworkId) -> RepositoryResult<Vec<EdgeRecord>>;
    async fn edges_between(
        &self,
        network: NetworkId,
        source: VertexId,
        target: VertexId,
        uri: &str,
    ) -> RepositoryResult<Vec<EdgeRecord>>;
    async fn network_of_vertex(&self, id: VertexId) -> RepositoryResult<Option<NetworkId>>;
}

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Unknown network: {0}")]
    UnknownNetwork(NetworkId),
}

impl From<RepositoryError> for CacheError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NetworkNotFound(network) => CacheError::UnknownNetwork(network),
            other => CacheError::Repository(other),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// A live graph together with the schema it was reconciled against
#[derive(Debug)]
pub struct CachedGraph {
    pub schema: GraphSchema,
    pub graph: ConcurrentGraph,
}

impl Deref for CachedGraph {
    type Target = ConcurrentGraph;

    fn deref(&self) -> &ConcurrentGraph {
        &self.graph
    }
}

type CacheKey = (NetworkId, String);

pub struct GraphCache {
    repository: Arc<dyn GraphRepository>,
    graphs: DashMap<CacheKey, Arc<OnceCell<Arc<CachedGraph>>>>,
}

impl GraphCache {
    pub fn new(repository: Arc<dyn GraphRepository>) -> Self {
        Self {
            repository,
            graphs: DashMap::new(),
        }
    }

    /// The cached graph for (network, locale), building it on first use.
    ///
    /// Concurrent callers for the same key share a single build.
    pub async fn get_or_build(&self, network: NetworkId, locale: &str) -> CacheResult<Arc<CachedGraph>> {
        let cell = self.graphs.entry((network, locale.to_string())).or_default().clone();
        let cached = cell.get_or_try_init(|| self.build(network, locale)).await?;
        Ok(Arc::clone(cached))
    }

    /// The cached graph, if it has been built
    pub fn get(&self, network: NetworkId, locale: &str) -> Option<Arc<CachedGraph>> {
        self.graphs
            .get(&(network, locale.to_string()))
            .and_then(|cell| cell.get().cloned())
    }

    /// An indexed copy of the live graph, building it if needed
    pub async fn snapshot(&self, network: NetworkId, locale: &str) -> CacheResult<PropertyGraph> {
        Ok(self.get_or_build(network, locale).await?.snapshot())
    }

    /// Duplicate vertex sets of the current graph, strongest first
    pub async fn duplicates(
        &self,
        network: NetworkId,
        locale: &str,
        settings: &DuplicateSettings,
    ) -> CacheResult<Vec<DuplicateSet>> {
        let snapshot = self.snapshot(network, locale).await?;
        Ok(find_duplicates(&snapshot, settings))
    }

    /// Number of (network, locale) graphs currently held
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Forget every locale of a network; the next query rebuilds it
    pub fn clear_network(&self, network: NetworkId) {
        self.graphs.retain(|(cached, _), _| *cached != network);
        info!("Cleared graph cache for network {}", network);
    }

    async fn build(&self, network: NetworkId, locale: &str) -> CacheResult<Arc<CachedGraph>> {
        info!("Building graph cache for network {} ({})", network, locale);
        let schema = self.repository.schema(network, locale).await?;
        let vertices = self.repository.vertices(network).await?;
        let edges = self.repository.edges(network).await?;

        let graph = ConcurrentGraph::new();
        let builder = GraphBuilder::new(&schema);
        for (id, props) in builder.build_vertices(&vertices) {
            graph.upsert_vertex(id, props);
        }
        for (key, props) in builder.build_edges(&edges) {
            graph.upsert_edge(key, props);
        }
        debug!(
            "Built network {} ({}): {} vertices, {} edges",
            network,
            locale,
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok(Arc::new(CachedGraph { schema, graph }))
    }

    /// Built graphs matching `network`, or every built graph
    fn built(&self, network: Option<NetworkId>) -> Vec<Arc<CachedGraph>> {
        self.graphs
            .iter()
            .filter(|entry| network.map_or(true, |n| entry.key().0 == n))
            .filter_map(|entry| entry.value().get().cloned())
            .collect()
    }

    /// Patch cached graphs for one event.
    ///
    /// Events touching networks that are not cached are ignored.
    pub async fn apply(&self, event: &GraphEvent) -> CacheResult<()> {
        debug!("Applying {}", event);
        match event {
            GraphEvent::VertexSaved { vertex_id } => self.vertex_saved(*vertex_id).await,
            GraphEvent::VertexDeleted { vertex_id } => {
                for cached in self.built(None) {
                    if cached.contains_vertex(*vertex_id) {
                        let removed = cached.remove_vertex(*vertex_id);
                        debug!("Removed vertex {} and {} incident edges", vertex_id, removed);
                    }
                }
                Ok(())
            }
            GraphEvent::EdgeSaved {
                source,
                target,
                schema_uri,
            } => self.edge_saved(*source, *target, schema_uri).await,
            GraphEvent::EdgeDeleted {
                source,
                target,
                schema_uris,
            } => {
                for cached in self.built(None) {
                    for uri in schema_uris {
                        if let Some(name) = cached.schema.relationship_name(uri) {
                            cached.remove_edge(&EdgeKey::new(*source, *target, name));
                        }
                    }
                }
                Ok(())
            }
            GraphEvent::NetworkCacheCleared { network_id } => {
                self.clear_network(*network_id);
                Ok(())
            }
        }
    }

    async fn vertex_saved(&self, id: VertexId) -> CacheResult<()> {
        let Some(network) = self.repository.network_of_vertex(id).await? else {
            debug!("Vertex {} belongs to no known network", id);
            return Ok(());
        };
        let cached = self.built(Some(network));
        if cached.is_empty() {
            return Ok(());
        }

        let record = self.repository.vertex(network, id).await?;
        for graph in cached {
            match &record {
                Some(record) => {
                    let built = GraphBuilder::new(&graph.schema).build_vertices(std::slice::from_ref(record));
                    for (id, props) in built {
                        graph.upsert_vertex(id, props);
                    }
                }
                None => {
                    graph.remove_vertex(id);
                }
            }
        }
        Ok(())
    }

    async fn edge_saved(&self, source: VertexId, target: VertexId, uri: &str) -> CacheResult<()> {
        let Some(network) = self.repository.network_of_vertex(source).await? else {
            debug!("Edge source {} belongs to no known network", source);
            return Ok(());
        };
        let cached = self.built(Some(network));
        if cached.is_empty() {
            return Ok(());
        }

        let records = self.repository.edges_between(network, source, target, uri).await?;
        for graph in cached {
            let Some(name) = graph.schema.relationship_name(uri) else {
                continue;
            };
            let key = EdgeKey::new(source, target, name);
            let built = GraphBuilder::new(&graph.schema).build_edges(&records);
            match built.into_iter().find(|(built_key, _)| *built_key == key) {
                Some((key, props)) => graph.upsert_edge(key, props),
                None => {
                    graph.remove_edge(&key);
                }
            }
        }
        Ok(())
    }

    /// Apply events from a channel until every sender is dropped
    pub async fn run(&self, mut events: mpsc::Receiver<GraphEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.apply(&event).await {
                warn!("Failed to apply {}: {}", event, e);
            }
        }
        debug!("Graph event feed closed");
    }
}
