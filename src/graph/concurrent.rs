//! Live, concurrently patched graph
//!
//! Vertices and edges sit in two independent concurrent maps. Every read or
//! write locks a single shard for the duration of one entry, so snapshots and
//! incremental patches interleave freely. There is no transaction spanning
//! both maps: an edge may briefly outlive one of its endpoints, and snapshots
//! skip such edges.

use super::model::{Edge, PropertyGraph, Vertex};
use super::property::PropertyMap;
use super::types::{EdgeKey, VertexId};
use dashmap::DashMap;
use rustc_hash::FxHashMap;

/// Thread-safe graph for one (network, locale) pair
#[derive(Debug, Default)]
pub struct ConcurrentGraph {
    vertices: DashMap<VertexId, PropertyMap>,
    edges: DashMap<EdgeKey, PropertyMap>,
}

impl ConcurrentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot-shaped graph into live maps
    pub fn from_graph(graph: &PropertyGraph) -> Self {
        let live = ConcurrentGraph::new();
        for vertex in graph.vertices() {
            live.upsert_vertex(vertex.id, vertex.props.clone());
        }
        let vertices = graph.vertices();
        for edge in graph.edges() {
            let key = EdgeKey::new(vertices[edge.source].id, vertices[edge.target].id, edge.name.clone());
            live.upsert_edge(key, edge.props.clone());
        }
        live
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert or overwrite a vertex; last write wins
    pub fn upsert_vertex(&self, id: VertexId, props: PropertyMap) {
        self.vertices.insert(id, props);
    }

    /// Insert or overwrite an edge; last write wins
    pub fn upsert_edge(&self, key: EdgeKey, props: PropertyMap) {
        self.edges.insert(key, props);
    }

    /// Remove a vertex together with every edge touching it.
    ///
    /// Returns the number of edges removed.
    pub fn remove_vertex(&self, id: VertexId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|key, _| !key.touches(id));
        let removed = before.saturating_sub(self.edges.len());
        self.vertices.remove(&id);
        removed
    }

    pub fn remove_edge(&self, key: &EdgeKey) -> Option<PropertyMap> {
        self.edges.remove(key).map(|(_, props)| props)
    }

    pub fn vertex(&self, id: VertexId) -> Option<PropertyMap> {
        self.vertices.get(&id).map(|entry| entry.value().clone())
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<PropertyMap> {
        self.edges.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    /// Copy the live maps into an ordered, indexed snapshot.
    ///
    /// Vertices are ordered by id and edges by (source position, target
    /// position, name). Edges whose endpoints are missing are skipped.
    pub fn snapshot(&self) -> PropertyGraph {
        let mut vertices: Vec<Vertex> = self
            .vertices
            .iter()
            .map(|entry| Vertex::with_props(*entry.key(), entry.value().clone()))
            .collect();
        vertices.sort_by_key(|vertex| vertex.id);

        let positions: FxHashMap<VertexId, usize> = vertices
            .iter()
            .enumerate()
            .map(|(idx, vertex)| (vertex.id, idx))
            .collect();

        let mut edges: Vec<Edge> = self
            .edges
            .iter()
            .filter_map(|entry| {
                let key = entry.key();
                let source = *positions.get(&key.source)?;
                let target = *positions.get(&key.target)?;
                Some(Edge::with_props(source, target, key.name.clone(), entry.value().clone()))
            })
            .collect();
        edges.sort_by(|a, b| (a.source, a.target, &a.name).cmp(&(b.source, b.target, &b.name)));

        let mut graph = PropertyGraph::new();
        graph.replace(vertices, edges);
        graph
    }
}
