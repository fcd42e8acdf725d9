//! Query-time property graph snapshot
//!
//! Vertices live in a vector and edges point at them by position, so the
//! snapshot has no reference cycles. Every vertex keeps the positions of its
//! incident edges; the id and edge-key lookup indices are built on first use
//! and dropped whenever the lists are replaced.

use super::property::PropertyMap;
use super::types::{EdgeKey, VertexId};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

/// Side-channel key holding the vertex list a GROUP BY started from
pub const GROUPED_VERTICES_KEY: &str = "grouped_vertices";
/// Side-channel key holding LAYOUT settings
pub const LAYOUT_KEY: &str = "layout";

/// Graph model errors
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Edge {edge} references vertex position {position}, but the graph has {vertex_count} vertices")]
    EdgeOutOfRange {
        edge: usize,
        position: usize,
        vertex_count: usize,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// A vertex of the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub props: PropertyMap,
    /// Positions of incident edges, in edge-list order
    #[serde(skip)]
    edges: Vec<usize>,
}

impl Vertex {
    pub fn new(id: VertexId) -> Self {
        Self::with_props(id, PropertyMap::new())
    }

    pub fn with_props(id: VertexId, props: PropertyMap) -> Self {
        Vertex {
            id,
            props,
            edges: Vec::new(),
        }
    }

    /// Positions of the edges that start or end here. A self-loop appears once.
    pub fn incident_edges(&self) -> &[usize] {
        &self.edges
    }
}

/// A directed edge of the snapshot, referencing vertices by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub name: String,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub props: PropertyMap,
}

impl Edge {
    pub fn new(source: usize, target: usize, name: impl Into<String>) -> Self {
        Self::with_props(source, target, name, PropertyMap::new())
    }

    pub fn with_props(source: usize, target: usize, name: impl Into<String>, props: PropertyMap) -> Self {
        Edge {
            source,
            target,
            name: name.into(),
            props,
        }
    }
}

/// LAYOUT clause settings carried in the side-channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<bool>,
}

/// A side-channel entry passed from clause to clause
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataEntry {
    Vertices(Vec<Vertex>),
    Layout(LayoutSettings),
    Value(serde_json::Value),
}

#[derive(Deserialize)]
struct GraphParts {
    #[serde(default)]
    vertices: Vec<Vertex>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    data: IndexMap<String, DataEntry>,
}

impl TryFrom<GraphParts> for PropertyGraph {
    type Error = GraphError;

    fn try_from(parts: GraphParts) -> GraphResult<Self> {
        let mut graph = PropertyGraph::from_parts(parts.vertices, parts.edges)?;
        graph.data = parts.data;
        Ok(graph)
    }
}

/// Ordered, index-addressed graph that query clauses transform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphParts")]
pub struct PropertyGraph {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    vertices: Vec<Vertex>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    edges: Vec<Edge>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    data: IndexMap<String, DataEntry>,
    #[serde(skip)]
    vertex_index: OnceLock<FxHashMap<VertexId, usize>>,
    #[serde(skip)]
    edge_index: OnceLock<FxHashMap<EdgeKey, usize>>,
}

impl PropertyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph, checking that every edge points at an existing vertex
    pub fn from_parts(vertices: Vec<Vertex>, edges: Vec<Edge>) -> GraphResult<Self> {
        let vertex_count = vertices.len();
        for (idx, edge) in edges.iter().enumerate() {
            for position in [edge.source, edge.target] {
                if position >= vertex_count {
                    return Err(GraphError::EdgeOutOfRange {
                        edge: idx,
                        position,
                        vertex_count,
                    });
                }
            }
        }
        let mut graph = PropertyGraph::new();
        graph.replace(vertices, edges);
        Ok(graph)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Mutable access to vertex properties; the list itself cannot change shape
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// Mutable access to edge names and properties. Endpoints must not be touched.
    pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn data(&self) -> &IndexMap<String, DataEntry> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut IndexMap<String, DataEntry> {
        &mut self.data
    }

    /// Vertex list recorded by a GROUP BY, if any
    pub fn grouped_vertices(&self) -> Option<&[Vertex]> {
        match self.data.get(GROUPED_VERTICES_KEY) {
            Some(DataEntry::Vertices(vertices)) => Some(vertices),
            _ => None,
        }
    }

    /// Settings recorded by a LAYOUT clause, if any
    pub fn layout(&self) -> Option<&LayoutSettings> {
        match self.data.get(LAYOUT_KEY) {
            Some(DataEntry::Layout(settings)) => Some(settings),
            _ => None,
        }
    }

    /// Swap in new vertex and edge lists, relinking adjacency.
    ///
    /// Edges whose endpoints fall outside the new vertex list are dropped.
    pub(crate) fn replace(&mut self, vertices: Vec<Vertex>, edges: Vec<Edge>) {
        let vertex_count = vertices.len();
        self.vertices = vertices;
        self.edges = edges
            .into_iter()
            .filter(|edge| edge.source < vertex_count && edge.target < vertex_count)
            .collect();
        self.link();
    }

    /// Replace only the edge list
    pub(crate) fn replace_edges(&mut self, edges: Vec<Edge>) {
        let vertices = std::mem::take(&mut self.vertices);
        self.replace(vertices, edges);
    }

    /// Take the lists out, leaving an empty graph that still holds the side-channel
    pub(crate) fn take_parts(&mut self) -> (Vec<Vertex>, Vec<Edge>) {
        let vertices = std::mem::take(&mut self.vertices);
        let edges = std::mem::take(&mut self.edges);
        self.link();
        (vertices, edges)
    }

    fn link(&mut self) {
        for vertex in &mut self.vertices {
            vertex.edges.clear();
        }
        for (idx, edge) in self.edges.iter().enumerate() {
            self.vertices[edge.source].edges.push(idx);
            if edge.target != edge.source {
                self.vertices[edge.target].edges.push(idx);
            }
        }
        self.vertex_index = OnceLock::new();
        self.edge_index = OnceLock::new();
    }

    fn vertex_index(&self) -> &FxHashMap<VertexId, usize> {
        self.vertex_index.get_or_init(|| {
            self.vertices
                .iter()
                .enumerate()
                .map(|(idx, vertex)| (vertex.id, idx))
                .collect()
        })
    }

    fn edge_index(&self) -> &FxHashMap<EdgeKey, usize> {
        self.edge_index.get_or_init(|| {
            self.edges
                .iter()
                .enumerate()
                .map(|(idx, edge)| {
                    let key = EdgeKey::new(
                        self.vertices[edge.source].id,
                        self.vertices[edge.target].id,
                        edge.name.clone(),
                    );
                    (key, idx)
                })
                .collect()
        })
    }

    /// Position of the vertex with this id
    pub fn find_index(&self, id: VertexId) -> Option<usize> {
        self.vertex_index().get(&id).copied()
    }

    pub fn find_by_id(&self, id: VertexId) -> Option<&Vertex> {
        self.find_index(id).map(|idx| &self.vertices[idx])
    }

    /// Position of the edge with this composite key
    pub fn find_edge_index(&self, key: &EdgeKey) -> Option<usize> {
        self.edge_index().get(key).copied()
    }

    /// Incident edges of the vertex at `position`, paired with their positions
    pub fn incident_edges(&self, position: usize) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.vertices
            .get(position)
            .map(|vertex| vertex.edges.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&idx| (idx, &self.edges[idx]))
    }

    /// Release storage left over after filtering. Empty lists and property
    /// maps are omitted from serialized output.
    pub fn compact(&mut self) {
        self.vertices.shrink_to_fit();
        self.edges.shrink_to_fit();
        for vertex in &mut self.vertices {
            vertex.edges.shrink_to_fit();
        }
    }
}
