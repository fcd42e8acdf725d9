//! Netgraph
//!
//! An organizational network engine: people are vertices, relationships are
//! edges, and both carry arbitrary typed properties. A small query language
//! filters, projects, groups and annotates the graph with metrics.
//!
//! # Architecture
//!
//! - `graph`: property values, the per-query indexed graph, the live
//!   concurrent graph, schema reconciliation and domain events
//! - `cache`: one live graph per (network, locale), built lazily from a
//!   repository and patched by events
//! - `query`: grammar, compiler and the clause pipeline
//! - `duplicates`: finding vertices that describe the same person and
//!   folding one into another
//! - `algo`: adapter from property graphs to the `netgraph-algorithms` crate
//! - `layout`: seeding and writing back node coordinates
//!
//! ## Example Usage
//!
//! ```rust
//! use netgraph::graph::{Edge, PropertyGraph, PropertyValue, Vertex, VertexId};
//! use netgraph::QueryEngine;
//!
//! let vertices = (1..=3).map(|n| Vertex::new(VertexId::from_ordinal(n))).collect();
//! let edges = vec![Edge::new(0, 1, "Cooperation"), Edge::new(0, 2, "Knowledge"), Edge::new(2, 0, "Knowledge")];
//! let graph = PropertyGraph::from_parts(vertices, edges).unwrap();
//!
//! let engine = QueryEngine::default();
//! let result = engine.run("SELECT * CALCULATE degree SELECT degree", graph).unwrap();
//! assert_eq!(result.vertices()[0].props.get("degree"), Some(&PropertyValue::Integer(3)));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod cache;
pub mod config;
pub mod duplicates;
pub mod graph;
pub mod layout;
pub mod query;

// Re-export main types for convenience
pub use graph::{
    ConcurrentGraph, DataEntry, Edge, EdgeKey, GraphError, GraphEvent, GraphResult, GraphSchema, LayoutSettings,
    NetworkId, PropertyGraph, PropertyMap, PropertyValue, Vertex, VertexId,
};

pub use cache::{
    CacheError, CacheResult, CachedGraph, GraphCache, GraphRepository, InMemoryRepository, RepositoryError,
    RepositoryResult,
};

pub use query::{compile, CompiledStatement, QueryEngine, QueryError, QueryResult, SyntaxError, SyntaxResult};

pub use algo::{Metric, MetricSettings};
pub use config::{ConfigError, EngineConfig};
pub use duplicates::{find_duplicates, DuplicateSet, DuplicateSettings, MergePlan};
pub use layout::{apply_layout, LayoutEngine, LayoutNode, Position};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
