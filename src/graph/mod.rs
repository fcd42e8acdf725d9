//! Property graph data model
//!
//! This module implements:
//! - Property values and insertion-ordered, case-insensitive property maps
//! - The indexed per-query graph (`PropertyGraph`) with adjacency links
//! - The live concurrent graph kept in the cache (`ConcurrentGraph`)
//! - Schema reconciliation of persisted property rows (`GraphBuilder`)
//! - Domain events that patch live graphs

pub mod builder;
pub mod concurrent;
pub mod event;
pub mod model;
pub mod property;
pub mod schema;
pub mod types;

// Re-export main types
pub use builder::{EdgeRecord, GraphBuilder, PropertyRow, VertexRecord};
pub use concurrent::ConcurrentGraph;
pub use event::GraphEvent;
pub use model::{
    DataEntry, Edge, GraphError, GraphResult, LayoutSettings, PropertyGraph, Vertex, GROUPED_VERTICES_KEY,
    LAYOUT_KEY,
};
pub use property::{PropertyMap, PropertyValue};
pub use schema::{GraphSchema, PropertySchema, SchemaSection};
pub use types::{EdgeKey, NetworkId, VertexId};
