//! Domain events that patch cached graphs
//!
//! Events are delivered at least once and possibly out of order relative to
//! the persisted writes they announce. Handlers re-read persisted state, so
//! replaying an event is harmless.

use super::types::{NetworkId, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GraphEvent {
    VertexSaved {
        vertex_id: VertexId,
    },
    VertexDeleted {
        vertex_id: VertexId,
    },
    EdgeSaved {
        source: VertexId,
        target: VertexId,
        schema_uri: String,
    },
    EdgeDeleted {
        source: VertexId,
        target: VertexId,
        schema_uris: Vec<String>,
    },
    NetworkCacheCleared {
        network_id: NetworkId,
    },
}

impl fmt::Display for GraphEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphEvent::VertexSaved { vertex_id } => write!(f, "VertexSaved({})", vertex_id),
            GraphEvent::VertexDeleted { vertex_id } => write!(f, "VertexDeleted({})", vertex_id),
            GraphEvent::EdgeSaved { source, target, schema_uri } => {
                write!(f, "EdgeSaved({} -> {}, {})", source, target, schema_uri)
            }
            GraphEvent::EdgeDeleted { source, target, schema_uris } => {
                write!(f, "EdgeDeleted({} -> {}, {})", source, target, schema_uris.join(", "))
            }
            GraphEvent::NetworkCacheCleared { network_id } => write!(f, "NetworkCacheCleared({})", network_id),
        }
    }
}
