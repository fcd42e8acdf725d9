//! Core identifier types for the graph engine

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct VertexId(pub Uuid);

impl VertexId {
    pub fn new(id: Uuid) -> Self {
        VertexId(id)
    }

    /// A fresh random identifier
    pub fn random() -> Self {
        VertexId(Uuid::new_v4())
    }

    /// Deterministic identifier whose leading 32-bit field is `ordinal`,
    /// e.g. ordinal 1 gives `00000001-0000-0000-0000-000000000000`.
    pub fn from_ordinal(ordinal: u32) -> Self {
        VertexId(Uuid::from_fields(ordinal, 0, 0, &[0; 8]))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for VertexId {
    fn from(id: Uuid) -> Self {
        VertexId(id)
    }
}

impl std::str::FromStr for VertexId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(VertexId(Uuid::parse_str(s)?))
    }
}

/// Identifier of a network, the unit a cached graph belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NetworkId(pub Uuid);

impl NetworkId {
    pub fn new(id: Uuid) -> Self {
        NetworkId(id)
    }

    pub fn random() -> Self {
        NetworkId(Uuid::new_v4())
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for NetworkId {
    fn from(id: Uuid) -> Self {
        NetworkId(id)
    }
}

/// Composite identity of an edge: at most one edge per
/// (source, target, relationship name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: VertexId,
    pub target: VertexId,
    pub name: String,
}

impl EdgeKey {
    pub fn new(source: VertexId, target: VertexId, name: impl Into<String>) -> Self {
        EdgeKey {
            source,
            target,
            name: name.into(),
        }
    }

    /// Whether the vertex is either endpoint
    pub fn touches(&self, vertex: VertexId) -> bool {
        self.source == vertex || self.target == vertex
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[{}]->{}", self.source, self.name, self.target)
    }
}
