//! Network schema: upstream property and relationship uris mapped to display names

use serde::{Deserialize, Serialize};

/// One property of a schema section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    pub uri: String,
}

impl PropertySchema {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        PropertySchema {
            name: name.into(),
            uri: uri.into(),
        }
    }
}

/// A profile section (for vertices) or a relationship type (for edges)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSection {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub props_schema: Vec<PropertySchema>,
}

impl SchemaSection {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        SchemaSection {
            name: name.into(),
            uri: uri.into(),
            props_schema: Vec::new(),
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, uri: impl Into<String>) -> Self {
        self.props_schema.push(PropertySchema::new(name, uri));
        self
    }
}

/// Schema of one network in one locale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub vertex_schema: Vec<SchemaSection>,
    #[serde(default)]
    pub edge_schema: Vec<SchemaSection>,
}

impl GraphSchema {
    /// Name of the relationship with this uri; the first listed section wins
    pub fn relationship_name(&self, uri: &str) -> Option<&str> {
        self.edge_schema
            .iter()
            .find(|section| section.uri == uri)
            .map(|section| section.name.as_str())
    }
}

/// Display name for a property uri missing from the schema: its last path segment
pub fn fallback_name(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}
