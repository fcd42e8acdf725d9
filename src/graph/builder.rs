//! Reconcile persisted property rows against the schema
//!
//! Persisted values arrive as (uri, JSON text, timestamp) rows. The builder
//! names them through the schema: when several uris map to one name, the first
//! value seen keeps the slot unless a strictly newer row arrives later.

use super::property::{PropertyMap, PropertyValue};
use super::schema::{fallback_name, GraphSchema};
use super::types::{EdgeKey, VertexId};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// One persisted, non-deleted property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRow {
    pub uri: String,
    pub json_value: String,
    pub timestamp: DateTime<Utc>,
}

impl PropertyRow {
    pub fn new(uri: impl Into<String>, json_value: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        PropertyRow {
            uri: uri.into(),
            json_value: json_value.into(),
            timestamp,
        }
    }
}

/// A persisted vertex and its property rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: VertexId,
    #[serde(default)]
    pub props: Vec<PropertyRow>,
}

/// A persisted edge of one relationship uri and its property rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: VertexId,
    pub target: VertexId,
    pub uri: String,
    #[serde(default)]
    pub props: Vec<PropertyRow>,
}

/// Property map under construction, remembering when each slot was written
#[derive(Default)]
struct Reconciled {
    props: PropertyMap,
    stamps: HashMap<String, DateTime<Utc>>,
}

impl Reconciled {
    fn offer(&mut self, name: &str, row: &PropertyRow) {
        let slot = name.to_lowercase();
        if let Some(stamp) = self.stamps.get(&slot) {
            if *stamp >= row.timestamp {
                return;
            }
        }
        match serde_json::from_str::<serde_json::Value>(&row.json_value) {
            Ok(json) => {
                self.props.insert(name, PropertyValue::from(json));
                self.stamps.insert(slot, row.timestamp);
            }
            Err(e) => warn!("Skipping unparsable value of {}: {}", row.uri, e),
        }
    }
}

/// Turns persisted records into named vertex and edge property maps
pub struct GraphBuilder<'a> {
    schema: &'a GraphSchema,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(schema: &'a GraphSchema) -> Self {
        GraphBuilder { schema }
    }

    /// Build vertex property maps. Every record yields a vertex, with or without props.
    pub fn build_vertices(&self, records: &[VertexRecord]) -> Vec<(VertexId, PropertyMap)> {
        let mut buckets: IndexMap<&str, Vec<(VertexId, &PropertyRow)>> = IndexMap::new();
        for record in records {
            for row in &record.props {
                buckets.entry(row.uri.as_str()).or_default().push((record.id, row));
            }
        }

        let mut result: IndexMap<VertexId, Reconciled> = IndexMap::new();
        let mut processed: IndexSet<&str> = IndexSet::new();

        for section in &self.schema.vertex_schema {
            for prop in &section.props_schema {
                let Some(bucket) = buckets.get(prop.uri.as_str()) else {
                    continue;
                };
                processed.insert(prop.uri.as_str());
                for (id, row) in bucket {
                    result.entry(*id).or_default().offer(&prop.name, row);
                }
            }
        }

        for (uri, bucket) in &buckets {
            if processed.contains(uri) {
                continue;
            }
            let name = fallback_name(uri);
            for (id, row) in bucket {
                result.entry(*id).or_default().offer(name, row);
            }
        }

        for record in records {
            result.entry(record.id).or_default();
        }

        result.into_iter().map(|(id, reconciled)| (id, reconciled.props)).collect()
    }

    /// Build edge property maps keyed by (source, target, relationship name).
    ///
    /// Records whose relationship uri is not in the schema are ignored.
    pub fn build_edges(&self, records: &[EdgeRecord]) -> Vec<(EdgeKey, PropertyMap)> {
        let mut result: IndexMap<EdgeKey, Reconciled> = IndexMap::new();

        for relationship in &self.schema.edge_schema {
            for record in records.iter().filter(|r| r.uri == relationship.uri) {
                let key = EdgeKey::new(record.source, record.target, relationship.name.clone());
                let edge = result.entry(key).or_default();
                for prop in &relationship.props_schema {
                    for row in record.props.iter().filter(|row| row.uri == prop.uri) {
                        edge.offer(&prop.name, row);
                    }
                }
            }
        }

        result.into_iter().map(|(key, reconciled)| (key, reconciled.props)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::schema::SchemaSection;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap()
    }

    fn vid(n: u32) -> VertexId {
        VertexId::from_ordinal(n)
    }

    fn schema() -> GraphSchema {
        GraphSchema {
            locale: Some("en".into()),
            vertex_schema: vec![SchemaSection::new("Profile", "section/profile")
                .with_prop("Dept", "p/dept")
                .with_prop("Dept", "p/department")
                .with_prop("First name", "p/first")],
            edge_schema: vec![
                SchemaSection::new("Cooperation", "rel/coop").with_prop("Frequency", "rp/freq"),
                SchemaSection::new("Knowledge", "rel/know"),
            ],
        }
    }

    #[test]
    fn test_first_schema_entry_wins() {
        let records = vec![VertexRecord {
            id: vid(1),
            props: vec![
                PropertyRow::new("p/department", "\"Legal\"", at(5)),
                PropertyRow::new("p/dept", "\"IT\"", at(5)),
            ],
        }];
        let vertices = GraphBuilder::new(&schema()).build_vertices(&records);
        assert_eq!(vertices[0].1.get("dept"), Some(&PropertyValue::from("IT")));
    }

    #[test]
    fn test_strictly_newer_row_overrides() {
        let records = vec![VertexRecord {
            id: vid(1),
            props: vec![
                PropertyRow::new("p/dept", "\"IT\"", at(1)),
                PropertyRow::new("p/department", "\"Legal\"", at(2)),
            ],
        }];
        let vertices = GraphBuilder::new(&schema()).build_vertices(&records);
        assert_eq!(vertices[0].1.get("Dept"), Some(&PropertyValue::from("Legal")));
    }

    #[test]
    fn test_props_outside_schema_use_last_uri_segment() {
        let records = vec![VertexRecord {
            id: vid(1),
            props: vec![PropertyRow::new("http://x.org/extra/email", "\"a@b.c\"", at(1))],
        }];
        let vertices = GraphBuilder::new(&schema()).build_vertices(&records);
        assert_eq!(vertices[0].1.get("email"), Some(&PropertyValue::from("a@b.c")));
    }

    #[test]
    fn test_vertices_without_props_and_bad_json() {
        let records = vec![
            VertexRecord { id: vid(1), props: vec![] },
            VertexRecord {
                id: vid(2),
                props: vec![PropertyRow::new("p/first", "not json", at(1))],
            },
        ];
        let vertices = GraphBuilder::new(&schema()).build_vertices(&records);
        assert_eq!(vertices.len(), 2);
        assert!(vertices.iter().all(|(_, props)| props.is_empty()));
    }

    #[test]
    fn test_edges_named_through_schema() {
        let records = vec![
            EdgeRecord {
                source: vid(1),
                target: vid(2),
                uri: "rel/coop".into(),
                props: vec![
                    PropertyRow::new("rp/freq", "3", at(1)),
                    PropertyRow::new("rp/freq", "5", at(3)),
                ],
            },
            EdgeRecord { source: vid(2), target: vid(1), uri: "rel/know".into(), props: vec![] },
            EdgeRecord { source: vid(2), target: vid(1), uri: "rel/unknown".into(), props: vec![] },
        ];
        let edges = GraphBuilder::new(&schema()).build_edges(&records);

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].0, EdgeKey::new(vid(1), vid(2), "Cooperation"));
        assert_eq!(edges[0].1.get("frequency"), Some(&PropertyValue::Integer(5)));
        assert_eq!(edges[1].0, EdgeKey::new(vid(2), vid(1), "Knowledge"));
    }
}
