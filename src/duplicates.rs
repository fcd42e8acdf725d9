//! Duplicate vertex detection and merging
//!
//! Two passes over a snapshot: vertices agreeing on every configured
//! required property, then vertices whose label matches after trimming and
//! lowercasing. A set found by both passes is reported once, with the
//! stronger score.

use crate::graph::{EdgeRecord, PropertyGraph, Vertex, VertexId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Score of a set agreeing on every required property
pub const REQUIRED_PROPS_SCORE: f64 = 1.0;
/// Score of a set sharing only a label
pub const LABEL_SCORE: f64 = 0.5;

/// Which properties identify a vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateSettings {
    pub required_props: Vec<String>,
    pub label_prop: String,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            required_props: Vec::new(),
            label_prop: "Name".to_string(),
        }
    }
}

/// A vertex and the vertices believed to describe the same person
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateSet {
    pub score: f64,
    pub vertex: Vertex,
    pub duplicates: Vec<Vertex>,
}

impl DuplicateSet {
    pub fn ids(&self) -> Vec<VertexId> {
        std::iter::once(self.vertex.id)
            .chain(self.duplicates.iter().map(|v| v.id))
            .collect()
    }
}

/// Find duplicate sets, strongest first.
///
/// The first member in snapshot order becomes the primary vertex.
pub fn find_duplicates(graph: &PropertyGraph, settings: &DuplicateSettings) -> Vec<DuplicateSet> {
    let vertices = graph.vertices();
    let by_required = group_positions(vertices, |vertex| required_key(vertex, &settings.required_props));
    let by_label = group_positions(vertices, |vertex| label_key(vertex, &settings.label_prop));

    let mut seen: HashSet<Vec<VertexId>> = HashSet::new();
    let mut sets = Vec::new();
    let candidates = by_required
        .into_iter()
        .map(|group| (REQUIRED_PROPS_SCORE, group))
        .chain(by_label.into_iter().map(|group| (LABEL_SCORE, group)));
    for (score, group) in candidates {
        let mut ids: Vec<VertexId> = group.iter().map(|&pos| vertices[pos].id).collect();
        ids.sort();
        if !seen.insert(ids) {
            continue;
        }
        let mut members = group.into_iter().map(|pos| vertices[pos].clone());
        let Some(vertex) = members.next() else {
            continue;
        };
        sets.push(DuplicateSet {
            score,
            vertex,
            duplicates: members.collect(),
        });
    }
    debug!("Found {} duplicate sets among {} vertices", sets.len(), vertices.len());
    sets
}

/// Positions sharing a key, for keys held by more than one vertex
fn group_positions(vertices: &[Vertex], key: impl Fn(&Vertex) -> Option<String>) -> Vec<Vec<usize>> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (pos, vertex) in vertices.iter().enumerate() {
        if let Some(key) = key(vertex) {
            groups.entry(key).or_default().push(pos);
        }
    }
    groups.into_values().filter(|group| group.len() > 1).collect()
}

/// JSON forms of the required properties joined with `::`; None when no
/// property is set
fn required_key(vertex: &Vertex, props: &[String]) -> Option<String> {
    let values: Vec<_> = props.iter().map(|name| vertex.props.get(name)).collect();
    if values.iter().all(|value| value.map_or(true, |v| v.is_null())) {
        return None;
    }
    let parts: Vec<String> = values
        .into_iter()
        .map(|value| value.map(|v| v.to_json().to_string()).unwrap_or_default())
        .collect();
    Some(parts.join("::"))
}

fn label_key(vertex: &Vertex, label_prop: &str) -> Option<String> {
    let label = vertex.props.get(label_prop)?.plain_text().trim().to_lowercase();
    (!label.is_empty()).then_some(label)
}

/// Edge changes that fold `duplicate` into `vertex`
#[derive(Debug, Default, PartialEq)]
pub struct MergePlan {
    /// Edges of the duplicate, rewritten to point at the kept vertex
    pub relinked: Vec<EdgeRecord>,
    /// Edges of the duplicate that disappear with it
    pub dropped: Vec<EdgeRecord>,
}

/// Work out how the duplicate's edges move onto `vertex`.
///
/// An edge whose relinked form already exists is dropped, as is one that
/// would become a self-loop.
pub fn plan_merge(vertex: VertexId, duplicate: VertexId, edges: &[EdgeRecord]) -> MergePlan {
    let mut existing: HashSet<(VertexId, VertexId, &str)> = edges
        .iter()
        .filter(|e| e.source != duplicate && e.target != duplicate)
        .map(|e| (e.source, e.target, e.uri.as_str()))
        .collect();

    let mut plan = MergePlan::default();
    for edge in edges.iter().filter(|e| e.source == duplicate || e.target == duplicate) {
        let relink = |id: VertexId| if id == duplicate { vertex } else { id };
        let (source, target) = (relink(edge.source), relink(edge.target));
        if source == target || !existing.insert((source, target, edge.uri.as_str())) {
            debug!("Dropping edge {} -> {} ({})", edge.source, edge.target, edge.uri);
            plan.dropped.push(edge.clone());
        } else {
            plan.relinked.push(EdgeRecord {
                source,
                target,
                ..edge.clone()
            });
        }
    }
    plan
}
