//! SELECT: vertex projection and edge filtering

use super::GraphTransform;
use crate::graph::{Edge, PropertyGraph, PropertyMap, PropertyValue};
use crate::query::ast::{EdgeProjection, SelectExpr, SelectItem};
use crate::query::eval::sql_like;
use indexmap::IndexMap;

/// Relationship key standing for every relationship
pub const ANY_RELATIONSHIP: &str = "*";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectClause {
    pub items: Vec<SelectItem>,
    /// Edge projections keyed by lowercased relationship name
    pub edges: IndexMap<String, EdgeProjection>,
}

impl SelectClause {
    pub fn is_wildcard(&self) -> bool {
        self.items.iter().any(|item| matches!(item, SelectItem::Wildcard))
    }

    /// Projection slot for a relationship, created on first use
    pub fn edge_projection(&mut self, relationship: &str) -> &mut EdgeProjection {
        self.edges.entry(relationship.to_lowercase()).or_default()
    }

    fn projection_for(&self, relationship: &str) -> Option<&EdgeProjection> {
        self.edges
            .get(&relationship.to_lowercase())
            .or_else(|| self.edges.get(ANY_RELATIONSHIP))
    }
}

impl GraphTransform for SelectClause {
    fn transform(&self, mut graph: PropertyGraph) -> PropertyGraph {
        if self.is_wildcard() {
            return graph;
        }

        let (mut vertices, edges) = graph.take_parts();
        for vertex in &mut vertices {
            let source = std::mem::take(&mut vertex.props);
            vertex.props = self
                .items
                .iter()
                .filter_map(|item| match item {
                    SelectItem::Column { expr, key } => Some((key.as_str(), select_value(expr, &source))),
                    SelectItem::Wildcard => None,
                })
                .collect();
        }

        let edges: Vec<Edge> = edges
            .into_iter()
            .filter_map(|mut edge| {
                let projection = self.projection_for(&edge.name)?;
                project_edge(projection, &mut edge);
                Some(edge)
            })
            .collect();

        graph.replace(vertices, edges);
        graph
    }
}

fn project_edge(projection: &EdgeProjection, edge: &mut Edge) {
    if !projection.keep_all {
        let mut props = PropertyMap::new();
        for filter in &projection.props {
            if let Some(value) = edge.props.get(&filter.name) {
                props.insert(filter.alias.as_deref().unwrap_or(&filter.name), value.clone());
            }
        }
        edge.props = props;
    }
    if let Some(name) = &projection.rename {
        edge.name = name.clone();
    }
}

/// Evaluate a column against a vertex's original properties
pub fn select_value(expr: &SelectExpr, props: &PropertyMap) -> PropertyValue {
    match expr {
        SelectExpr::Prop(name) => props.get(name).cloned().unwrap_or(PropertyValue::Null),
        SelectExpr::Literal(value) => value.clone(),
        SelectExpr::Union(left, right) => union(select_value(left, props), select_value(right, props)),
        SelectExpr::Like(left, right) => {
            let left = select_value(left, props);
            let right = select_value(right, props);
            if left.is_null() || right.is_null() {
                return PropertyValue::Null;
            }
            let text = right.plain_text();
            let pattern = text.trim_matches('\'');
            let matching = into_items(left)
                .into_iter()
                .filter(|item| sql_like(&item.plain_text(), pattern))
                .collect();
            PropertyValue::Array(matching)
        }
    }
}

fn into_items(value: PropertyValue) -> Vec<PropertyValue> {
    match value {
        PropertyValue::Array(items) => items,
        other => vec![other],
    }
}

/// Left-biased set union keyed by plain text
fn union(left: PropertyValue, right: PropertyValue) -> PropertyValue {
    match (left.is_null(), right.is_null()) {
        (true, true) => return PropertyValue::Null,
        (true, false) => return PropertyValue::Array(into_items(right)),
        (false, true) => return PropertyValue::Array(into_items(left)),
        (false, false) => {}
    }
    let mut merged: IndexMap<String, PropertyValue> = IndexMap::new();
    for item in into_items(left).into_iter().chain(into_items(right)) {
        merged.entry(item.plain_text()).or_insert(item);
    }
    PropertyValue::Array(merged.into_values().collect())
}
