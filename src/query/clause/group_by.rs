//! GROUP BY: collapse vertices into one synthetic vertex per distinct value

use super::GraphTransform;
use crate::graph::{DataEntry, Edge, PropertyGraph, PropertyMap, PropertyValue, Vertex, VertexId, GROUPED_VERTICES_KEY};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupByClause {
    pub prop: String,
}

impl GroupByClause {
    pub fn new(prop: impl Into<String>) -> Self {
        GroupByClause { prop: prop.into() }
    }
}

struct Group {
    label: PropertyValue,
    members: Vec<usize>,
}

#[derive(Default)]
struct GroupEdge {
    size: i64,
    /// member position -> member positions it connects to
    connectors: IndexMap<usize, Vec<usize>>,
}

impl GraphTransform for GroupByClause {
    fn transform(&self, mut graph: PropertyGraph) -> PropertyGraph {
        let mut groups: IndexMap<String, Group> = IndexMap::new();
        let mut memberships: Vec<Vec<usize>> = vec![Vec::new(); graph.vertex_count()];

        for (position, vertex) in graph.vertices().iter().enumerate() {
            let Some(value) = vertex.props.get(&self.prop) else {
                continue;
            };
            let keys: Vec<&PropertyValue> = match value {
                PropertyValue::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for key in keys.into_iter().filter(|key| !key.is_null()) {
                let entry = groups.entry(key.group_key());
                let group_idx = entry.index();
                let group = entry.or_insert_with(|| Group {
                    label: key.clone(),
                    members: Vec::new(),
                });
                if group.members.last() != Some(&position) {
                    group.members.push(position);
                }
                if !memberships[position].contains(&group_idx) {
                    memberships[position].push(group_idx);
                }
            }
        }

        let mut group_edges: IndexMap<(usize, usize, String), GroupEdge> = IndexMap::new();
        for edge in graph.edges() {
            for &source_group in &memberships[edge.source] {
                for &target_group in &memberships[edge.target] {
                    let aggregate = group_edges
                        .entry((source_group, target_group, edge.name.clone()))
                        .or_default();
                    aggregate.size += 1;
                    let targets = aggregate.connectors.entry(edge.source).or_default();
                    if !targets.contains(&edge.target) {
                        targets.push(edge.target);
                    }
                }
            }
        }

        let vertices = groups
            .into_values()
            .enumerate()
            .map(|(ordinal, group)| {
                let mut props = PropertyMap::new();
                props.insert("label", group.label);
                props.insert("size", group.members.len());
                props.insert("members", positions(&group.members));
                Vertex::with_props(VertexId::from_ordinal(ordinal as u32), props)
            })
            .collect();

        let edges = group_edges
            .into_iter()
            .map(|((source, target, name), aggregate)| {
                let connectors: PropertyMap = aggregate
                    .connectors
                    .iter()
                    .map(|(member, targets)| (member.to_string(), positions(targets)))
                    .collect();
                let mut props = PropertyMap::new();
                props.insert("size", aggregate.size);
                props.insert("connectors", connectors);
                Edge::with_props(source, target, name, props)
            })
            .collect();

        let (original, _) = graph.take_parts();
        graph.replace(vertices, edges);
        // earlier side-channel entries describe the ungrouped vertices
        let data = graph.data_mut();
        data.clear();
        data.insert(GROUPED_VERTICES_KEY.to_string(), DataEntry::Vertices(original));
        graph
    }
}

fn positions(members: &[usize]) -> PropertyValue {
    PropertyValue::Array(members.iter().map(|&p| PropertyValue::from(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LayoutSettings, LAYOUT_KEY};

    fn ints(values: &[i64]) -> PropertyValue {
        PropertyValue::Array(values.iter().map(|&v| PropertyValue::Integer(v)).collect())
    }

    fn graph() -> PropertyGraph {
        let depts = [
            PropertyValue::from("IT"),
            PropertyValue::Array(vec!["IT".into(), "HR".into()]),
            PropertyValue::from("HR"),
            PropertyValue::Null,
        ];
        let vertices = depts
            .into_iter()
            .enumerate()
            .map(|(n, dept)| {
                let mut vertex = Vertex::new(VertexId::from_ordinal(n as u32 + 10));
                vertex.props.insert("Dept", dept);
                vertex
            })
            .collect();
        let edges = vec![
            Edge::new(0, 2, "Cooperation"),
            Edge::new(1, 2, "Cooperation"),
            Edge::new(2, 3, "Cooperation"),
            Edge::new(0, 0, "Self"),
        ];
        PropertyGraph::from_parts(vertices, edges).unwrap()
    }

    #[test]
    fn test_group_vertices() {
        let result = GroupByClause::new("dept").transform(graph());
        assert_eq!(result.vertex_count(), 2);

        let it = &result.vertices()[0];
        assert_eq!(it.id, VertexId::from_ordinal(0));
        assert_eq!(it.props.get("label"), Some(&PropertyValue::from("IT")));
        assert_eq!(it.props.get("size"), Some(&PropertyValue::Integer(2)));
        assert_eq!(it.props.get("members"), Some(&ints(&[0, 1])));

        let hr = &result.vertices()[1];
        assert_eq!(hr.id.to_string(), "00000001-0000-0000-0000-000000000000");
        assert_eq!(hr.props.get("members"), Some(&ints(&[1, 2])));
    }

    #[test]
    fn test_group_edges() {
        let result = GroupByClause::new("Dept").transform(graph());
        let edges = result.edges();

        // IT->HR from 0->2 and 1->2, HR->HR from 1->2, IT->IT self-loop
        assert_eq!(edges.len(), 3);
        assert_eq!((edges[0].source, edges[0].target), (0, 1));
        assert_eq!(edges[0].props.get("size"), Some(&PropertyValue::Integer(2)));
        let connectors = edges[0].props.get("connectors").and_then(PropertyValue::as_map).unwrap();
        assert_eq!(connectors.get("0"), Some(&ints(&[2])));
        assert_eq!(connectors.get("1"), Some(&ints(&[2])));

        assert_eq!((edges[1].source, edges[1].target), (1, 1));
        assert_eq!(edges[1].props.get("size"), Some(&PropertyValue::Integer(1)));

        assert_eq!((edges[2].source, edges[2].target, edges[2].name.as_str()), (0, 0, "Self"));
    }

    #[test]
    fn test_original_vertices_preserved() {
        let input = graph();
        let before = serde_json::to_string(input.vertices()).unwrap();
        let result = GroupByClause::new("Dept").transform(input);
        let after = serde_json::to_string(result.grouped_vertices().unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_grouping_starts_a_fresh_side_channel() {
        let mut input = graph();
        input.data_mut().insert("note".to_string(), DataEntry::Value(serde_json::json!("before")));
        input.data_mut().insert(LAYOUT_KEY.to_string(), DataEntry::Layout(LayoutSettings::default()));

        let result = GroupByClause::new("Dept").transform(input);
        let keys: Vec<_> = result.data().keys().map(String::as_str).collect();
        assert_eq!(keys, vec![GROUPED_VERTICES_KEY]);
        assert!(result.layout().is_none());
    }

    #[test]
    fn test_missing_property_yields_no_groups() {
        let result = GroupByClause::new("Nope").transform(graph());
        assert!(result.is_empty());
        assert_eq!(result.edge_count(), 0);
        assert_eq!(result.grouped_vertices().map(<[Vertex]>::len), Some(4));
    }
}
