//! Layout bridge
//!
//! Seeds node coordinates for a query result from a stored layout, hands the
//! flat node and edge arrays to an external [`LayoutEngine`], and writes the
//! improved coordinates back onto the result and into the stored layout.

use crate::graph::{DataEntry, PropertyGraph, PropertyValue, VertexId, GROUPED_VERTICES_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// A node handed to the layout engine
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: VertexId,
    pub position: Position,
}

/// Stored coordinates of one layout, by vertex id
pub type StoredLayout = HashMap<VertexId, Position>;

/// External layout algorithm.
///
/// Receives seeded nodes and edges as node index pairs, and returns one
/// position per node, computed within `budget`.
pub trait LayoutEngine {
    fn improve(&self, nodes: &[LayoutNode], edges: &[(usize, usize)], budget: Duration) -> Vec<Position>;
}

/// Engine that leaves every seeded position where it is
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepPositions;

impl LayoutEngine for KeepPositions {
    fn improve(&self, nodes: &[LayoutNode], _edges: &[(usize, usize)], _budget: Duration) -> Vec<Position> {
        nodes.iter().map(|node| node.position).collect()
    }
}

/// Deterministic starting point for node `index` of `count`, inside the unit square
fn seed_position(index: usize, count: usize) -> Position {
    const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
    let radius = ((index as f64 + 0.5) / count.max(1) as f64).sqrt() * 0.5;
    let angle = index as f64 * GOLDEN_ANGLE;
    Position::new(0.5 + radius * angle.cos(), 0.5 + radius * angle.sin())
}

/// Mean stored position of a group's members, if any member has one
fn group_position(members: &PropertyValue, graph: &PropertyGraph, stored: &StoredLayout) -> Option<Position> {
    let Some(DataEntry::Vertices(originals)) = graph.data().get(GROUPED_VERTICES_KEY) else {
        return None;
    };
    let positions: Vec<Position> = members
        .as_array()?
        .iter()
        .filter_map(|member| member.as_integer())
        .filter_map(|member| originals.get(usize::try_from(member).ok()?))
        .filter_map(|vertex| stored.get(&vertex.id).copied())
        .collect();
    if positions.is_empty() {
        return None;
    }
    let count = positions.len() as f64;
    let (x, y) = positions
        .iter()
        .fold((0.0, 0.0), |(x, y), position| (x + position.x, y + position.y));
    Some(Position::new(x / count, y / count))
}

/// Lay out a query result.
///
/// Returns whether every node started from a stored (or interpolated)
/// position. Vertices get `x` and `y` properties; ungrouped vertices also have
/// their final position written to `stored`.
pub fn apply_layout(
    graph: &mut PropertyGraph,
    stored: &mut StoredLayout,
    engine: &dyn LayoutEngine,
    budget: Duration,
) -> bool {
    let grouped = graph.grouped_vertices().is_some();
    let count = graph.vertex_count();
    let mut covered = true;

    let view: &PropertyGraph = graph;
    let known_positions: &StoredLayout = stored;
    let nodes: Vec<LayoutNode> = view
        .vertices()
        .iter()
        .enumerate()
        .map(|(index, vertex)| {
            let known = match vertex.props.get("members") {
                Some(members) if grouped => group_position(members, view, known_positions),
                _ => known_positions.get(&vertex.id).copied(),
            };
            let position = known.unwrap_or_else(|| {
                covered = false;
                seed_position(index, count)
            });
            LayoutNode { id: vertex.id, position }
        })
        .collect();

    let edges: Vec<(usize, usize)> = graph.edges().iter().map(|edge| (edge.source, edge.target)).collect();
    let positions = engine.improve(&nodes, &edges, budget);
    debug!("Laid out {} nodes, all seeded from storage: {}", positions.len(), covered);

    for (vertex, position) in graph.vertices_mut().iter_mut().zip(positions) {
        vertex.props.insert("x", position.x);
        vertex.props.insert("y", position.y);
        if !grouped {
            stored.insert(vertex.id, position);
        }
    }
    covered
}
