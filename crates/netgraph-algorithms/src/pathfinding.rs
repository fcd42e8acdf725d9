//! Weighted shortest paths
//!
//! Multi-source Dijkstra that keeps every predecessor lying on a shortest
//! path, where distances within the tie tolerance count as equal.

use super::common::{GraphView, TIE_TOLERANCE};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Shortest path configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShortestPathConfig {
    /// Distances closer than this are treated as ties
    pub tie_tolerance: f64,
}

impl Default for ShortestPathConfig {
    fn default() -> Self {
        Self {
            tie_tolerance: TIE_TOLERANCE,
        }
    }
}

/// Distance and shortest-path predecessors of one reached node
#[derive(Debug, Clone, PartialEq)]
pub struct PathTree {
    pub distance: f64,
    /// Distinct predecessors in discovery order; empty for source nodes
    pub predecessors: Vec<usize>,
}

/// Priority queue entry. `seq` keeps equal-cost entries in push order.
#[derive(Copy, Clone, PartialEq)]
pub(crate) struct State {
    pub cost: f64,
    pub seq: usize,
    pub pred: usize,
    pub node_idx: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compare costs reversed for min-heap
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest paths from a set of source nodes to everything reachable.
///
/// Entry `n` of the result is `None` when node `n` is unreachable. Uses edge
/// weights from the view if available, otherwise 1.0. Self-loops never lie on
/// a shortest path and are skipped. Out-of-range sources are ignored.
pub fn shortest_path_tree(
    view: &GraphView,
    sources: &[usize],
    config: &ShortestPathConfig,
) -> Vec<Option<PathTree>> {
    let n = view.node_count();
    let mut distance: Vec<Option<f64>> = vec![None; n];
    let mut seen: Vec<Option<f64>> = vec![None; n];
    let mut paths: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut heap = BinaryHeap::new();
    let mut seq = 0;

    for &idx in sources {
        if idx >= n || seen[idx].is_some() {
            continue;
        }
        seen[idx] = Some(0.0);
        heap.push(State { cost: 0.0, seq, pred: idx, node_idx: idx });
        seq += 1;
    }

    while let Some(State { cost, node_idx, .. }) = heap.pop() {
        if distance[node_idx].is_some() {
            continue;
        }
        distance[node_idx] = Some(cost);

        for (target, weight) in view.weighted_successors(node_idx) {
            if target == node_idx {
                continue;
            }
            let edge_dist = cost + weight;
            match seen[target] {
                Some(best) if distance[target].is_some() || edge_dist >= best => {
                    if (edge_dist - best).abs() < config.tie_tolerance
                        && !paths[target].contains(&node_idx)
                    {
                        paths[target].push(node_idx);
                    }
                }
                _ => {
                    seen[target] = Some(edge_dist);
                    heap.push(State { cost: edge_dist, seq, pred: node_idx, node_idx: target });
                    seq += 1;
                    paths[target] = vec![node_idx];
                }
            }
        }
    }

    distance
        .into_iter()
        .zip(paths)
        .map(|(dist, predecessors)| dist.map(|distance| PathTree { distance, predecessors }))
        .collect()
}
