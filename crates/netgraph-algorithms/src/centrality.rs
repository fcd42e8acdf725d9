//! Centrality measures
//!
//! Power-iteration eigenvector centrality and a weighted, tie-aware variant of
//! Brandes' betweenness centrality. Both rescale their output to [0, 1].

use super::common::{rescale_by_max, GraphView, TIE_TOLERANCE};
use super::pathfinding::State;
use rayon::prelude::*;
use std::collections::BinaryHeap;

/// Power iterations attempted before giving up
pub const EIGENVECTOR_MAX_ITERATIONS: usize = 100;
/// Per-node convergence tolerance for eigenvector centrality
pub const EIGENVECTOR_TOLERANCE: f64 = 0.0001;
/// Above this many nodes, betweenness samples its source nodes
pub const BETWEENNESS_SAMPLE_BUDGET: usize = 100;

/// Eigenvector centrality configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EigenvectorConfig {
    /// Number of iterations
    pub iterations: usize,
    /// Convergence is reached when the summed change drops below `tolerance * node_count`
    pub tolerance: f64,
}

impl Default for EigenvectorConfig {
    fn default() -> Self {
        Self {
            iterations: EIGENVECTOR_MAX_ITERATIONS,
            tolerance: EIGENVECTOR_TOLERANCE,
        }
    }
}

/// Betweenness centrality configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BetweennessConfig {
    /// Graphs with more nodes than this use every `round(n / budget)`-th node as a source
    pub sample_budget: usize,
    /// Distances closer than this are treated as ties
    pub tie_tolerance: f64,
}

impl Default for BetweennessConfig {
    fn default() -> Self {
        Self {
            sample_budget: BETWEENNESS_SAMPLE_BUDGET,
            tie_tolerance: TIE_TOLERANCE,
        }
    }
}

fn normalize(vector: &mut [f64]) {
    let sum: f64 = vector.iter().sum();
    let w = 1.0 / if sum > 0.0 { sum } else { 1.0 };
    for value in vector.iter_mut() {
        *value *= w;
    }
}

/// Eigenvector centrality by power iteration over outgoing edges.
///
/// Returns `None` when the iteration does not converge within the configured
/// number of rounds; callers leave their nodes untouched in that case.
pub fn eigenvector_centrality(
    view: &GraphView,
    config: &EigenvectorConfig,
) -> Option<Vec<f64>> {
    let n = view.node_count();
    if n == 0 {
        return None;
    }

    let mut scores = vec![1.0 / n as f64; n];
    normalize(&mut scores);

    for _ in 0..config.iterations {
        let previous = scores;
        scores = vec![0.0; n];

        for (source, score) in scores.iter_mut().enumerate() {
            for (target, weight) in view.weighted_successors(source) {
                if target == source {
                    continue;
                }
                *score += previous[target] * weight;
            }
        }
        normalize(&mut scores);

        let energy: f64 = scores
            .iter()
            .zip(previous.iter())
            .map(|(now, before)| (now - before).abs())
            .sum();
        if energy < n as f64 * config.tolerance {
            rescale_by_max(&mut scores);
            return Some(scores);
        }
    }

    None
}

/// Indices of the nodes used as traversal sources
fn sampled_sources(node_count: usize, sample_budget: usize) -> Vec<usize> {
    if sample_budget == 0 || node_count <= sample_budget {
        return (0..node_count).collect();
    }
    let modulo = ((node_count as f64 / sample_budget as f64).round_ties_even() as usize).max(1);
    (0..node_count).filter(|idx| idx % modulo == 0).collect()
}

/// Dependency of every node on shortest paths starting at `start`
fn single_source_dependency(view: &GraphView, start: usize, tie_tolerance: f64) -> Vec<f64> {
    let n = view.node_count();
    let mut sigma = vec![0.0; n];
    let mut paths: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut distance: Vec<Option<f64>> = vec![None; n];
    let mut seen: Vec<Option<f64>> = vec![None; n];
    let mut stack = Vec::new();
    let mut heap = BinaryHeap::new();
    let mut seq = 0;

    sigma[start] = 1.0;
    seen[start] = Some(0.0);
    heap.push(State { cost: 0.0, seq, pred: start, node_idx: start });

    while let Some(State { cost, pred, node_idx, .. }) = heap.pop() {
        if distance[node_idx].is_some() {
            continue;
        }
        // count paths
        sigma[node_idx] += sigma[pred];
        stack.push(node_idx);
        distance[node_idx] = Some(cost);

        for (target, weight) in view.weighted_successors(node_idx) {
            if target == node_idx {
                continue;
            }
            let edge_dist = cost + weight;
            match seen[target] {
                Some(best) if distance[target].is_some() || edge_dist >= best => {
                    if (edge_dist - best).abs() < tie_tolerance {
                        sigma[target] += sigma[node_idx];
                        if !paths[target].contains(&node_idx) {
                            paths[target].push(node_idx);
                        }
                    }
                }
                _ => {
                    seen[target] = Some(edge_dist);
                    seq += 1;
                    heap.push(State { cost: edge_dist, seq, pred: node_idx, node_idx: target });
                    sigma[target] = 0.0;
                    paths[target] = vec![node_idx];
                }
            }
        }
    }

    let mut delta = vec![0.0; n];
    let mut dependency = vec![0.0; n];
    while let Some(node_idx) = stack.pop() {
        if sigma[node_idx] > 0.0 {
            for &p in &paths[node_idx] {
                delta[p] += sigma[p] / sigma[node_idx] * (1.0 + delta[node_idx]);
            }
        }
        if node_idx != start {
            dependency[node_idx] += delta[node_idx];
        }
    }
    dependency
}

/// Betweenness centrality, rescaled so the most central node scores 1.0.
///
/// Source nodes are processed in parallel; their contributions are summed in
/// source order so results do not depend on scheduling.
pub fn betweenness_centrality(view: &GraphView, config: &BetweennessConfig) -> Vec<f64> {
    let n = view.node_count();

    let contributions: Vec<Vec<f64>> = sampled_sources(n, config.sample_budget)
        .into_par_iter()
        .map(|start| single_source_dependency(view, start, config.tie_tolerance))
        .collect();

    let mut scores = vec![0.0; n];
    for contribution in contributions {
        for (score, value) in scores.iter_mut().zip(contribution) {
            *score += value;
        }
    }
    rescale_by_max(&mut scores);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_betweenness_on_a_chain() {
        // 0->1->2: only node 1 lies between two others
        let view = GraphView::from_edges(3, vec![(0, 1, 1.0), (1, 2, 1.0)], false);
        let scores = betweenness_centrality(&view, &BetweennessConfig::default());

        assert!(close(scores[0], 0.0));
        assert!(close(scores[1], 1.0));
        assert!(close(scores[2], 0.0));
    }

    #[test]
    fn test_betweenness_splits_tied_paths() {
        // diamond 0->1->3, 0->2->3, 3->4: 3 carries every path to 4
        let view = GraphView::from_edges(
            5,
            vec![(0, 1, 1.0), (0, 2, 1.0), (1, 3, 1.0), (2, 3, 1.0), (3, 4, 1.0)],
            false,
        );
        let scores = betweenness_centrality(&view, &BetweennessConfig::default());

        assert!(close(scores[3], 1.0));
        assert!(close(scores[1], scores[2]));
        assert!(scores[1] > 0.0 && scores[1] < 1.0);
        assert!(close(scores[0], 0.0));
    }

    #[test]
    fn test_betweenness_without_paths_is_zero() {
        let view = GraphView::from_edges(3, vec![(0, 1, 1.0)], false);
        let scores = betweenness_centrality(&view, &BetweennessConfig::default());
        assert!(scores.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_betweenness_ignores_self_loops() {
        let view = GraphView::from_edges(3, vec![(0, 1, 1.0), (1, 1, 1.0), (1, 2, 1.0)], false);
        let scores = betweenness_centrality(&view, &BetweennessConfig::default());
        assert!(close(scores[1], 1.0));
    }

    #[test]
    fn test_sampled_sources() {
        assert_eq!(sampled_sources(5, 100).len(), 5);
        // 250 / 100 = 2.5 rounds to even 2
        assert_eq!(sampled_sources(250, 100).len(), 125);
        // 350 / 100 = 3.5 rounds to even 4
        assert_eq!(sampled_sources(350, 100), (0..350).step_by(4).collect::<Vec<_>>());
        assert_eq!(sampled_sources(101, 100).len(), 101);
    }

    #[test]
    fn test_eigenvector_on_a_cycle_is_uniform() {
        let view = GraphView::from_edges(3, vec![(0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0)], false);
        let scores = eigenvector_centrality(&view, &EigenvectorConfig::default()).unwrap();
        for idx in 0..3 {
            assert!(close(scores[idx], 1.0));
        }
    }

    #[test]
    fn test_eigenvector_favours_well_connected_nodes() {
        // complete digraph on 0,1,2 plus 3->0 and 0->3
        let mut edges = Vec::new();
        for a in 0..3 {
            for b in 0..3 {
                if a != b {
                    edges.push((a, b, 1.0));
                }
            }
        }
        edges.push((3, 0, 1.0));
        edges.push((0, 3, 1.0));
        let view = GraphView::from_edges(4, edges, false);
        let scores = eigenvector_centrality(&view, &EigenvectorConfig::default()).unwrap();

        assert!(close(scores[0], 1.0));
        assert!(scores[3] < scores[1]);
    }

    #[test]
    fn test_eigenvector_gives_up_without_convergence() {
        // A bipartite 2-cycle with unequal start never settles within one round
        let view = GraphView::from_edges(2, vec![(0, 1, 1.0)], false);
        let config = EigenvectorConfig { iterations: 1, tolerance: 0.0 };
        assert!(eigenvector_centrality(&view, &config).is_none());
    }

    #[test]
    fn test_eigenvector_is_scale_invariant() {
        let edges = vec![(0, 1, 2.0), (1, 2, 2.0), (2, 0, 2.0), (0, 2, 2.0)];
        let plain = GraphView::from_edges(3, edges.clone(), false);
        let scaled = GraphView::from_edges(
            3,
            edges.into_iter().map(|(s, t, w)| (s, t, w * 10.0)),
            true,
        );
        let a = eigenvector_centrality(&plain, &EigenvectorConfig::default()).unwrap();
        let b = eigenvector_centrality(&scaled, &EigenvectorConfig::default()).unwrap();
        for idx in 0..3 {
            assert!((a[idx] - b[idx]).abs() < 1e-6);
        }
    }
}
