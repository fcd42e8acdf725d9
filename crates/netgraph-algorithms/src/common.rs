//! Topology view shared by the algorithms
//!
//! Nodes are the positions `0..node_count` of the caller's vertex list, so
//! every algorithm reports results as position-indexed vectors.

/// Absolute tolerance under which two path distances count as equal.
pub const TIE_TOLERANCE: f64 = 0.001;

/// Outgoing adjacency of every node, flattened into one array.
///
/// The successors of node `n` are `targets[offsets[n]..offsets[n + 1]]`, in
/// the order the edges were supplied.
#[derive(Debug, Clone)]
pub struct GraphView {
    offsets: Vec<usize>,
    targets: Vec<usize>,
    weights: Option<Vec<f64>>,
    in_degrees: Vec<usize>,
}

impl GraphView {
    /// Build a view from `(source, target, weight)` triples.
    ///
    /// Triples naming a position outside `0..node_count` are dropped. Weights
    /// are only kept when `weighted` is set; otherwise every edge weighs 1.0.
    pub fn from_edges<I>(node_count: usize, edges: I, weighted: bool) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];
        let mut in_degrees = vec![0; node_count];
        for (source, target, weight) in edges {
            if source < node_count && target < node_count {
                rows[source].push((target, weight));
                in_degrees[target] += 1;
            }
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut targets = Vec::new();
        let mut flat_weights = Vec::new();
        offsets.push(0);
        for row in rows {
            for (target, weight) in row {
                targets.push(target);
                flat_weights.push(weight);
            }
            offsets.push(targets.len());
        }

        GraphView {
            offsets,
            targets,
            weights: weighted.then_some(flat_weights),
            in_degrees,
        }
    }

    pub fn node_count(&self) -> usize {
        self.in_degrees.len()
    }

    /// Directed edges in the view, counting both copies of an undirected edge
    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    pub fn out_degree(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    pub fn in_degree(&self, node: usize) -> usize {
        self.in_degrees[node]
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        &self.targets[self.offsets[node]..self.offsets[node + 1]]
    }

    /// Successors paired with their edge weight (1.0 when unweighted)
    pub fn weighted_successors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[node]..self.offsets[node + 1];
        let weights = self.weights.as_ref().map(|w| &w[range.clone()]);
        self.targets[range]
            .iter()
            .enumerate()
            .map(move |(i, &target)| (target, weights.map_or(1.0, |w| w[i])))
    }
}

/// Divide every score by the largest one. A non-positive maximum yields zeros.
pub(crate) fn rescale_by_max(scores: &mut [f64]) {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 && max.is_finite() {
        for score in scores.iter_mut() {
            *score /= max;
        }
    } else {
        scores.iter_mut().for_each(|score| *score = 0.0);
    }
}
