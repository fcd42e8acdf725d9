//! Degree counting
//!
//! Self-loops count once on each side, so a loop adds two to the total degree.

use super::common::GraphView;

/// Which endpoints of an edge contribute to a node's degree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Count edges ending at the node
    Incoming,
    /// Count edges starting at the node
    Outgoing,
    /// Count both endpoints
    Both,
}

/// Degree of every node, indexed densely
pub fn degree_counts(view: &GraphView, direction: Direction) -> Vec<usize> {
    (0..view.node_count())
        .map(|idx| match direction {
            Direction::Incoming => view.in_degree(idx),
            Direction::Outgoing => view.out_degree(idx),
            Direction::Both => view.in_degree(idx) + view.out_degree(idx),
        })
        .collect()
}
