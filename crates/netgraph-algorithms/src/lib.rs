//! Graph algorithms for network analytics
//!
//! Every algorithm runs over a [`GraphView`], the outgoing adjacency of nodes
//! numbered by position, and answers with vectors in that same order.
//! Callers decide which edges take part and what they weigh; the algorithms
//! never see properties.

pub mod centrality;
pub mod common;
pub mod pathfinding;
pub mod topology;

pub use centrality::{
    betweenness_centrality, eigenvector_centrality, BetweennessConfig, EigenvectorConfig,
    BETWEENNESS_SAMPLE_BUDGET, EIGENVECTOR_MAX_ITERATIONS, EIGENVECTOR_TOLERANCE,
};
pub use common::{GraphView, TIE_TOLERANCE};
pub use pathfinding::{shortest_path_tree, PathTree, ShortestPathConfig};
pub use topology::{degree_counts, Direction};
