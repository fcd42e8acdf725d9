//! CALCULATE: metric annotation

use super::GraphTransform;
use crate::algo::Metric;
use crate::graph::PropertyGraph;

/// Runs metrics in the order they were listed
#[derive(Debug, Clone, Default)]
pub struct CalculateClause {
    pub metrics: Vec<Metric>,
}

impl GraphTransform for CalculateClause {
    fn transform(&self, graph: PropertyGraph) -> PropertyGraph {
        self.metrics.iter().fold(graph, |graph, metric| metric.calculate(graph))
    }
}
