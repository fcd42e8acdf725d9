//! WHERE: vertex filtering

use super::GraphTransform;
use crate::graph::{Edge, PropertyGraph};
use crate::query::ast::Expression;
use crate::query::eval::EvalContext;

/// Keeps the vertices the expression accepts and the edges between them
#[derive(Debug, Clone)]
pub struct WhereClause {
    pub expression: Expression,
}

impl WhereClause {
    pub fn new(expression: Expression) -> Self {
        WhereClause { expression }
    }
}

impl GraphTransform for WhereClause {
    fn transform(&self, mut graph: PropertyGraph) -> PropertyGraph {
        if graph.is_empty() {
            return graph;
        }

        // Edge predicates see the incident edges of the unfiltered graph
        let keep: Vec<bool> = (0..graph.vertex_count())
            .map(|idx| self.expression.evaluate(EvalContext::vertex(&graph, idx)))
            .collect();

        let mut renumbered = vec![None; keep.len()];
        let mut next = 0;
        for (idx, kept) in keep.iter().enumerate() {
            if *kept {
                renumbered[idx] = Some(next);
                next += 1;
            }
        }

        // (edge position, new source, new target), walking survivors' outgoing edges
        let mut surviving_edges = Vec::new();
        for (idx, new_source) in renumbered.iter().enumerate() {
            let Some(new_source) = *new_source else {
                continue;
            };
            for (edge_idx, edge) in graph.incident_edges(idx) {
                if edge.source != idx {
                    continue;
                }
                if let Some(new_target) = renumbered[edge.target] {
                    surviving_edges.push((edge_idx, new_source, new_target));
                }
            }
        }

        let (vertices, edges) = graph.take_parts();
        let mut edges: Vec<Option<Edge>> = edges.into_iter().map(Some).collect();
        let new_edges = surviving_edges
            .into_iter()
            .filter_map(|(edge_idx, source, target)| {
                let mut edge = edges[edge_idx].take()?;
                edge.source = source;
                edge.target = target;
                Some(edge)
            })
            .collect();
        let new_vertices = vertices
            .into_iter()
            .zip(keep)
            .filter_map(|(vertex, kept)| kept.then_some(vertex))
            .collect();

        graph.replace(new_vertices, new_edges);
        graph
    }
}
