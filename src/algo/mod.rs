//! Graph metrics
//!
//! The algorithms themselves live in the `netgraph-algorithms` crate and only
//! see dense topology. This module is the adapter: it decides which edges of a
//! `PropertyGraph` take part, what they weigh, and writes results back onto
//! vertex properties.

use crate::graph::{PropertyGraph, PropertyValue};
use crate::query::ast::{Expression, Identifier};
use crate::query::eval::EvalContext;
use netgraph_algorithms::{
    betweenness_centrality, degree_counts, eigenvector_centrality, shortest_path_tree, GraphView,
};
use tracing::{debug, warn};

pub use netgraph_algorithms::{BetweennessConfig, Direction, EigenvectorConfig, ShortestPathConfig};

/// Algorithm parameters applied to every metric of a compiled query
#[derive(Debug, Clone, Default)]
pub struct MetricSettings {
    pub eigenvector: EigenvectorConfig,
    pub betweenness: BetweennessConfig,
    pub path_length: ShortestPathConfig,
}

/// Weight of an edge read through `length`.
///
/// Numbers and numeric strings are used as-is; anything else, including NaN
/// and infinities, weighs 1.0.
pub fn edge_weight(graph: &PropertyGraph, edge: usize, length: Option<&Identifier>) -> f64 {
    let Some(length) = length else {
        return 1.0;
    };
    let weight = match &*length.evaluate(EvalContext::edge(graph, edge)) {
        PropertyValue::Integer(i) => *i as f64,
        PropertyValue::Float(f) => *f,
        PropertyValue::String(s) => s.trim().parse().unwrap_or(1.0),
        _ => 1.0,
    };
    if weight.is_finite() {
        weight
    } else {
        1.0
    }
}

/// Build a view over the edges passing `filter`.
///
/// Node indices are vertex positions. With `undirected` set, every matching
/// edge is also added in reverse, right after its forward copy.
pub fn build_view(
    graph: &PropertyGraph,
    filter: Option<&Expression>,
    length: Option<&Identifier>,
    undirected: bool,
) -> GraphView {
    let edges: Vec<(usize, usize, f64)> = graph
        .edges()
        .iter()
        .enumerate()
        .filter(|(idx, _)| filter.map_or(true, |expr| expr.evaluate(EvalContext::edge(graph, *idx))))
        .flat_map(|(idx, edge)| {
            let weight = edge_weight(graph, idx, length);
            let reverse = undirected.then_some((edge.target, edge.source, weight));
            std::iter::once((edge.source, edge.target, weight)).chain(reverse)
        })
        .collect();

    GraphView::from_edges(graph.vertex_count(), edges, length.is_some())
}

/// A metric requested by a CALCULATE clause
#[derive(Debug, Clone)]
pub enum Metric {
    Degree {
        filter: Option<Expression>,
    },
    InDegree {
        filter: Option<Expression>,
        normalized: bool,
    },
    OutDegree {
        filter: Option<Expression>,
    },
    PathLength {
        start: Expression,
        filter: Option<Expression>,
        length: Option<Identifier>,
        directed: bool,
        config: ShortestPathConfig,
    },
    Eigenvector {
        filter: Option<Expression>,
        length: Option<Identifier>,
        config: EigenvectorConfig,
    },
    Betweenness {
        filter: Option<Expression>,
        length: Option<Identifier>,
        config: BetweennessConfig,
    },
}

impl Metric {
    /// Name of the property the metric writes
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Degree { .. } => "degree",
            Metric::InDegree { .. } => "in_degree",
            Metric::OutDegree { .. } => "out_degree",
            Metric::PathLength { .. } => "pathLength",
            Metric::Eigenvector { .. } => "eigenvector",
            Metric::Betweenness { .. } => "betweenness",
        }
    }

    /// Annotate every vertex. Graphs without vertices or edges pass through untouched.
    pub fn calculate(&self, mut graph: PropertyGraph) -> PropertyGraph {
        if graph.vertex_count() == 0 || graph.edge_count() == 0 {
            return graph;
        }
        debug!(
            "Calculating {} over {} vertices, {} edges",
            self.name(),
            graph.vertex_count(),
            graph.edge_count()
        );

        match self {
            Metric::Degree { filter } => {
                let view = build_view(&graph, filter.as_ref(), None, false);
                write_counts(&mut graph, "degree", degree_counts(&view, Direction::Both));
            }
            Metric::OutDegree { filter } => {
                let view = build_view(&graph, filter.as_ref(), None, false);
                write_counts(&mut graph, "out_degree", degree_counts(&view, Direction::Outgoing));
            }
            Metric::InDegree { filter, normalized } => {
                let view = build_view(&graph, filter.as_ref(), None, false);
                let counts = degree_counts(&view, Direction::Incoming);
                if *normalized {
                    let max = counts.iter().copied().max().unwrap_or(0);
                    for (vertex, count) in graph.vertices_mut().iter_mut().zip(counts) {
                        let value = if max == 0 { 0.0 } else { count as f64 / max as f64 };
                        vertex.props.insert("in_degree", value);
                    }
                } else {
                    write_counts(&mut graph, "in_degree", counts);
                }
            }
            Metric::PathLength {
                start,
                filter,
                length,
                directed,
                config,
            } => {
                let sources: Vec<usize> = (0..graph.vertex_count())
                    .filter(|&idx| start.evaluate(EvalContext::vertex(&graph, idx)))
                    .collect();
                let view = build_view(&graph, filter.as_ref(), length.as_ref(), !directed);
                let trees = shortest_path_tree(&view, &sources, config);

                for (vertex, tree) in graph.vertices_mut().iter_mut().zip(trees) {
                    let Some(tree) = tree else {
                        continue;
                    };
                    vertex.props.insert("pathLength", tree.distance);
                    if !tree.predecessors.is_empty() {
                        let next = tree
                            .predecessors
                            .iter()
                            .map(|&p| PropertyValue::Integer(p as i64))
                            .collect::<Vec<_>>();
                        vertex.props.insert("pathNext", next);
                    }
                }
            }
            Metric::Eigenvector {
                filter,
                length,
                config,
            } => {
                let view = build_view(&graph, filter.as_ref(), length.as_ref(), false);
                match eigenvector_centrality(&view, config) {
                    Some(scores) => write_scores(&mut graph, "eigenvector", scores),
                    None => warn!(
                        "Eigenvector centrality did not converge within {} iterations",
                        config.iterations
                    ),
                }
            }
            Metric::Betweenness {
                filter,
                length,
                config,
            } => {
                let view = build_view(&graph, filter.as_ref(), length.as_ref(), false);
                write_scores(&mut graph, "betweenness", betweenness_centrality(&view, config));
            }
        }
        graph
    }
}

fn write_counts(graph: &mut PropertyGraph, name: &str, counts: Vec<usize>) {
    for (vertex, count) in graph.vertices_mut().iter_mut().zip(counts) {
        vertex.props.insert(name, count as i64);
    }
}

fn write_scores(graph: &mut PropertyGraph, name: &str, scores: Vec<f64>) {
    for (vertex, score) in graph.vertices_mut().iter_mut().zip(scores) {
        vertex.props.insert(name, score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Vertex, VertexId};
    use crate::query::ast::ValueOp;

    fn sample() -> PropertyGraph {
        // 0->1 Cooperation, 0->2 Knowledge, 2->0 Knowledge
        let vertices = (1..=3).map(|n| Vertex::new(VertexId::from_ordinal(n))).collect();
        let mut edges = vec![
            Edge::new(0, 1, "Cooperation"),
            Edge::new(0, 2, "Knowledge"),
            Edge::new(2, 0, "Knowledge"),
        ];
        edges[1].props.insert("weight", "2.5");
        PropertyGraph::from_parts(vertices, edges).unwrap()
    }

    fn named(name: &str) -> Expression {
        Expression::compare(
            Identifier::Prop("name".into()),
            ValueOp::Eq,
            Identifier::Literal(name.into()),
        )
    }

    fn ints(graph: &PropertyGraph, prop: &str) -> Vec<Option<i64>> {
        graph
            .vertices()
            .iter()
            .map(|v| v.props.get(prop).and_then(PropertyValue::as_integer))
            .collect()
    }

    #[test]
    fn test_degree_family() {
        let graph = Metric::Degree { filter: None }.calculate(sample());
        assert_eq!(ints(&graph, "degree"), vec![Some(3), Some(1), Some(2)]);

        let graph = Metric::OutDegree { filter: Some(named("Knowledge")) }.calculate(sample());
        assert_eq!(ints(&graph, "out_degree"), vec![Some(1), Some(0), Some(1)]);

        let graph = Metric::InDegree { filter: None, normalized: false }.calculate(sample());
        assert_eq!(ints(&graph, "in_degree"), vec![Some(1), Some(1), Some(1)]);
    }

    #[test]
    fn test_normalized_in_degree() {
        let graph = Metric::InDegree { filter: Some(named("Knowledge")), normalized: true }.calculate(sample());
        let values: Vec<f64> = graph
            .vertices()
            .iter()
            .map(|v| v.props.get("in_degree").and_then(PropertyValue::as_f64).unwrap())
            .collect();
        assert_eq!(values, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_edge_weight_parsing() {
        let graph = sample();
        let weight = Identifier::Prop("weight".into());
        assert_eq!(edge_weight(&graph, 1, Some(&weight)), 2.5);
        assert_eq!(edge_weight(&graph, 0, Some(&weight)), 1.0);
        assert_eq!(edge_weight(&graph, 1, None), 1.0);
    }

    #[test]
    fn test_non_finite_weights_fall_back_to_one() {
        let vertices = (1..=2).map(|n| Vertex::new(VertexId::from_ordinal(n))).collect();
        let mut edges = vec![Edge::new(0, 1, "Knowledge"), Edge::new(1, 0, "Knowledge"), Edge::new(0, 1, "Cooperation")];
        edges[0].props.insert("weight", "NaN");
        edges[1].props.insert("weight", "inf");
        edges[2].props.insert("weight", f64::NEG_INFINITY);
        let graph = PropertyGraph::from_parts(vertices, edges).unwrap();

        let weight = Identifier::Prop("weight".into());
        for edge in 0..3 {
            assert_eq!(edge_weight(&graph, edge, Some(&weight)), 1.0);
        }

        let start = Expression::compare(
            Identifier::Prop("id".into()),
            ValueOp::Eq,
            Identifier::Literal(VertexId::from_ordinal(1).to_string().into()),
        );
        let metric = Metric::PathLength {
            start,
            filter: None,
            length: Some(weight),
            directed: true,
            config: ShortestPathConfig::default(),
        };
        let graph = metric.calculate(graph);
        assert_eq!(graph.vertices()[1].props.get("pathLength"), Some(&PropertyValue::Float(1.0)));
    }

    #[test]
    fn test_undirected_view_doubles_edges() {
        let graph = sample();
        let view = build_view(&graph, Some(&named("Knowledge")), None, true);
        assert_eq!(view.edge_count(), 4);
        assert_eq!(view.successors(0), &[2, 2]);
    }

    #[test]
    fn test_path_length() {
        let start = Expression::compare(
            Identifier::Prop("id".into()),
            ValueOp::Eq,
            Identifier::Literal(VertexId::from_ordinal(2).to_string().into()),
        );
        let metric = Metric::PathLength {
            start,
            filter: None,
            length: None,
            directed: false,
            config: ShortestPathConfig::default(),
        };
        let graph = metric.calculate(sample());
        let v = graph.vertices();
        assert_eq!(v[1].props.get("pathLength"), Some(&PropertyValue::Float(0.0)));
        assert!(v[1].props.get("pathNext").is_none());
        assert_eq!(v[0].props.get("pathLength"), Some(&PropertyValue::Float(1.0)));
        assert_eq!(v[0].props.get("pathNext"), Some(&PropertyValue::Array(vec![PropertyValue::Integer(1)])));
        assert_eq!(v[2].props.get("pathLength"), Some(&PropertyValue::Float(2.0)));
    }

    #[test]
    fn test_directed_path_length_leaves_unreached_vertices() {
        let start = Expression::compare(
            Identifier::Prop("id".into()),
            ValueOp::Eq,
            Identifier::Literal(VertexId::from_ordinal(2).to_string().into()),
        );
        let metric = Metric::PathLength {
            start,
            filter: None,
            length: None,
            directed: true,
            config: ShortestPathConfig::default(),
        };
        let graph = metric.calculate(sample());
        assert!(graph.vertices()[0].props.get("pathLength").is_none());
        assert!(graph.vertices()[2].props.get("pathLength").is_none());
    }

    #[test]
    fn test_metrics_skip_edgeless_graphs() {
        let graph = PropertyGraph::from_parts(vec![Vertex::new(VertexId::from_ordinal(1))], vec![]).unwrap();
        let graph = Metric::Degree { filter: None }.calculate(graph);
        assert!(graph.vertices()[0].props.is_empty());
    }

    #[test]
    fn test_betweenness_writes_every_vertex() {
        let graph = Metric::Betweenness {
            filter: None,
            length: None,
            config: BetweennessConfig::default(),
        }
        .calculate(sample());
        assert!(graph.vertices().iter().all(|v| v.props.contains_key("betweenness")));
        // 1 is reached from 2 only through 0
        let top = graph.vertices()[0].props.get("betweenness").and_then(PropertyValue::as_f64);
        assert_eq!(top, Some(1.0));
    }
}
