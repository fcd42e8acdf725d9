//! Query clauses
//!
//! Every clause consumes a graph and returns the transformed graph. A
//! compiled statement folds its clauses in a fixed order:
//! WHERE, CALCULATE, SELECT, GROUP BY, LAYOUT.

pub mod calculate;
pub mod group_by;
pub mod layout;
pub mod select;
pub mod where_clause;

pub use calculate::CalculateClause;
pub use group_by::GroupByClause;
pub use layout::LayoutClause;
pub use select::SelectClause;
pub use where_clause::WhereClause;

use crate::graph::PropertyGraph;

/// A pipeline stage over a graph snapshot
pub trait GraphTransform {
    fn transform(&self, graph: PropertyGraph) -> PropertyGraph;
}

/// One compiled `SELECT ...` statement
#[derive(Debug, Clone, Default)]
pub struct CompiledStatement {
    pub where_clause: Option<WhereClause>,
    pub select: Option<SelectClause>,
    pub calculate: Option<CalculateClause>,
    pub group_by: Option<GroupByClause>,
    pub layout: Option<LayoutClause>,
}

impl GraphTransform for CompiledStatement {
    fn transform(&self, graph: PropertyGraph) -> PropertyGraph {
        let stages: [Option<&dyn GraphTransform>; 5] = [
            self.where_clause.as_ref().map(|c| c as &dyn GraphTransform),
            self.calculate.as_ref().map(|c| c as &dyn GraphTransform),
            self.select.as_ref().map(|c| c as &dyn GraphTransform),
            self.group_by.as_ref().map(|c| c as &dyn GraphTransform),
            self.layout.as_ref().map(|c| c as &dyn GraphTransform),
        ];
        let mut graph = stages
            .into_iter()
            .flatten()
            .fold(graph, |graph, stage| stage.transform(graph));
        graph.compact();
        graph
    }
}
