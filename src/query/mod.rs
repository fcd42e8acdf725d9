//! Query processing module
//!
//! Implements the network query language:
//! - `SELECT` projection of vertex columns and edge relationships
//! - `WHERE` vertex filtering with edge traversal predicates
//! - `CALCULATE` metrics (degree family, centralities, path length)
//! - `GROUP BY` collapsing and `LAYOUT` settings
//!
//! Text compiles to a list of statements; each statement folds its clauses
//! over a graph snapshot, and statements run in order.

pub mod ast;
pub mod clause;
pub mod eval;
pub mod parser;

// Re-export main types
pub use clause::{CompiledStatement, GraphTransform};
pub use parser::{compile, compile_with, SyntaxError, SyntaxResult};

use crate::algo::MetricSettings;
use crate::cache::{CacheError, GraphCache};
use crate::config::EngineConfig;
use crate::graph::{NetworkId, PropertyGraph};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Run compiled statements over a graph, in order
pub fn run_statements(statements: &[CompiledStatement], graph: PropertyGraph) -> PropertyGraph {
    statements
        .iter()
        .fold(graph, |graph, statement| statement.transform(graph))
}

/// Query engine - compiles (with memoization) and runs queries
pub struct QueryEngine {
    settings: MetricSettings,
    compiled: Mutex<LruCache<String, Arc<Vec<CompiledStatement>>>>,
}

impl QueryEngine {
    /// Create an engine remembering up to `capacity` compiled queries
    pub fn new(capacity: usize, settings: MetricSettings) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            settings,
            compiled: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.compiled_query_cache_size, config.metric_settings())
    }

    /// Compile query text, reusing an earlier compilation of the same text
    pub fn compile(&self, text: &str) -> SyntaxResult<Arc<Vec<CompiledStatement>>> {
        if let Some(statements) = self.lock().get(text) {
            return Ok(Arc::clone(statements));
        }

        let statements = compile_with(text, &self.settings).map_err(|e| {
            debug!("Query failed to compile: {}", e);
            e
        })?;
        let statements = Arc::new(statements);
        self.lock().put(text.to_string(), Arc::clone(&statements));
        Ok(statements)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<Vec<CompiledStatement>>>> {
        // the cache holds only finished compilations, so a poisoned lock is still usable
        self.compiled.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run query text over a caller-supplied graph
    pub fn run(&self, text: &str, graph: PropertyGraph) -> SyntaxResult<PropertyGraph> {
        let statements = self.compile(text)?;
        Ok(run_statements(&statements, graph))
    }

    /// Run query text over a snapshot of the cached (network, locale) graph
    pub async fn execute(
        &self,
        cache: &GraphCache,
        network: NetworkId,
        locale: &str,
        text: &str,
    ) -> QueryResult<PropertyGraph> {
        let statements = self.compile(text)?;
        let snapshot = cache.snapshot(network, locale).await?;
        debug!(
            "Running {} statement(s) over {} vertices, {} edges",
            statements.len(),
            snapshot.vertex_count(),
            snapshot.edge_count()
        );
        Ok(run_statements(&statements, snapshot))
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, PropertyValue, Vertex, VertexId};

    fn graph() -> PropertyGraph {
        let vertices = (1..=3)
            .map(|n| {
                let mut vertex = Vertex::new(VertexId::from_ordinal(n));
                vertex.props.insert("Dept", if n == 1 { "IT" } else { "HR" });
                vertex
            })
            .collect();
        let edges = vec![Edge::new(0, 1, "Cooperation"), Edge::new(0, 2, "Knowledge"), Edge::new(2, 1, "Knowledge")];
        PropertyGraph::from_parts(vertices, edges).unwrap()
    }

    #[test]
    fn test_compilations_are_memoized() {
        let engine = QueryEngine::default();
        let first = engine.compile("SELECT * CALCULATE degree").unwrap();
        let second = engine.compile("SELECT * CALCULATE degree").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(engine.compile("SELECT").is_err());
    }

    #[test]
    fn test_statements_run_in_order() {
        let engine = QueryEngine::new(1, MetricSettings::default());
        let result = engine
            .run("SELECT * WHERE Dept = 'HR' CALCULATE degree SELECT degree AS d", graph())
            .unwrap();
        assert_eq!(result.vertex_count(), 2);
        // the last SELECT names no relationship, so edges are dropped
        assert_eq!(result.edge_count(), 0);
        let degrees: Vec<_> = result.vertices().iter().map(|v| v.props.get("d").cloned()).collect();
        assert_eq!(degrees, vec![Some(PropertyValue::Integer(1)), Some(PropertyValue::Integer(1))]);
    }

    #[test]
    fn test_capacity_zero_still_works() {
        let engine = QueryEngine::new(0, MetricSettings::default());
        assert!(engine.run("select *", graph()).is_ok());
    }
}
