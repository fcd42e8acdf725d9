//! Abstract syntax tree for compiled queries
//!
//! Expressions and identifiers are immutable once compiled and are shared
//! between concurrent executions of the same query.

use crate::graph::PropertyValue;
use regex::Regex;

/// Which endpoint of the bound edge a cross-edge reference reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Source,
    Target,
}

/// A value reference inside a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    /// Property of the bound edge, or of the bound vertex when no edge is bound
    Prop(String),
    /// `source.prop` / `target.prop`
    Endpoint { side: EdgeSide, prop: String },
    /// String or number literal
    Literal(PropertyValue),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    NotLike,
    Intersects,
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Which incident edges an edge traversal predicate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeScope {
    /// `edge(...)`
    All,
    /// `in_edge(...)`: edges ending at the vertex
    In,
    /// `out_edge(...)`: edges starting at the vertex
    Out,
    /// `mutual_edge(...)`: a matching edge exists in both directions
    Mutual,
}

/// Boolean expression evaluated against a vertex or an edge
#[derive(Debug, Clone)]
pub enum Expression {
    Bool(bool),
    Compare {
        left: Identifier,
        op: ValueOp,
        right: Identifier,
        /// LIKE pattern compiled ahead of time when the right side is a string literal
        pattern: Option<Regex>,
    },
    Binary {
        left: Box<Expression>,
        op: BoolOp,
        right: Box<Expression>,
    },
    Traverse {
        scope: EdgeScope,
        expr: Box<Expression>,
    },
}

impl Expression {
    pub fn compare(left: Identifier, op: ValueOp, right: Identifier) -> Self {
        let pattern = match (op, &right) {
            (ValueOp::Like | ValueOp::NotLike, Identifier::Literal(PropertyValue::String(text))) => {
                crate::query::eval::like_regex(&text.to_lowercase())
            }
            _ => None,
        };
        Expression::Compare {
            left,
            op,
            right,
            pattern,
        }
    }

    /// `any`: the bound edge is not a self-loop
    pub fn any_edge() -> Self {
        Expression::compare(
            Identifier::Endpoint {
                side: EdgeSide::Source,
                prop: "id".to_string(),
            },
            ValueOp::Ne,
            Identifier::Endpoint {
                side: EdgeSide::Target,
                prop: "id".to_string(),
            },
        )
    }
}

/// Value-producing expression of a SELECT column
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    Prop(String),
    Literal(PropertyValue),
    Union(Box<SelectExpr>, Box<SelectExpr>),
    Like(Box<SelectExpr>, Box<SelectExpr>),
}

/// One vertex-level SELECT item
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`: keep every property
    Wildcard,
    /// A computed column stored under `key`
    Column { expr: SelectExpr, key: String },
}

/// A requested edge property, optionally renamed
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePropFilter {
    pub name: String,
    pub alias: Option<String>,
}

/// Projection for one relationship name (or `*`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeProjection {
    /// `edge.R` without alias: all properties survive
    pub keep_all: bool,
    /// New relationship name
    pub rename: Option<String>,
    pub props: Vec<EdgePropFilter>,
}
