//! Expression evaluation
//!
//! Evaluation never fails: missing properties read as null, and comparisons
//! between values of incompatible types are simply false.

use super::ast::{BoolOp, EdgeScope, EdgeSide, Expression, Identifier, ValueOp};
use crate::graph::{PropertyGraph, PropertyValue};
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;

/// What an expression is evaluated against: a vertex, an edge, or neither
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'g> {
    pub graph: &'g PropertyGraph,
    pub vertex: Option<usize>,
    pub edge: Option<usize>,
}

impl<'g> EvalContext<'g> {
    pub fn vertex(graph: &'g PropertyGraph, position: usize) -> Self {
        EvalContext {
            graph,
            vertex: Some(position),
            edge: None,
        }
    }

    pub fn edge(graph: &'g PropertyGraph, position: usize) -> Self {
        EvalContext {
            graph,
            vertex: None,
            edge: Some(position),
        }
    }
}

static NULL: PropertyValue = PropertyValue::Null;

impl Identifier {
    pub fn evaluate<'a>(&'a self, ctx: EvalContext<'a>) -> Cow<'a, PropertyValue> {
        match self {
            Identifier::Literal(value) => Cow::Borrowed(value),
            Identifier::Prop(name) => prop_value(name, ctx),
            Identifier::Endpoint { side, prop } => {
                let Some(edge) = ctx.edge.and_then(|idx| ctx.graph.edges().get(idx)) else {
                    return Cow::Borrowed(&NULL);
                };
                let position = match side {
                    EdgeSide::Source => edge.source,
                    EdgeSide::Target => edge.target,
                };
                prop_value(prop, EvalContext::vertex(ctx.graph, position))
            }
        }
    }
}

fn prop_value<'a>(name: &str, ctx: EvalContext<'a>) -> Cow<'a, PropertyValue> {
    if name.eq_ignore_ascii_case("null") {
        return Cow::Borrowed(&NULL);
    }
    if let Some(edge) = ctx.edge.and_then(|idx| ctx.graph.edges().get(idx)) {
        if name.eq_ignore_ascii_case("name") {
            return Cow::Owned(PropertyValue::String(edge.name.clone()));
        }
        return edge.props.get(name).map_or(Cow::Borrowed(&NULL), Cow::Borrowed);
    }
    if let Some(vertex) = ctx.vertex.and_then(|idx| ctx.graph.vertices().get(idx)) {
        if name.eq_ignore_ascii_case("id") {
            return Cow::Owned(PropertyValue::String(vertex.id.to_string()));
        }
        return vertex.props.get(name).map_or(Cow::Borrowed(&NULL), Cow::Borrowed);
    }
    Cow::Borrowed(&NULL)
}

impl Expression {
    pub fn evaluate(&self, ctx: EvalContext<'_>) -> bool {
        match self {
            Expression::Bool(value) => *value,
            Expression::Binary { left, op, right } => match op {
                BoolOp::And => left.evaluate(ctx) && right.evaluate(ctx),
                BoolOp::Or => left.evaluate(ctx) || right.evaluate(ctx),
            },
            Expression::Compare {
                left,
                op,
                right,
                pattern,
            } => {
                let left = left.evaluate(ctx);
                let right = right.evaluate(ctx);
                compare(*op, &left, &right, pattern.as_ref())
            }
            Expression::Traverse { scope, expr } => traverse(*scope, expr, ctx),
        }
    }
}

fn traverse(scope: EdgeScope, expr: &Expression, ctx: EvalContext<'_>) -> bool {
    let Some(vertex) = ctx.vertex else {
        return false;
    };
    let graph = ctx.graph;
    let matches = |idx: usize| expr.evaluate(EvalContext::edge(graph, idx));

    let mut incident = graph.incident_edges(vertex);
    match scope {
        EdgeScope::All => incident.any(|(idx, _)| matches(idx)),
        EdgeScope::In => incident.any(|(idx, edge)| edge.target == vertex && matches(idx)),
        EdgeScope::Out => incident.any(|(idx, edge)| edge.source == vertex && matches(idx)),
        EdgeScope::Mutual => incident.any(|(idx, edge)| {
            matches(idx)
                && graph.incident_edges(vertex).any(|(back_idx, back)| {
                    back.source == edge.target && back.target == edge.source && matches(back_idx)
                })
        }),
    }
}

/// Compare two values. An array operand matches when any of its elements does;
/// elements of a right-hand array are compared with the operands swapped.
pub fn compare(op: ValueOp, left: &PropertyValue, right: &PropertyValue, pattern: Option<&Regex>) -> bool {
    if let PropertyValue::Array(items) = left {
        return items.iter().any(|item| compare_single(op, item, right, pattern));
    }
    if let PropertyValue::Array(items) = right {
        return items.iter().any(|item| compare_single(op, item, left, None));
    }
    compare_single(op, left, right, pattern)
}

fn compare_single(op: ValueOp, left: &PropertyValue, right: &PropertyValue, pattern: Option<&Regex>) -> bool {
    match op {
        ValueOp::Eq => values_equal(left, right),
        ValueOp::Ne => !values_equal(left, right),
        ValueOp::Gt => left.numeric_cmp(right) == Some(Ordering::Greater),
        ValueOp::Lt => left.numeric_cmp(right) == Some(Ordering::Less),
        ValueOp::Ge => matches!(left.numeric_cmp(right), Some(Ordering::Greater | Ordering::Equal)),
        ValueOp::Le => matches!(left.numeric_cmp(right), Some(Ordering::Less | Ordering::Equal)),
        ValueOp::Like => like_match(left, right, pattern) == Some(true),
        ValueOp::NotLike => like_match(left, right, pattern) == Some(false),
        ValueOp::Intersects => intersects(left, right),
    }
}

fn values_equal(left: &PropertyValue, right: &PropertyValue) -> bool {
    (left.is_null() && right.is_null()) || (!left.is_null() && left.loose_eq(right))
}

/// Case-insensitive LIKE; `None` when either side is not a string
fn like_match(left: &PropertyValue, right: &PropertyValue, pattern: Option<&Regex>) -> Option<bool> {
    let text = left.as_string()?.to_lowercase();
    let compiled;
    let regex = match pattern {
        Some(regex) => regex,
        None => {
            compiled = like_regex(&right.as_string()?.to_lowercase())?;
            &compiled
        }
    };
    Some(regex.is_match(&text))
}

/// Membership of `left` in the JSON array rendered by `right`, or plain
/// equality when `right` does not look like an array
fn intersects(left: &PropertyValue, right: &PropertyValue) -> bool {
    if left.is_null() {
        return false;
    }
    let text = right.plain_text();
    if text.starts_with('[') && text.ends_with(']') {
        if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(&text) {
            return items
                .into_iter()
                .any(|item| PropertyValue::from(item).loose_eq(left));
        }
    }
    left.loose_eq(right)
}

/// Anchored regular expression for an SQL LIKE pattern: `%` matches any run,
/// `_` any single character
pub fn like_regex(pattern: &str) -> Option<Regex> {
    let body = regex::escape(pattern).replace('_', ".").replace('%', ".*");
    Regex::new(&format!("(?s)^{}$", body)).ok()
}

/// Case-sensitive LIKE over plain text
pub fn sql_like(text: &str, pattern: &str) -> bool {
    like_regex(pattern).is_some_and(|regex| regex.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, PropertyMap, Vertex, VertexId};

    fn graph() -> PropertyGraph {
        let mut vertices: Vec<Vertex> = (1..=3).map(|n| Vertex::new(VertexId::from_ordinal(n))).collect();
        vertices[0].props.insert("Dept", "IT");
        vertices[0].props.insert("Age", 30);
        vertices[1].props.insert("Dept", PropertyValue::Array(vec!["Marketing".into(), "Sales".into()]));
        let mut props = PropertyMap::new();
        props.insert("Frequency", 3);
        let edges = vec![
            Edge::with_props(0, 1, "Cooperation", props),
            Edge::new(1, 0, "Cooperation"),
            Edge::new(2, 0, "Knowledge"),
        ];
        PropertyGraph::from_parts(vertices, edges).unwrap()
    }

    fn prop(name: &str) -> Identifier {
        Identifier::Prop(name.to_string())
    }

    fn lit(value: impl Into<PropertyValue>) -> Identifier {
        Identifier::Literal(value.into())
    }

    #[test]
    fn test_vertex_and_edge_identifiers() {
        let g = graph();
        assert_eq!(*prop("dept").evaluate(EvalContext::vertex(&g, 0)), PropertyValue::from("IT"));
        assert_eq!(
            *prop("id").evaluate(EvalContext::vertex(&g, 0)),
            PropertyValue::from("00000001-0000-0000-0000-000000000000")
        );
        assert!(prop("missing").evaluate(EvalContext::vertex(&g, 0)).is_null());
        assert_eq!(*prop("name").evaluate(EvalContext::edge(&g, 2)), PropertyValue::from("Knowledge"));
        assert_eq!(*prop("frequency").evaluate(EvalContext::edge(&g, 0)), PropertyValue::Integer(3));

        let target_dept = Identifier::Endpoint { side: EdgeSide::Target, prop: "Dept".into() };
        assert_eq!(*target_dept.evaluate(EvalContext::edge(&g, 2)), PropertyValue::from("IT"));
        assert!(target_dept.evaluate(EvalContext::vertex(&g, 0)).is_null());
    }

    #[test]
    fn test_comparisons_degrade_to_false() {
        let g = graph();
        let ctx = EvalContext::vertex(&g, 0);
        assert!(Expression::compare(prop("Age"), ValueOp::Gt, lit(29.5)).evaluate(ctx));
        assert!(Expression::compare(prop("Age"), ValueOp::Eq, lit(30.0)).evaluate(ctx));
        assert!(!Expression::compare(prop("Dept"), ValueOp::Gt, lit(1)).evaluate(ctx));
        assert!(Expression::compare(prop("missing"), ValueOp::Eq, prop("null")).evaluate(ctx));
        assert!(Expression::compare(prop("missing"), ValueOp::Ne, lit("x")).evaluate(ctx));
    }

    #[test]
    fn test_array_operands() {
        let g = graph();
        let ctx = EvalContext::vertex(&g, 1);
        assert!(Expression::compare(prop("Dept"), ValueOp::Eq, lit("Sales")).evaluate(ctx));
        assert!(!Expression::compare(prop("Dept"), ValueOp::Eq, lit("IT")).evaluate(ctx));
        // right-hand arrays swap operands
        assert!(Expression::compare(lit("Sales"), ValueOp::Eq, prop("Dept")).evaluate(ctx));
    }

    #[test]
    fn test_like() {
        let g = graph();
        let ctx = EvalContext::vertex(&g, 0);
        assert!(Expression::compare(prop("Dept"), ValueOp::Like, lit("i%")).evaluate(ctx));
        assert!(Expression::compare(prop("Dept"), ValueOp::Like, lit("_T")).evaluate(ctx));
        assert!(!Expression::compare(prop("Dept"), ValueOp::Like, lit("I")).evaluate(ctx));
        assert!(Expression::compare(prop("Dept"), ValueOp::NotLike, lit("x%")).evaluate(ctx));
        assert!(!Expression::compare(prop("Age"), ValueOp::NotLike, lit("x%")).evaluate(ctx));
        assert!(!Expression::compare(prop("Dept"), ValueOp::Like, lit(1)).evaluate(ctx));
        assert!(sql_like("a.b", "a.b"));
        assert!(!sql_like("axb", "a.b"));
        assert!(sql_like("line\nbreak", "line%"));
    }

    #[test]
    fn test_intersects() {
        let g = graph();
        let set = lit(r#"["Marketing","Accounting"]"#);
        assert!(!Expression::compare(prop("Dept"), ValueOp::Intersects, set.clone())
            .evaluate(EvalContext::vertex(&g, 0)));
        assert!(Expression::compare(prop("Dept"), ValueOp::Intersects, set.clone())
            .evaluate(EvalContext::vertex(&g, 1)));
        assert!(!Expression::compare(prop("Dept"), ValueOp::Intersects, set)
            .evaluate(EvalContext::vertex(&g, 2)));
        // not an array: plain equality
        assert!(Expression::compare(prop("Dept"), ValueOp::Intersects, lit("IT"))
            .evaluate(EvalContext::vertex(&g, 0)));
        assert!(!Expression::compare(prop("Dept"), ValueOp::Intersects, lit("[broken"))
            .evaluate(EvalContext::vertex(&g, 0)));
    }

    #[test]
    fn test_edge_traversal() {
        let g = graph();
        let coop = Expression::compare(prop("name"), ValueOp::Eq, lit("Cooperation"));
        let know = Expression::compare(prop("name"), ValueOp::Eq, lit("Knowledge"));
        let traverse = |scope, expr: &Expression| Expression::Traverse { scope, expr: Box::new(expr.clone()) };

        assert!(traverse(EdgeScope::Mutual, &coop).evaluate(EvalContext::vertex(&g, 0)));
        assert!(!traverse(EdgeScope::Mutual, &know).evaluate(EvalContext::vertex(&g, 0)));
        assert!(traverse(EdgeScope::In, &know).evaluate(EvalContext::vertex(&g, 0)));
        assert!(!traverse(EdgeScope::Out, &know).evaluate(EvalContext::vertex(&g, 0)));
        assert!(traverse(EdgeScope::Out, &know).evaluate(EvalContext::vertex(&g, 2)));
        assert!(traverse(EdgeScope::All, &Expression::any_edge()).evaluate(EvalContext::vertex(&g, 2)));
        assert!(!traverse(EdgeScope::All, &coop).evaluate(EvalContext::edge(&g, 0)));
    }
}
