//! Query compiler using Pest
//!
//! Turns query text into a list of compiled statements. Every failure is a
//! [`SyntaxError`] carrying the 1-based line and column it was found at.

use super::ast::*;
use super::clause::{
    CalculateClause, CompiledStatement, GroupByClause, LayoutClause, SelectClause, WhereClause,
};
use crate::algo::{Metric, MetricSettings};
use crate::graph::{LayoutSettings, PropertyValue};
use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/grammar.pest"]
struct QueryParser;

static EXPRESSION_PARSER: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
});

static SELECT_PARSER: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new().op(Op::infix(Rule::union_op, Assoc::Left) | Op::infix(Rule::like_op, Assoc::Left))
});

/// Query text that does not compile
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (line {line}, column {column})")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        SyntaxError {
            message: message.into(),
            line,
            column,
        }
    }

    fn at(pair: &Pair<'_, Rule>, message: impl Into<String>) -> Self {
        let (line, column) = pair.as_span().start_pos().line_col();
        SyntaxError::new(message, line, column)
    }
}

impl From<pest::error::Error<Rule>> for SyntaxError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        let err = err.renamed_rules(describe_rule);
        SyntaxError::new(err.variant.message(), line, column)
    }
}

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of query".to_string(),
        Rule::SELECT => "SELECT".to_string(),
        Rule::WHERE => "WHERE".to_string(),
        Rule::CALCULATE => "CALCULATE".to_string(),
        Rule::GROUP_BY => "GROUP BY".to_string(),
        Rule::LAYOUT => "LAYOUT".to_string(),
        Rule::AS => "AS".to_string(),
        Rule::plain_name | Rule::bracket_name | Rule::quoted_name | Rule::name => "name".to_string(),
        Rule::value_op | Rule::cmp_symbol => "comparison operator".to_string(),
        Rule::and_op | Rule::or_op => "AND or OR".to_string(),
        other => format!("{:?}", other),
    }
}

pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Compile query text with default algorithm settings
pub fn compile(text: &str) -> SyntaxResult<Vec<CompiledStatement>> {
    compile_with(text, &MetricSettings::default())
}

/// Compile query text; metrics pick up `settings`
pub fn compile_with(text: &str, settings: &MetricSettings) -> SyntaxResult<Vec<CompiledStatement>> {
    if text.trim().is_empty() {
        return Err(SyntaxError::new("Query is an empty string", 1, 1));
    }

    let mut pairs = QueryParser::parse(Rule::program, text)?;
    let Some(program) = pairs.next() else {
        return Err(SyntaxError::new("Query is an empty string", 1, 1));
    };

    program
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::statement)
        .map(|pair| compile_statement(pair, settings))
        .collect()
}

fn child<'i>(pairs: &mut Pairs<'i, Rule>, parent: &Pair<'i, Rule>, what: &str) -> SyntaxResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| SyntaxError::at(parent, format!("Missing {}", what)))
}

fn compile_statement(pair: Pair<'_, Rule>, settings: &MetricSettings) -> SyntaxResult<CompiledStatement> {
    let mut statement = CompiledStatement::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::select_list => statement.select = Some(compile_select(inner)?),
            Rule::where_clause => {
                let expr = last_of(inner, Rule::expression, "condition")?;
                statement.where_clause = Some(WhereClause::new(compile_expression(expr)?));
            }
            Rule::calculate_clause => {
                let metrics = inner
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::metric)
                    .map(|p| compile_metric(p, settings))
                    .collect::<SyntaxResult<Vec<_>>>()?;
                statement.calculate = Some(CalculateClause { metrics });
            }
            Rule::group_by_clause => {
                let name = last_of(inner, Rule::name, "grouping property")?;
                statement.group_by = Some(GroupByClause::new(name_text(&name)));
            }
            Rule::layout_clause => statement.layout = Some(compile_layout(inner)?),
            _ => {}
        }
    }
    Ok(statement)
}

fn last_of<'i>(pair: Pair<'i, Rule>, rule: Rule, what: &str) -> SyntaxResult<Pair<'i, Rule>> {
    pair.clone()
        .into_inner()
        .filter(|p| p.as_rule() == rule)
        .last()
        .ok_or_else(|| SyntaxError::at(&pair, format!("Missing {}", what)))
}

// ---------------------------------------------------------------------------
// Names and literals

/// Text of a `name`, with brackets or quotes stripped
fn name_text(pair: &Pair<'_, Rule>) -> String {
    let Some(inner) = pair.clone().into_inner().next() else {
        return pair.as_str().to_string();
    };
    match inner.as_rule() {
        Rule::bracket_name | Rule::quoted_name => inner
            .into_inner()
            .next()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default(),
        _ => inner.as_str().to_string(),
    }
}

fn string_value(pair: &Pair<'_, Rule>) -> String {
    pair.clone()
        .into_inner()
        .next()
        .map(|p| p.as_str().replace("''", "'"))
        .unwrap_or_default()
}

fn number_value(pair: &Pair<'_, Rule>) -> SyntaxResult<PropertyValue> {
    let text = pair.as_str();
    let value = if text.contains('.') {
        text.parse::<f64>().map(PropertyValue::Float).ok()
    } else {
        text.parse::<i64>().map(PropertyValue::Integer).ok()
    };
    value.ok_or_else(|| SyntaxError::at(pair, format!("Invalid number: {}", text)))
}

// ---------------------------------------------------------------------------
// SELECT

enum Segment {
    Wildcard,
    Name(String),
}

impl Segment {
    fn text(&self) -> &str {
        match self {
            Segment::Wildcard => "*",
            Segment::Name(name) => name,
        }
    }

    fn is_edge(&self) -> bool {
        matches!(self, Segment::Name(name) if name.eq_ignore_ascii_case("edge") || name.eq_ignore_ascii_case("edges"))
    }
}

fn segments(path: &Pair<'_, Rule>) -> Vec<Segment> {
    path.clone()
        .into_inner()
        .filter_map(|segment| segment.into_inner().next())
        .map(|inner| match inner.as_rule() {
            Rule::wildcard => Segment::Wildcard,
            _ => Segment::Name(name_text(&inner)),
        })
        .collect()
}

fn compile_select(pair: Pair<'_, Rule>) -> SyntaxResult<SelectClause> {
    let mut select = SelectClause::default();

    for prop in pair.into_inner().filter(|p| p.as_rule() == Rule::select_prop) {
        let mut inner = prop.clone().into_inner();
        let expr = child(&mut inner, &prop, "select expression")?;
        let alias = inner.find(|p| p.as_rule() == Rule::name).map(|p| name_text(&p));

        let atoms: Vec<Pair<'_, Rule>> = expr.clone().into_inner().collect();
        match atoms.as_slice() {
            [path] if path.as_rule() == Rule::path => compile_path(path, alias, &mut select)?,
            _ => {
                let key = alias.unwrap_or_else(|| expr.as_str().trim().to_string());
                let expr = compile_select_expr(expr)?;
                select.items.push(SelectItem::Column { expr, key });
            }
        }
    }
    Ok(select)
}

fn compile_path(path: &Pair<'_, Rule>, alias: Option<String>, select: &mut SelectClause) -> SyntaxResult<()> {
    match segments(path).as_slice() {
        [Segment::Wildcard] => select.items.push(SelectItem::Wildcard),
        [Segment::Name(name)] => select.items.push(SelectItem::Column {
            expr: SelectExpr::Prop(name.clone()),
            key: alias.unwrap_or_else(|| name.clone()),
        }),
        [first, relationship] if first.is_edge() => {
            let projection = select.edge_projection(relationship.text());
            match alias {
                Some(alias) => projection.rename = Some(alias),
                None => projection.keep_all = true,
            }
        }
        [first, relationship, prop] if first.is_edge() => {
            let projection = select.edge_projection(relationship.text());
            match prop {
                Segment::Wildcard => projection.keep_all = true,
                Segment::Name(name) => {
                    if name.eq_ignore_ascii_case("name") && alias.is_some() {
                        projection.rename = alias.clone();
                    }
                    projection.props.push(EdgePropFilter {
                        name: name.clone(),
                        alias,
                    });
                }
            }
        }
        _ => return Err(SyntaxError::at(path, "unknown property identifier")),
    }
    Ok(())
}

fn compile_select_expr(pair: Pair<'_, Rule>) -> SyntaxResult<SelectExpr> {
    SELECT_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::select_expr => compile_select_expr(primary),
            Rule::string => Ok(SelectExpr::Literal(PropertyValue::String(string_value(&primary)))),
            Rule::number => Ok(SelectExpr::Literal(number_value(&primary)?)),
            Rule::path => match segments(&primary).as_slice() {
                [Segment::Name(name)] => Ok(SelectExpr::Prop(name.clone())),
                _ => Err(SyntaxError::at(&primary, "unknown property identifier")),
            },
            other => Err(SyntaxError::at(&primary, format!("Unexpected {:?}", other))),
        })
        .map_infix(|left, op, right| {
            let (left, right) = (Box::new(left?), Box::new(right?));
            match op.as_rule() {
                Rule::union_op => Ok(SelectExpr::Union(left, right)),
                Rule::like_op => Ok(SelectExpr::Like(left, right)),
                other => Err(SyntaxError::at(&op, format!("Unexpected operator {:?}", other))),
            }
        })
        .parse(pair.into_inner())
}

// ---------------------------------------------------------------------------
// Expressions

fn compile_expression(pair: Pair<'_, Rule>) -> SyntaxResult<Expression> {
    EXPRESSION_PARSER
        .map_primary(compile_atom)
        .map_infix(|left, op, right| {
            let op = match op.as_rule() {
                Rule::and_op => BoolOp::And,
                Rule::or_op => BoolOp::Or,
                other => return Err(SyntaxError::at(&op, format!("Unexpected operator {:?}", other))),
            };
            Ok(Expression::Binary {
                left: Box::new(left?),
                op,
                right: Box::new(right?),
            })
        })
        .parse(pair.into_inner())
}

fn compile_atom(pair: Pair<'_, Rule>) -> SyntaxResult<Expression> {
    match pair.as_rule() {
        Rule::expression => compile_expression(pair),
        Rule::edge_traversal => {
            let mut inner = pair.clone().into_inner();
            let function = child(&mut inner, &pair, "edge function")?;
            let scope = match function.as_str().to_lowercase().as_str() {
                "edge" => EdgeScope::All,
                "in_edge" => EdgeScope::In,
                "out_edge" => EdgeScope::Out,
                "mutual_edge" => EdgeScope::Mutual,
                other => return Err(SyntaxError::at(&function, format!("invalid edge traversal expression: {}", other))),
            };
            let expr = compile_expression(child(&mut inner, &pair, "edge condition")?)?;
            Ok(Expression::Traverse {
                scope,
                expr: Box::new(expr),
            })
        }
        Rule::comparison => {
            let mut inner = pair.clone().into_inner();
            let left = compile_term(child(&mut inner, &pair, "left operand")?)?;
            let op = compile_value_op(child(&mut inner, &pair, "operator")?)?;
            let right = compile_term(child(&mut inner, &pair, "right operand")?)?;
            Ok(Expression::compare(left, op, right))
        }
        Rule::boolean_terminal => match pair.as_str().to_lowercase().as_str() {
            "any" => Ok(Expression::any_edge()),
            "true" => Ok(Expression::Bool(true)),
            _ => Ok(Expression::Bool(false)),
        },
        other => Err(SyntaxError::at(&pair, format!("unknown expression: {:?}", other))),
    }
}

fn compile_value_op(pair: Pair<'_, Rule>) -> SyntaxResult<ValueOp> {
    let Some(inner) = pair.clone().into_inner().next() else {
        return Err(SyntaxError::at(&pair, "unknown operator"));
    };
    Ok(match inner.as_rule() {
        Rule::NOT_LIKE => ValueOp::NotLike,
        Rule::LIKE => ValueOp::Like,
        Rule::INTERSECTS => ValueOp::Intersects,
        _ => match inner.as_str() {
            "=" => ValueOp::Eq,
            "!=" => ValueOp::Ne,
            ">" => ValueOp::Gt,
            "<" => ValueOp::Lt,
            ">=" => ValueOp::Ge,
            "<=" => ValueOp::Le,
            other => return Err(SyntaxError::at(&inner, format!("unknown operator: {}", other))),
        },
    })
}

fn compile_term(pair: Pair<'_, Rule>) -> SyntaxResult<Identifier> {
    let mut inner = pair.clone().into_inner();
    let value = child(&mut inner, &pair, "value")?;
    match value.as_rule() {
        Rule::string => Ok(Identifier::Literal(PropertyValue::String(string_value(&value)))),
        Rule::number => Ok(Identifier::Literal(number_value(&value)?)),
        _ => {
            let names: Vec<String> = value.clone().into_inner().map(|p| name_text(&p)).collect();
            match names.as_slice() {
                [name] => Ok(Identifier::Prop(name.clone())),
                [side, prop] if side.eq_ignore_ascii_case("source") => Ok(Identifier::Endpoint {
                    side: EdgeSide::Source,
                    prop: prop.clone(),
                }),
                [side, prop] if side.eq_ignore_ascii_case("target") => Ok(Identifier::Endpoint {
                    side: EdgeSide::Target,
                    prop: prop.clone(),
                }),
                _ => Err(SyntaxError::at(&value, "unknown identifier")),
            }
        }
    }
}

/// Text of a LAYOUT term: identifier text, unescaped string or number text
fn term_text(pair: &Pair<'_, Rule>) -> String {
    let Some(value) = pair.clone().into_inner().next() else {
        return pair.as_str().to_string();
    };
    match value.as_rule() {
        Rule::string => string_value(&value),
        Rule::identifier => {
            let names: Vec<String> = value.clone().into_inner().map(|p| name_text(&p)).collect();
            names.join(".")
        }
        _ => value.as_str().to_string(),
    }
}

// ---------------------------------------------------------------------------
// CALCULATE

fn compile_metric(pair: Pair<'_, Rule>, settings: &MetricSettings) -> SyntaxResult<Metric> {
    let mut inner = pair.clone().into_inner();
    let name_pair = child(&mut inner, &pair, "metric name")?;
    let name = name_text(&name_pair);
    let params: Vec<Pair<'_, Rule>> = inner.filter(|p| p.as_rule() == Rule::metric_param).collect();

    let expected = match name.to_lowercase().as_str() {
        "degree" | "out_degree" => 1,
        "in_degree" | "eigenvector" | "betweenness" => 2,
        "path_length" => 4,
        _ => {
            return Err(SyntaxError::at(
                &name_pair,
                format!("Invalid metric or algorithm name: {}", name),
            ))
        }
    };
    if params.len() > expected {
        return Err(SyntaxError::at(
            &params[expected],
            format!("{} takes at most {} parameters", name, expected),
        ));
    }

    let metric = match name.to_lowercase().as_str() {
        "degree" => Metric::Degree {
            filter: condition_param(params.first())?,
        },
        "out_degree" => Metric::OutDegree {
            filter: condition_param(params.first())?,
        },
        "in_degree" => Metric::InDegree {
            filter: condition_param(params.first())?,
            normalized: flag_param(params.get(1)),
        },
        "path_length" => {
            let start = condition_param(params.first())?
                .ok_or_else(|| SyntaxError::at(&pair, "path_length requires a start condition"))?;
            Metric::PathLength {
                start,
                filter: condition_param(params.get(1))?,
                length: identifier_param(params.get(2))?,
                directed: flag_param(params.get(3)),
                config: settings.path_length.clone(),
            }
        }
        "eigenvector" => Metric::Eigenvector {
            filter: condition_param(params.first())?,
            length: identifier_param(params.get(1))?,
            config: settings.eigenvector.clone(),
        },
        _ => Metric::Betweenness {
            filter: condition_param(params.first())?,
            length: identifier_param(params.get(1))?,
            config: settings.betweenness.clone(),
        },
    };
    Ok(metric)
}

fn condition_param(param: Option<&Pair<'_, Rule>>) -> SyntaxResult<Option<Expression>> {
    let Some(param) = param else {
        return Ok(None);
    };
    match param.clone().into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::expression => compile_expression(inner).map(Some),
        _ => Err(SyntaxError::at(param, "Expected a condition")),
    }
}

fn identifier_param(param: Option<&Pair<'_, Rule>>) -> SyntaxResult<Option<Identifier>> {
    let Some(param) = param else {
        return Ok(None);
    };
    match param.clone().into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::term => compile_term(inner).map(Some),
        _ => Err(SyntaxError::at(param, "Expected a property name")),
    }
}

fn flag_param(param: Option<&Pair<'_, Rule>>) -> bool {
    param.is_some_and(|p| p.as_str().trim().eq_ignore_ascii_case("true"))
}

// ---------------------------------------------------------------------------
// LAYOUT

fn compile_layout(pair: Pair<'_, Rule>) -> SyntaxResult<LayoutClause> {
    let mut settings = LayoutSettings::default();
    for setting in pair.into_inner().filter(|p| p.as_rule() == Rule::layout_setting) {
        let mut terms = setting.clone().into_inner();
        let key = term_text(&child(&mut terms, &setting, "layout property")?);
        let value = term_text(&child(&mut terms, &setting, "layout value")?);
        match key.to_lowercase().as_str() {
            "key" => settings.key = Some(value),
            "modify" => settings.modify = Some(value.eq_ignore_ascii_case("true")),
            "browser" => settings.browser = Some(value.eq_ignore_ascii_case("true")),
            _ => return Err(SyntaxError::at(&setting, format!("Unknown layout property: {}", key))),
        }
    }
    Ok(LayoutClause { settings })
}
