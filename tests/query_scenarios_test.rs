use netgraph::graph::{Edge, PropertyGraph, PropertyValue, Vertex, VertexId};
use netgraph::QueryEngine;

fn vid(n: u32) -> VertexId {
    VertexId::from_ordinal(n)
}

fn graph_with(props: Vec<Vec<(&str, PropertyValue)>>, edges: Vec<Edge>) -> PropertyGraph {
    let vertices = props
        .into_iter()
        .enumerate()
        .map(|(idx, pairs)| Vertex::with_props(vid(idx as u32 + 1), pairs.into_iter().collect()))
        .collect();
    PropertyGraph::from_parts(vertices, edges).unwrap()
}

fn department_graph() -> PropertyGraph {
    graph_with(
        vec![
            vec![("Dept", 1.into()), ("Name", "anna".into())],
            vec![("Dept", 2.into()), ("Name", "adam".into())],
            vec![("Dept", 2.into()), ("Name", "bob".into())],
        ],
        vec![
            Edge::new(0, 1, "Cooperation"),
            Edge::new(0, 2, "Knowledge"),
            Edge::new(2, 0, "Knowledge"),
        ],
    )
}

fn prop<'g>(graph: &'g PropertyGraph, position: usize, name: &str) -> Option<&'g PropertyValue> {
    graph.vertices()[position].props.get(name)
}

#[test]
fn test_degree_scenario() {
    let engine = QueryEngine::default();
    let result = engine
        .run("SELECT * CALCULATE degree SELECT degree", department_graph())
        .unwrap();

    let degrees: Vec<_> = (0..3).map(|p| prop(&result, p, "degree").cloned()).collect();
    assert_eq!(
        degrees,
        vec![
            Some(PropertyValue::Integer(3)),
            Some(PropertyValue::Integer(1)),
            Some(PropertyValue::Integer(2)),
        ]
    );
    assert_eq!(result.vertices()[0].props.len(), 1);
}

#[test]
fn test_edge_any_renumbers_survivors() {
    let graph = graph_with(vec![vec![], vec![], vec![]], vec![Edge::new(2, 0, "Knowledge")]);
    let result = QueryEngine::default().run("SELECT * WHERE edge(any)", graph).unwrap();

    let ids: Vec<_> = result.vertices().iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![vid(1), vid(3)]);
    assert_eq!(result.edges(), &[Edge::new(1, 0, "Knowledge")]);
    assert_eq!(result.vertices()[0].incident_edges(), &[0]);
}

#[test]
fn test_intersects_scalar_and_array_values() {
    let graph = graph_with(
        vec![
            vec![("Dept", "Marketing".into())],
            vec![("Dept", PropertyValue::Array(vec!["IT".into(), "Accounting".into()]))],
            vec![("Dept", "HR".into())],
            vec![("Dept", PropertyValue::Array(vec!["Sales".into()]))],
            vec![],
        ],
        vec![],
    );
    let result = QueryEngine::default()
        .run(r#"SELECT * WHERE Dept intersects '["Marketing","Accounting"]'"#, graph)
        .unwrap();

    let ids: Vec<_> = result.vertices().iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![vid(1), vid(2)]);
}

#[test]
fn test_select_star_is_identity() {
    let graph = department_graph();
    let before = serde_json::to_string(&graph).unwrap();
    let result = QueryEngine::default().run("SELECT *", graph).unwrap();
    assert_eq!(serde_json::to_string(&result).unwrap(), before);
}

#[test]
fn test_where_is_idempotent() {
    let engine = QueryEngine::default();
    let query = "SELECT * WHERE Dept = 2 OR out_edge(name = 'Cooperation')";
    let once = engine.run(query, department_graph()).unwrap();
    let twice = engine.run(query, once.clone()).unwrap();
    assert_eq!(once.vertex_count(), 3);
    assert_eq!(
        serde_json::to_string(&once).unwrap(),
        serde_json::to_string(&twice).unwrap()
    );

    let narrowed = engine.run("SELECT * WHERE Dept = 2", department_graph()).unwrap();
    let again = engine.run("SELECT * WHERE Dept = 2", narrowed.clone()).unwrap();
    assert_eq!(narrowed.vertex_count(), 2);
    assert_eq!(
        serde_json::to_string(&narrowed).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}

#[test]
fn test_projection_with_like_and_edges() {
    let result = QueryEngine::default()
        .run(
            "SELECT Name AS who, edge.Knowledge AS knows WHERE Name LIKE 'a%'",
            department_graph(),
        )
        .unwrap();

    assert_eq!(result.vertex_count(), 2);
    assert_eq!(prop(&result, 0, "who"), Some(&PropertyValue::from("anna")));
    assert!(prop(&result, 0, "Dept").is_none());
    // only Cooperation 0->1 survives WHERE, and SELECT keeps Knowledge only
    assert_eq!(result.edge_count(), 0);

    let result = QueryEngine::default()
        .run("SELECT Name, edge.Knowledge AS knows", department_graph())
        .unwrap();
    let names: Vec<_> = result.edges().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["knows", "knows"]);
}

#[test]
fn test_group_by_keeps_original_vertices() {
    let graph = department_graph();
    let before = serde_json::to_string(graph.vertices()).unwrap();
    let result = QueryEngine::default()
        .run("SELECT * GROUP BY Dept SELECT label, size", graph)
        .unwrap();

    assert_eq!(result.vertex_count(), 2);
    assert_eq!(prop(&result, 1, "size"), Some(&PropertyValue::Integer(2)));
    let grouped = result.grouped_vertices().unwrap();
    assert_eq!(serde_json::to_string(grouped).unwrap(), before);
}

#[test]
fn test_layout_settings_reach_the_result() {
    let result = QueryEngine::default()
        .run("SELECT * LAYOUT key = 'org', modify = false", department_graph())
        .unwrap();
    let layout = result.layout().unwrap();
    assert_eq!(layout.key.as_deref(), Some("org"));
    assert_eq!(layout.modify, Some(false));
    assert_eq!(layout.browser, None);
}

#[test]
fn test_syntax_errors_carry_location() {
    let err = QueryEngine::default()
        .run("SELECT *\nCALCULATE pagerank", department_graph())
        .unwrap_err();
    assert_eq!(err.message, "Invalid metric or algorithm name: pagerank");
    assert_eq!((err.line, err.column), (2, 11));

    let err = QueryEngine::default().run("", department_graph()).unwrap_err();
    assert_eq!(err.message, "Query is an empty string");
}

#[test]
fn test_type_mismatch_filters_out_instead_of_failing() {
    let result = QueryEngine::default()
        .run("SELECT * WHERE Name > 5", department_graph())
        .unwrap();
    assert!(result.is_empty());
}
