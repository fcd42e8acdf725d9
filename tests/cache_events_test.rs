use chrono::{TimeZone, Utc};
use netgraph::graph::{EdgeRecord, PropertyRow, SchemaSection, VertexRecord};
use netgraph::{GraphCache, GraphEvent, GraphSchema, InMemoryRepository, NetworkId, PropertyValue, QueryEngine, VertexId};
use std::sync::Arc;
use tokio::sync::mpsc;

fn vid(n: u32) -> VertexId {
    VertexId::from_ordinal(n)
}

fn row(uri: &str, json: &str, hour: u32) -> PropertyRow {
    PropertyRow::new(uri, json, Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap())
}

fn person(n: u32, dept: &str) -> VertexRecord {
    VertexRecord {
        id: vid(n),
        props: vec![row("p/dept", &format!("\"{}\"", dept), 0)],
    }
}

fn knows(source: u32, target: u32) -> EdgeRecord {
    EdgeRecord {
        source: vid(source),
        target: vid(target),
        uri: "rel/know".into(),
        props: vec![],
    }
}

/// Three people, two in IT, with a knowledge chain 1 -> 2 -> 3
fn org() -> (Arc<InMemoryRepository>, NetworkId) {
    let repo = Arc::new(InMemoryRepository::new());
    let network = NetworkId::random();
    let schema = GraphSchema {
        locale: Some("en".into()),
        vertex_schema: vec![SchemaSection::new("Profile", "s/profile").with_prop("Dept", "p/dept")],
        edge_schema: vec![SchemaSection::new("Knowledge", "rel/know")],
    };
    repo.set_schema(network, "en", schema).unwrap();
    for (n, dept) in [(1, "IT"), (2, "IT"), (3, "HR")] {
        repo.put_vertex(network, person(n, dept)).unwrap();
    }
    repo.put_edge(network, knows(1, 2)).unwrap();
    repo.put_edge(network, knows(2, 3)).unwrap();
    (repo, network)
}

#[tokio::test]
async fn test_queries_run_over_cached_snapshots() {
    let (repo, network) = org();
    let cache = GraphCache::new(repo);
    let engine = QueryEngine::default();

    let result = engine
        .execute(&cache, network, "en", "SELECT * WHERE Dept = 'IT' CALCULATE degree")
        .await
        .unwrap();
    assert_eq!(result.vertex_count(), 2);
    assert_eq!(result.edges().len(), 1);
    assert_eq!(result.vertices()[0].props.get("degree"), Some(&PropertyValue::Integer(1)));

    // the query worked on a copy
    let live = cache.get(network, "en").unwrap();
    assert_eq!(live.vertex_count(), 3);
    assert!(live.vertex(vid(1)).unwrap().get("degree").is_none());
}

#[tokio::test]
async fn test_event_feed_keeps_the_graph_current() {
    let (repo, network) = org();
    let cache = Arc::new(GraphCache::new(repo.clone()));
    cache.get_or_build(network, "en").await.unwrap();

    let (tx, rx) = mpsc::channel(16);
    let worker = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.run(rx).await })
    };

    repo.put_vertex(network, person(4, "Sales")).unwrap();
    repo.put_edge(network, knows(3, 4)).unwrap();
    repo.remove_vertex(network, vid(1)).unwrap();

    tx.send(GraphEvent::VertexSaved { vertex_id: vid(4) }).await.unwrap();
    tx.send(GraphEvent::EdgeSaved {
        source: vid(3),
        target: vid(4),
        schema_uri: "rel/know".into(),
    })
    .await
    .unwrap();
    tx.send(GraphEvent::VertexDeleted { vertex_id: vid(1) }).await.unwrap();
    // unknown vertices are skipped without stopping the feed
    tx.send(GraphEvent::VertexSaved { vertex_id: vid(99) }).await.unwrap();
    drop(tx);
    worker.await.unwrap();

    let snapshot = cache.snapshot(network, "en").await.unwrap();
    let ids: Vec<_> = snapshot.vertices().iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![vid(2), vid(3), vid(4)]);
    let pairs: Vec<_> = snapshot.edges().iter().map(|e| (e.source, e.target)).collect();
    assert_eq!(pairs, vec![(0, 1), (1, 2)]);
}

#[tokio::test]
async fn test_edge_saved_before_its_target_vertex() {
    let (repo, network) = org();
    let cache = GraphCache::new(repo.clone());
    cache.get_or_build(network, "en").await.unwrap();

    repo.put_edge(network, knows(3, 5)).unwrap();
    cache
        .apply(&GraphEvent::EdgeSaved {
            source: vid(3),
            target: vid(5),
            schema_uri: "rel/know".into(),
        })
        .await
        .unwrap();
    // dangling until the vertex shows up
    assert_eq!(cache.snapshot(network, "en").await.unwrap().edge_count(), 2);

    repo.put_vertex(network, person(5, "HR")).unwrap();
    cache.apply(&GraphEvent::VertexSaved { vertex_id: vid(5) }).await.unwrap();
    let snapshot = cache.snapshot(network, "en").await.unwrap();
    assert_eq!(snapshot.vertex_count(), 4);
    assert_eq!(snapshot.edge_count(), 3);
}

#[tokio::test]
async fn test_newer_rows_win_after_an_update() {
    let (repo, network) = org();
    let cache = GraphCache::new(repo.clone());
    cache.get_or_build(network, "en").await.unwrap();

    repo.put_vertex(
        network,
        VertexRecord {
            id: vid(2),
            props: vec![row("p/dept", "\"IT\"", 1), row("p/dept", "\"Legal\"", 2)],
        },
    )
    .unwrap();
    cache.apply(&GraphEvent::VertexSaved { vertex_id: vid(2) }).await.unwrap();

    let live = cache.get(network, "en").unwrap();
    assert_eq!(live.vertex(vid(2)).unwrap().get("Dept"), Some(&PropertyValue::from("Legal")));
}

#[tokio::test]
async fn test_cleared_network_is_rebuilt_from_the_repository() {
    let (repo, network) = org();
    let cache = GraphCache::new(repo.clone());
    let before = cache.get_or_build(network, "en").await.unwrap();

    // written behind the cache's back
    repo.put_vertex(network, person(7, "IT")).unwrap();
    assert_eq!(cache.snapshot(network, "en").await.unwrap().vertex_count(), 3);

    cache
        .apply(&GraphEvent::NetworkCacheCleared { network_id: network })
        .await
        .unwrap();
    let after = cache.get_or_build(network, "en").await.unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.vertex_count(), 4);
}
