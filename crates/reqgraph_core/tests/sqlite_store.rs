use reqgraph_core::{
    AttrValue, Attributes, GraphStore, NodeKind, SqliteGraphStore, StorageRecord, StoreError,
};
use rusqlite::Connection;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

fn record(kind: NodeKind, attributes: &[(&str, AttrValue)], children: Vec<Uuid>) -> StorageRecord {
    StorageRecord {
        id: Uuid::now_v7(),
        kind,
        attributes: attributes
            .iter()
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect::<Attributes>(),
        children,
    }
}

#[test]
fn put_then_get_returns_same_record_with_child_order() {
    let store = SqliteGraphStore::open_in_memory().unwrap();
    let children = vec![Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7()];
    let product = record(
        NodeKind::Product,
        &[
            ("title", AttrValue::from("Some Software")),
            ("committed", AttrValue::Bool(true)),
        ],
        children.clone(),
    );

    store.put_record(&product).unwrap();
    let loaded = store.get_record(product.id).unwrap().unwrap();
    assert_eq!(loaded, product);
    assert_eq!(loaded.children, children);
}

#[test]
fn put_replaces_attributes_and_edges() {
    let store = SqliteGraphStore::open_in_memory().unwrap();
    let mut project = record(
        NodeKind::Project,
        &[("name", AttrValue::from("Before"))],
        vec![Uuid::now_v7(), Uuid::now_v7()],
    );
    store.put_record(&project).unwrap();

    project
        .attributes
        .insert("name".to_string(), AttrValue::from("After"));
    project.children = vec![Uuid::now_v7()];
    store.put_record(&project).unwrap();

    assert_eq!(store.record_count().unwrap(), 1);
    assert_eq!(store.get_record(project.id).unwrap(), Some(project));
}

#[test]
fn missing_identity_returns_none() {
    let store = SqliteGraphStore::open_in_memory().unwrap();
    assert_eq!(store.get_record(Uuid::now_v7()).unwrap(), None);
    assert!(!store.contains(Uuid::now_v7()).unwrap());
}

#[test]
fn records_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    let graph = record(
        NodeKind::Graph,
        &[("title", AttrValue::from("Roadmap"))],
        vec![],
    );

    SqliteGraphStore::open(&path)
        .unwrap()
        .put_record(&graph)
        .unwrap();

    let reopened = SqliteGraphStore::open(&path).unwrap();
    assert_eq!(reopened.get_record(graph.id).unwrap(), Some(graph));
}

#[test]
fn unknown_kind_and_bad_attributes_are_invalid_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.db");
    let store = SqliteGraphStore::open(&path).unwrap();
    let story = record(NodeKind::Story, &[], vec![]);
    let usecase = record(NodeKind::UseCase, &[], vec![]);
    store.put_record(&story).unwrap();
    store.put_record(&usecase).unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute(
        "UPDATE graph_nodes SET kind = 'epic' WHERE node_uuid = ?1;",
        [story.id.to_string()],
    )
    .unwrap();
    raw.execute(
        "UPDATE graph_nodes SET attributes = 'not json' WHERE node_uuid = ?1;",
        [usecase.id.to_string()],
    )
    .unwrap();

    match store.get_record(story.id) {
        Err(StoreError::InvalidData(message)) => assert!(message.contains("epic")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        store.get_record(usecase.id),
        Err(StoreError::InvalidData(_))
    ));
}

#[test]
fn list_by_kind_returns_only_that_kind() {
    let store = SqliteGraphStore::open_in_memory().unwrap();
    let first = record(NodeKind::Graph, &[("title", AttrValue::from("A"))], vec![]);
    let second = record(NodeKind::Graph, &[("title", AttrValue::from("B"))], vec![]);
    store.put_record(&first).unwrap();
    store.put_record(&second).unwrap();
    store
        .put_record(&record(NodeKind::Requirement, &[], vec![]))
        .unwrap();

    let mut expected = vec![first, second];
    expected.sort_by_key(|record| record.id);
    let graphs = store.list_by_kind(NodeKind::Graph).unwrap();
    assert_eq!(graphs, expected);
    assert_eq!(store.record_count().unwrap(), 3);
}

#[test]
fn remove_record_drops_node_row_and_its_edges() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remove.db");
    let store = SqliteGraphStore::open(&path).unwrap();
    let child = record(NodeKind::Story, &[], vec![]);
    let parent = record(NodeKind::Project, &[], vec![child.id, Uuid::now_v7()]);
    store.put_record(&child).unwrap();
    store.put_record(&parent).unwrap();

    assert!(store.remove_record(parent.id).unwrap());
    assert!(!store.remove_record(parent.id).unwrap());
    assert_eq!(store.get_record(parent.id).unwrap(), None);
    assert_eq!(store.record_count().unwrap(), 1);
    assert!(store.contains(child.id).unwrap());

    let raw = Connection::open(&path).unwrap();
    let edges: i64 = raw
        .query_row(
            "SELECT COUNT(*) FROM graph_edges WHERE parent_uuid = ?1;",
            [parent.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(edges, 0);
}

#[test]
fn concurrent_writers_share_one_store() {
    let store = Arc::new(SqliteGraphStore::open_in_memory().unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..25 {
                    store
                        .put_record(&record(NodeKind::Requirement, &[], vec![Uuid::now_v7()]))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.record_count().unwrap(), 100);
}
