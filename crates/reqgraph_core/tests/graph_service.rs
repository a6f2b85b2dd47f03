use reqgraph_core::{
    connect, DatabaseTarget, EngineConfig, EngineError, GraphNode, GraphService, GraphStore,
    MemoryGraphStore, PoolError, Requirement, SaveMode, SaveScope, ServiceError, Story, Task,
    WorkerPool,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn memory_service(workers: usize) -> (GraphService, Arc<MemoryGraphStore>) {
    let store = Arc::new(MemoryGraphStore::new());
    let pool = Arc::new(WorkerPool::with_threads(workers).unwrap());
    (GraphService::new(store.clone(), pool), store)
}

#[test]
fn save_and_load_through_service() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        database: DatabaseTarget::File(dir.path().join("service.db")),
        worker_threads: 2,
        ..EngineConfig::default()
    };
    let service = GraphService::from_config(&config).unwrap();
    assert_eq!(service.pool().worker_count(), 2);

    let graph = GraphNode::new();
    graph.set_title("Release plan").unwrap();
    let story = Story::new();
    story.set_title("Export to PDF").unwrap();
    connect(&graph, &story);

    let save = service.save(&graph).unwrap();
    wait_until("save", || save.state().is_finished());
    assert!(save.tree_save_complete());

    let load = service.load(&graph.id_string()).unwrap();
    wait_until("load", || load.state().is_finished());
    let loaded = GraphNode::try_from(load.node().unwrap()).unwrap();
    assert_eq!(loaded.title(), "Release plan");
    let loaded_story = Story::try_from(loaded.children()[0].clone()).unwrap();
    assert_eq!(loaded_story.title(), "Export to PDF");
}

#[test]
fn list_graphs_returns_persisted_graph_titles() {
    let (service, _) = memory_service(1);
    let mut graphs = Vec::new();
    for title in ["Backlog", "Roadmap"] {
        let graph = GraphNode::new();
        graph.set_title(title).unwrap();
        let task = service.save(&graph).unwrap();
        wait_until("save", || task.tree_save_complete());
        graphs.push(graph);
    }
    let unsaved = GraphNode::new();
    unsaved.set_title("Draft").unwrap();

    let mut listed = service.list_graphs().unwrap();
    listed.sort_by(|a, b| a.title.cmp(&b.title));
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, graphs[0].id());
    assert_eq!(listed[0].title, "Backlog");
    assert_eq!(listed[1].title, "Roadmap");
}

#[test]
fn changed_only_save_writes_edited_nodes() {
    let (service, store) = memory_service(1);
    let graph = GraphNode::new();
    let first = Requirement::new();
    let second = Requirement::new();
    connect(&graph, &first);
    connect(&graph, &second);

    let task = service.save(&graph).unwrap();
    wait_until("initial save", || task.tree_save_complete());
    assert_eq!(store.write_count(), 3);

    second.set_title("Edited").unwrap();
    let task = service
        .save_with(&graph, SaveScope::Subtree, SaveMode::ChangedOnly)
        .unwrap();
    wait_until("changed-only save", || task.tree_save_complete());
    assert_eq!(task.nodes_visited(), 3);
    assert_eq!(task.nodes_saved(), 1);
    assert_eq!(store.write_count(), 4);
    assert!(!second.is_dirty());
}

#[test]
fn connected_save_from_leaf_persists_ancestors() {
    let (service, store) = memory_service(1);
    let graph = GraphNode::new();
    let requirement = Requirement::new();
    connect(&graph, &requirement);

    let task = service
        .save_with(&requirement, SaveScope::Connected, SaveMode::All)
        .unwrap();
    wait_until("connected save", || task.tree_save_complete());
    assert!(store.contains(graph.id()).unwrap());
    assert!(store.contains(requirement.id()).unwrap());
}

#[test]
fn load_rejects_invalid_identity_before_queueing() {
    let (service, _) = memory_service(0);
    match service.load("org-42") {
        Err(ServiceError::Engine(EngineError::InvalidIdentity(text))) => {
            assert_eq!(text, "org-42")
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("invalid identity must be rejected"),
    }
    assert_eq!(service.pool().queued(), 0);
}

#[test]
fn save_after_pool_shutdown_is_rejected() {
    let (service, _) = memory_service(1);
    service.pool().shutdown();
    let graph = GraphNode::new();
    assert!(matches!(
        service.save(&graph),
        Err(ServiceError::Pool(PoolError::ShutDown))
    ));
}

#[test]
fn remove_deletes_saved_graphs_through_service() {
    let (service, store) = memory_service(2);
    let backlog = GraphNode::new();
    backlog.set_title("Backlog").unwrap();
    let story = Story::new();
    connect(&backlog, &story);
    let roadmap = GraphNode::new();
    roadmap.set_title("Roadmap").unwrap();
    for graph in [&backlog, &roadmap] {
        let task = service.save(graph).unwrap();
        wait_until("save", || task.tree_save_complete());
    }
    assert_eq!(store.record_count().unwrap(), 3);

    let task = service
        .remove(&[backlog.node().clone(), story.node().clone()])
        .unwrap();
    wait_until("remove", || task.state().is_finished());
    assert!(task.removal_complete());
    assert_eq!(task.nodes_visited(), 2);
    assert_eq!(task.nodes_removed(), 2);

    let listed = service.list_graphs().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Roadmap");
}
